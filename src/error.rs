//! Error types for JC03 protocol operations.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for JC03 operations.
pub type Result<T> = std::result::Result<T, Jc03Error>;

/// The individually time-bounded steps of a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Send,
    Receive,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Send => write!(f, "send"),
            Step::Receive => write!(f, "receive"),
        }
    }
}

/// Error types for JC03 battery communication.
///
/// Every variant means no reading was produced by the poll.
#[derive(Error, Debug)]
pub enum Jc03Error {
    /// The serial device could not be opened
    #[error("Unable to connect to the serial device {path}: {source}")]
    Connection {
        /// Device path that was opened
        path: String,
        /// Underlying serial port error
        #[source]
        source: serialport::Error,
    },

    /// Writing a request failed, including clearing the port's input queue
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A single send or receive exceeded the step budget
    #[error("Timed out during {0}")]
    StepTimeout(Step),

    /// The whole poll exceeded its deadline
    #[error("Poll did not finish within {0:?}")]
    PollDeadline(Duration),

    /// Every request of the polling cycle was answered with an invalid frame
    #[error("No valid response after a full polling cycle")]
    CycleExhausted,
}

impl Jc03Error {
    /// True for failures to establish the transport, as opposed to protocol failures
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Jc03Error::Connection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Jc03Error::StepTimeout(Step::Receive).to_string(),
            "Timed out during receive"
        );
        assert_eq!(
            Jc03Error::CycleExhausted.to_string(),
            "No valid response after a full polling cycle"
        );
    }

    #[test]
    fn test_connection_error_kind() {
        let err = Jc03Error::Connection {
            path: "/dev/ttyUSB9".to_string(),
            source: serialport::Error::new(serialport::ErrorKind::NoDevice, "missing"),
        };
        assert!(err.is_connection_error());
        assert!(err.to_string().contains("/dev/ttyUSB9"));
        assert!(!Jc03Error::CycleExhausted.is_connection_error());
    }

    #[test]
    fn test_port_failure_after_open_is_io() {
        let source = serialport::Error::new(
            serialport::ErrorKind::Io(std::io::ErrorKind::BrokenPipe),
            "cable pulled",
        );
        let err = Jc03Error::from(std::io::Error::from(source));
        assert!(matches!(&err, Jc03Error::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe));
        assert!(!err.is_connection_error());
        assert!(err.to_string().contains("cable pulled"));
    }
}
