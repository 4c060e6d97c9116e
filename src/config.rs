//! Polling configuration.

use crate::constants::{BAUD_RATE, STEP_BUDGET_SECS, UPDATE_INTERVAL_SECS};
use crate::types::POLLING_CYCLE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Durations as whole seconds
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Deadline wrapped around a whole poll, on top of the per-step budget.
///
/// With `Step` the outer deadline equals a single step budget, so a poll that
/// needs a retry is cut off before the retry runs. `FullCycle` leaves room for
/// one step budget per request of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollDeadline {
    Step,
    #[default]
    FullCycle,
    Fixed(#[serde(with = "secs")] Duration),
    Unbounded,
}

impl PollDeadline {
    /// Concrete deadline for the given step budget, `None` when unbounded
    pub fn resolve(self, step_budget: Duration) -> Option<Duration> {
        match self {
            PollDeadline::Step => Some(step_budget),
            PollDeadline::FullCycle => Some(step_budget * POLLING_CYCLE.len() as u32),
            PollDeadline::Fixed(deadline) => Some(deadline),
            PollDeadline::Unbounded => None,
        }
    }
}

/// Settings for one BMS on one serial line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device path (e.g. /dev/ttyUSB0, COM3)
    pub serial_path: String,
    /// Baud rate
    pub baud_rate: u32,
    /// How often the host should poll
    #[serde(with = "secs")]
    pub update_interval: Duration,
    /// Timeout for each send and each receive, also the pause between retries
    #[serde(with = "secs")]
    pub step_budget: Duration,
    /// Deadline for a whole poll
    pub poll_deadline: PollDeadline,
}

impl Config {
    /// Create a configuration for `serial_path` with default settings
    pub fn new(serial_path: &str) -> Self {
        Self {
            serial_path: serial_path.to_string(),
            ..Self::default()
        }
    }

    /// Set baud rate
    #[must_use]
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set update interval
    #[must_use]
    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Set step budget
    #[must_use]
    pub fn step_budget(mut self, budget: Duration) -> Self {
        self.step_budget = budget;
        self
    }

    /// Set poll deadline
    #[must_use]
    pub fn poll_deadline(mut self, deadline: PollDeadline) -> Self {
        self.poll_deadline = deadline;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_path: String::new(),
            baud_rate: BAUD_RATE,
            update_interval: Duration::from_secs(UPDATE_INTERVAL_SECS),
            step_budget: Duration::from_secs(STEP_BUDGET_SECS),
            poll_deadline: PollDeadline::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("/dev/ttyUSB0");
        assert_eq!(config.serial_path, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.update_interval, Duration::from_secs(5));
        assert_eq!(config.step_budget, Duration::from_secs(3));
        assert_eq!(config.poll_deadline, PollDeadline::FullCycle);
    }

    #[test]
    fn test_resolve_deadline() {
        let budget = Duration::from_secs(3);
        assert_eq!(PollDeadline::Step.resolve(budget), Some(budget));
        assert_eq!(
            PollDeadline::FullCycle.resolve(budget),
            Some(Duration::from_secs(18))
        );
        assert_eq!(
            PollDeadline::Fixed(Duration::from_secs(40)).resolve(budget),
            Some(Duration::from_secs(40))
        );
        assert_eq!(PollDeadline::Unbounded.resolve(budget), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config = serde_json::from_str(
            r#"{"serial_path": "/dev/ttyS1", "baud_rate": 19200, "poll_deadline": {"fixed": 30}}"#,
        )
        .unwrap();
        assert_eq!(config.serial_path, "/dev/ttyS1");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.step_budget, Duration::from_secs(3));
        assert_eq!(config.poll_deadline, PollDeadline::Fixed(Duration::from_secs(30)));
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = Config::new("COM3")
            .step_budget(Duration::from_secs(2))
            .poll_deadline(PollDeadline::Step);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""step_budget":2"#));
        assert!(json.contains(r#""poll_deadline":"step""#));
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }
}
