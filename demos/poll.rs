//! Polling Example
//!
//! This example polls a JC03 BMS at the configured update interval and
//! prints every snapshot:
//! - Serial device from the command line or an interactive prompt
//! - One poll per interval, reconnecting each time
//! - Readings printed as a labelled table and as JSON
//!
//! Usage:
//!   cargo run --example poll                      # Interactive mode
//!   cargo run --example poll -- /dev/ttyUSB0      # Specify port
//!   cargo run --example poll -- COM3 19200        # Port and baud rate
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example poll
//!   RUST_LOG=info cargo run --example poll

use inquire::Text;
use jc03_protocol::constants::BAUD_RATE;
use jc03_protocol::{Config, Poller, Snapshot};
use log::{error, info, warn};

/// Ask for the serial device path
fn prompt_port() -> std::io::Result<String> {
    Text::new("Serial device path:")
        .with_default("/dev/ttyUSB0")
        .prompt()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("Prompt cancelled: {}", e)))
}

fn print_snapshot(snapshot: &Snapshot) {
    info!("=== {} ===", snapshot.timestamp.format("%Y-%m-%d %H:%M:%S"));
    for (key, value) in snapshot.reading.entries() {
        info!("{:<24} {:>9.3} {}", key.name(), value, key.unit().symbol());
    }
    if let Ok(json) = serde_json::to_string(&snapshot) {
        info!("{}", json);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger with default info level if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let port = match args.next() {
        Some(port) => port,
        None => prompt_port()?,
    };
    let baud_rate = match args.next() {
        Some(baud) => baud.parse()?,
        None => BAUD_RATE,
    };

    let config = Config::new(&port).baud_rate(baud_rate);
    info!("Polling JC03 BMS on {} at {} baud...", port, baud_rate);

    let mut poller = Poller::new(config);
    let mut interval = tokio::time::interval(poller.update_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match poller.update().await {
            Ok(snapshot) => print_snapshot(snapshot),
            Err(e) if e.is_connection_error() => {
                error!("{}", e);
                error!("Check that the RS485 adapter is plugged in and the path is correct");
            }
            Err(e) => match poller.latest() {
                Some(last) => warn!("Update failed ({}), last good reading from {}", e, last.timestamp),
                None => warn!("Update failed ({})", e),
            },
        }
    }
}
