//! # JC03 Protocol Library
//!
//! A Rust library for polling DR-JC03 battery management systems over an
//! RS485/RS232 serial link. The BMS speaks an ASCII-hex framed protocol with
//! two checksums per frame; this crate sends the request frames, validates
//! the replies and decodes the analog values into a [`BatteryReading`].
//!
//! ## Features
//!
//! - Frame checksum and LENID length checksum codec
//! - Response validation with a closed set of device status codes
//! - Decoding of state of charge/health, energy, current, pack and 16 cell
//!   voltages and 7 temperatures
//! - A polling engine that cycles through the vendor's request sequence until
//!   the device answers, with per-step and per-poll deadlines
//! - A [`Poller`] that reconnects per update and caches the last snapshot
//!
//! ## Example
//!
//! ```no_run
//! use jc03_protocol::{Config, Poller};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut poller = Poller::new(Config::new("/dev/ttyUSB0"));
//!     let snapshot = poller.update().await?;
//!     println!("Battery voltage: {:.2}V", snapshot.reading.voltage);
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod poller;
pub mod protocol;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use config::{Config, PollDeadline};
pub use error::{Jc03Error, Result, Step};
pub use poller::{Connect, Poller, SerialConnector};
pub use protocol::Jc03;
pub use transport::{SerialTransport, StreamTransport, Transport};
pub use types::*;
