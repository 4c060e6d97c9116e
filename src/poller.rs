//! Per-device polling façade.
//!
//! Opens a fresh connection for every update, runs one poll through the
//! engine and keeps the last good snapshot for consumers. Scheduling is left
//! to the host; [`Poller::update_interval`] tells it how often to call.

use crate::config::Config;
use crate::error::Result;
use crate::protocol::Jc03;
use crate::transport::{SerialTransport, Transport};
use crate::types::Snapshot;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error};
use std::time::Duration;

/// Opens a transport to the device described by a [`Config`]
#[async_trait]
pub trait Connect: Send {
    type Transport: Transport;

    async fn connect(&mut self, config: &Config) -> Result<Self::Transport>;
}

/// Connects through [`SerialTransport`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

#[async_trait]
impl Connect for SerialConnector {
    type Transport = SerialTransport;

    async fn connect(&mut self, config: &Config) -> Result<SerialTransport> {
        SerialTransport::open(&config.serial_path, config.baud_rate)
    }
}

/// Polls one BMS and caches the latest reading
pub struct Poller<C = SerialConnector> {
    config: Config,
    connector: C,
    engine: Jc03,
    latest: Option<Snapshot>,
}

impl Poller<SerialConnector> {
    /// Poll the serial device named in `config`
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, SerialConnector)
    }
}

impl<C: Connect> Poller<C> {
    /// Poll through a custom connector
    pub fn with_connector(config: Config, connector: C) -> Self {
        let engine = Jc03::with_config(&config);
        Self {
            config,
            connector,
            engine,
            latest: None,
        }
    }

    /// Connect, poll once and cache the result.
    ///
    /// On failure the previously cached snapshot is left untouched.
    pub async fn update(&mut self) -> Result<&Snapshot> {
        let mut transport = match self.connector.connect(&self.config).await {
            Ok(transport) => transport,
            Err(e) => {
                error!("{e}");
                return Err(e);
            }
        };
        debug!("Serial device {} connected", self.config.serial_path);

        let reading = self.engine.poll_once(&mut transport).await?;
        Ok(&*self.latest.insert(Snapshot {
            timestamp: Utc::now(),
            reading,
        }))
    }

    /// The last successful snapshot, if any
    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    pub fn update_interval(&self) -> Duration {
        self.config.update_interval
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Jc03 {
        &self.engine
    }
}
