use crate::constants::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pre-built request frames sent to the BMS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    /// Analog values (CID2 0x42), the telemetry request
    Status,
    /// Alternate command (CID2 0x4D)
    CommandA,
    /// Alternate command (CID2 0x51)
    CommandB,
    /// Closing command of a cycle (CID2 0x47)
    CycleRestart,
}

impl Request {
    /// Exact bytes written to the wire, delimiter included
    pub fn frame(self) -> &'static [u8] {
        match self {
            Request::Status => STATUS_REQUEST,
            Request::CommandA => COMMAND_A_REQUEST,
            Request::CommandB => COMMAND_B_REQUEST,
            Request::CycleRestart => CYCLE_RESTART_REQUEST,
        }
    }
}

/// Order in which requests are tried until one yields a valid reply.
///
/// The status request is repeated so that a single garbled or fragmented
/// reply does not force a different command onto the device.
pub const POLLING_CYCLE: [Request; 6] = [
    Request::Status,
    Request::Status,
    Request::Status,
    Request::CommandA,
    Request::CommandB,
    Request::CycleRestart,
];

/// Response status code (CID2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Ok,
    VersionError,
    ChecksumError,
    LengthChecksumError,
    InvalidCommand,
    CommandFormatError,
    InvalidData,
    AddressError,
    BatteryCommunicationError,
    /// Any code the device documentation does not list
    Unrecognized([u8; 2]),
}

impl StatusCode {
    /// Interpret the two CID2 characters of a response
    pub fn from_cid2(cid2: [u8; 2]) -> Self {
        match &cid2 {
            b"00" => StatusCode::Ok,
            b"01" => StatusCode::VersionError,
            b"02" => StatusCode::ChecksumError,
            b"03" => StatusCode::LengthChecksumError,
            b"04" => StatusCode::InvalidCommand,
            b"05" => StatusCode::CommandFormatError,
            b"06" => StatusCode::InvalidData,
            b"90" => StatusCode::AddressError,
            b"91" => StatusCode::BatteryCommunicationError,
            _ => StatusCode::Unrecognized(cid2),
        }
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Ok => write!(f, "response ok"),
            StatusCode::VersionError => write!(f, "VER error"),
            StatusCode::ChecksumError => write!(f, "CHKSUM error"),
            StatusCode::LengthChecksumError => write!(f, "LCHKSUM error"),
            StatusCode::InvalidCommand => write!(f, "CID2 invalid"),
            StatusCode::CommandFormatError => write!(f, "command format error"),
            StatusCode::InvalidData => write!(f, "INFO data invalid"),
            StatusCode::AddressError => write!(f, "ADR error"),
            StatusCode::BatteryCommunicationError => write!(f, "battery communication error"),
            StatusCode::Unrecognized(code) => {
                write!(f, "unrecognized CID2 {}", String::from_utf8_lossy(code))
            }
        }
    }
}

/// Unit of measurement of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Percent,
    KilowattHour,
    Ampere,
    Volt,
    Celsius,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Percent => "%",
            Unit::KilowattHour => "kWh",
            Unit::Ampere => "A",
            Unit::Volt => "V",
            Unit::Celsius => "°C",
        }
    }
}

/// Identifies one value of a [`BatteryReading`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKey {
    StateOfHealth,
    StateOfCharge,
    Energy,
    Current,
    Voltage,
    /// Cell voltage, numbered 1..=16
    CellVoltage(u8),
    EnvironmentTemperature,
    CellTemperature,
    MosTemperature,
    /// Auxiliary temperature probe, numbered 1..=4
    Temperature(u8),
}

impl SensorKey {
    /// Every key, in presentation order
    pub fn all() -> Vec<SensorKey> {
        let mut keys = vec![
            SensorKey::StateOfHealth,
            SensorKey::StateOfCharge,
            SensorKey::Energy,
            SensorKey::Current,
            SensorKey::Voltage,
        ];
        keys.extend((1..=CELL_COUNT as u8).map(SensorKey::CellVoltage));
        keys.push(SensorKey::EnvironmentTemperature);
        keys.push(SensorKey::CellTemperature);
        keys.push(SensorKey::MosTemperature);
        keys.extend((1..=AUX_TEMP_COUNT as u8).map(SensorKey::Temperature));
        keys
    }

    /// Stable identifier, e.g. `soc` or `cell3_voltage`
    pub fn key(self) -> String {
        match self {
            SensorKey::StateOfHealth => "soh".to_string(),
            SensorKey::StateOfCharge => "soc".to_string(),
            SensorKey::Energy => "energy".to_string(),
            SensorKey::Current => "current".to_string(),
            SensorKey::Voltage => "voltage".to_string(),
            SensorKey::CellVoltage(i) => format!("cell{i}_voltage"),
            SensorKey::EnvironmentTemperature => "env_temp".to_string(),
            SensorKey::CellTemperature => "cell_temp".to_string(),
            SensorKey::MosTemperature => "mos_temp".to_string(),
            SensorKey::Temperature(i) => format!("temp{i}"),
        }
    }

    /// Human readable name
    pub fn name(self) -> String {
        match self {
            SensorKey::StateOfHealth => "State of health".to_string(),
            SensorKey::StateOfCharge => "State of charge".to_string(),
            SensorKey::Energy => "Energy".to_string(),
            SensorKey::Current => "Current".to_string(),
            SensorKey::Voltage => "Voltage".to_string(),
            SensorKey::CellVoltage(i) => format!("Cell {i} voltage"),
            SensorKey::EnvironmentTemperature => "Environment temperature".to_string(),
            SensorKey::CellTemperature => "Cell temperature".to_string(),
            SensorKey::MosTemperature => "MOS temperature".to_string(),
            SensorKey::Temperature(i) => format!("Temperature {i}"),
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            SensorKey::StateOfHealth | SensorKey::StateOfCharge => Unit::Percent,
            SensorKey::Energy => Unit::KilowattHour,
            SensorKey::Current => Unit::Ampere,
            SensorKey::Voltage | SensorKey::CellVoltage(_) => Unit::Volt,
            SensorKey::EnvironmentTemperature
            | SensorKey::CellTemperature
            | SensorKey::MosTemperature
            | SensorKey::Temperature(_) => Unit::Celsius,
        }
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// One complete set of decoded telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    /// State of health in %
    pub state_of_health: f64,
    /// State of charge in %
    pub state_of_charge: f64,
    /// Remaining energy in kWh
    pub energy: f64,
    /// Pack current in A, negative when discharging
    pub current: f64,
    /// Pack voltage in V
    pub voltage: f64,
    /// Cell voltages in V
    pub cell_voltages: [f64; CELL_COUNT],
    /// Environment temperature in °C
    pub env_temp: f64,
    /// Cell temperature in °C
    pub cell_temp: f64,
    /// MOS temperature in °C
    pub mos_temp: f64,
    /// Auxiliary temperatures in °C
    pub temps: [f64; AUX_TEMP_COUNT],
}

impl BatteryReading {
    /// Look up a single value
    pub fn get(&self, key: SensorKey) -> Option<f64> {
        let value = match key {
            SensorKey::StateOfHealth => self.state_of_health,
            SensorKey::StateOfCharge => self.state_of_charge,
            SensorKey::Energy => self.energy,
            SensorKey::Current => self.current,
            SensorKey::Voltage => self.voltage,
            SensorKey::CellVoltage(i) => *self.cell_voltages.get((i as usize).checked_sub(1)?)?,
            SensorKey::EnvironmentTemperature => self.env_temp,
            SensorKey::CellTemperature => self.cell_temp,
            SensorKey::MosTemperature => self.mos_temp,
            SensorKey::Temperature(i) => *self.temps.get((i as usize).checked_sub(1)?)?,
        };
        Some(value)
    }

    /// All values paired with their keys, in presentation order
    pub fn entries(&self) -> Vec<(SensorKey, f64)> {
        SensorKey::all()
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
            .collect()
    }

    /// Values keyed by their stable identifier
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.entries()
            .into_iter()
            .map(|(key, value)| (key.key(), value))
            .collect()
    }
}

/// A reading together with the moment it was acquired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub reading: BatteryReading,
}
