//! Decoding of the analog values body into a [`BatteryReading`].
//!
//! Every value is a big-endian 16-bit integer written as four hex digits at a
//! fixed character offset of the body.

use crate::constants::{AUX_TEMP_COUNT, CELL_COUNT, TELEMETRY_SPAN};
use crate::types::BatteryReading;
use log::debug;
use thiserror::Error;

const SOC_OFFSET: usize = 2;
const VOLTAGE_OFFSET: usize = 6;
const CELLS_OFFSET: usize = 12;
const ENV_TEMP_OFFSET: usize = 76;
const CELL_TEMP_OFFSET: usize = 80;
const MOS_TEMP_OFFSET: usize = 84;
const TEMPS_OFFSET: usize = 90;
const CURRENT_OFFSET: usize = 106;
const SOH_OFFSET: usize = 114;
const CAPACITY_OFFSET: usize = 124;

/// Errors raised for a body that cannot hold a full reading
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("body too short: {len} characters, need {}", TELEMETRY_SPAN)]
    Truncated { len: usize },

    #[error("invalid hex digits {digits:?} at offset {offset}")]
    InvalidHex { offset: usize, digits: String },
}

/// Read the 16-bit word at `offset`
fn word(body: &str, offset: usize) -> Result<u16, DecodeError> {
    let digits = body
        .get(offset..offset + 4)
        .ok_or(DecodeError::Truncated { len: body.len() })?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::InvalidHex {
            offset,
            digits: digits.to_string(),
        });
    }
    u16::from_str_radix(digits, 16).map_err(|_| DecodeError::InvalidHex {
        offset,
        digits: digits.to_string(),
    })
}

fn scaled(body: &str, offset: usize, divisor: f64) -> Result<f64, DecodeError> {
    Ok(word(body, offset)? as f64 / divisor)
}

/// Decode a telemetry body.
///
/// `body` is the text between the LENID field and the frame checksum of a
/// response that already passed validation.
pub fn decode(body: &str) -> Result<BatteryReading, DecodeError> {
    if body.len() < TELEMETRY_SPAN {
        return Err(DecodeError::Truncated { len: body.len() });
    }

    let voltage_raw = word(body, VOLTAGE_OFFSET)?;
    let capacity_raw = word(body, CAPACITY_OFFSET)?;
    // Two's complement, positive while charging
    let current_raw = word(body, CURRENT_OFFSET)? as i16;

    let mut cell_voltages = [0.0; CELL_COUNT];
    for (i, cell) in cell_voltages.iter_mut().enumerate() {
        *cell = scaled(body, CELLS_OFFSET + 4 * i, 1000.0)?;
    }

    let mut temps = [0.0; AUX_TEMP_COUNT];
    for (i, temp) in temps.iter_mut().enumerate() {
        *temp = scaled(body, TEMPS_OFFSET + 4 * i, 10.0)?;
    }

    let reading = BatteryReading {
        state_of_health: scaled(body, SOH_OFFSET, 1.0)?,
        state_of_charge: scaled(body, SOC_OFFSET, 100.0)?,
        energy: voltage_raw as f64 * capacity_raw as f64 / 100.0 / 100.0 / 1000.0,
        current: current_raw as f64 / 100.0,
        voltage: voltage_raw as f64 / 100.0,
        cell_voltages,
        env_temp: scaled(body, ENV_TEMP_OFFSET, 10.0)?,
        cell_temp: scaled(body, CELL_TEMP_OFFSET, 10.0)?,
        mos_temp: scaled(body, MOS_TEMP_OFFSET, 10.0)?,
        temps,
    };

    debug!(
        "SOH {}% | SOC {}% | capacity {}Ah | energy {}kWh | current {}A | voltage {}V",
        reading.state_of_health,
        reading.state_of_charge,
        capacity_raw as f64 / 100.0,
        reading.energy,
        reading.current,
        reading.voltage
    );
    debug!(
        "env {}°C | cell {}°C | MOS {}°C | probes {:?}°C",
        reading.env_temp, reading.cell_temp, reading.mos_temp, reading.temps
    );
    debug!("cells {:?}V", reading.cell_voltages);

    Ok(reading)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a body with the given words placed at their offsets, zeros elsewhere
    pub(crate) fn body_with(words: &[(usize, u16)]) -> String {
        let mut body = vec![b'0'; TELEMETRY_SPAN];
        for &(offset, value) in words {
            body[offset..offset + 4].copy_from_slice(format!("{value:04X}").as_bytes());
        }
        String::from_utf8(body).unwrap()
    }

    pub(crate) fn sample_body() -> String {
        let mut words = vec![
            (SOC_OFFSET, 8750),
            (VOLTAGE_OFFSET, 5312),
            (ENV_TEMP_OFFSET, 215),
            (CELL_TEMP_OFFSET, 230),
            (MOS_TEMP_OFFSET, 251),
            (CURRENT_OFFSET, 0xFF83),
            (SOH_OFFSET, 98),
            (CAPACITY_OFFSET, 8800),
        ];
        for i in 0..CELL_COUNT {
            words.push((CELLS_OFFSET + 4 * i, 3300 + i as u16));
        }
        for i in 0..AUX_TEMP_COUNT {
            words.push((TEMPS_OFFSET + 4 * i, 200 + i as u16));
        }
        body_with(&words)
    }

    #[test]
    fn test_decode_sample_body() {
        let reading = decode(&sample_body()).unwrap();

        assert_eq!(reading.state_of_charge, 87.5);
        assert_eq!(reading.voltage, 53.12);
        assert_eq!(reading.state_of_health, 98.0);
        assert_eq!(reading.current, -1.25);
        assert_eq!(reading.env_temp, 21.5);
        assert_eq!(reading.cell_temp, 23.0);
        assert_eq!(reading.mos_temp, 25.1);
        assert_eq!(reading.cell_voltages[0], 3.3);
        assert_eq!(reading.cell_voltages[15], 3.315);
        assert_eq!(reading.temps, [20.0, 20.1, 20.2, 20.3]);
        assert_eq!(reading.energy, 5312.0 * 8800.0 / 100.0 / 100.0 / 1000.0);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let body = sample_body();
        assert_eq!(decode(&body).unwrap(), decode(&body).unwrap());
    }

    #[test]
    fn test_energy_from_raw_voltage_and_capacity() {
        let body = body_with(&[(VOLTAGE_OFFSET, 0x2710), (CAPACITY_OFFSET, 0x2710)]);
        let reading = decode(&body).unwrap();
        assert_eq!(reading.voltage, 100.0);
        assert_eq!(reading.energy, 10.0);
    }

    #[test]
    fn test_current_sign() {
        let reading = decode(&body_with(&[(CURRENT_OFFSET, 0x8000)])).unwrap();
        assert_eq!(reading.current, -327.68);

        let reading = decode(&body_with(&[(CURRENT_OFFSET, 0x0001)])).unwrap();
        assert_eq!(reading.current, 0.01);

        let reading = decode(&body_with(&[(CURRENT_OFFSET, 0x7FFF)])).unwrap();
        assert_eq!(reading.current, 327.67);

        let reading = decode(&body_with(&[(CURRENT_OFFSET, 0xFFFF)])).unwrap();
        assert_eq!(reading.current, -0.01);
    }

    #[test]
    fn test_decode_rejects_short_body() {
        let body = &sample_body()[..120];
        assert_eq!(decode(body), Err(DecodeError::Truncated { len: 120 }));
    }

    #[test]
    fn test_decode_rejects_non_hex_window() {
        let mut body = sample_body().into_bytes();
        body[SOH_OFFSET + 1] = b'G';
        let body = String::from_utf8(body).unwrap();
        assert!(matches!(
            decode(&body),
            Err(DecodeError::InvalidHex { offset: SOH_OFFSET, .. })
        ));
    }

    #[test]
    fn test_decode_ignores_bytes_outside_windows() {
        let mut body = sample_body().into_bytes();
        // 0..2, 10..12, 88..90 and 110..114 are not read
        for i in [0, 1, 10, 11, 88, 89, 110, 113] {
            body[i] = b'x';
        }
        let body = String::from_utf8(body).unwrap();
        assert_eq!(decode(&body).unwrap(), decode(&sample_body()).unwrap());
    }
}
