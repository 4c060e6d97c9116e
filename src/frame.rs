//! Response frame validation.
//!
//! A response looks like `~VVAACCSSLLLLBODY…CCCC\r` where `SS` is the CID2
//! status code, `LLLL` the LENID field and `CCCC` the frame checksum. The
//! checks run in the order the device documents them and stop at the first
//! failure.

use crate::checksum::{frame_checksum, length_checksum_valid};
use crate::constants::*;
use crate::telemetry::{self, DecodeError};
use crate::types::{BatteryReading, StatusCode};
use thiserror::Error;

/// Reasons a response is discarded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Nothing usable was read from the transport
    #[error("no response")]
    NoResponse,

    #[error("response is not ASCII text")]
    Unreadable,

    #[error("response too short: {len} characters")]
    Truncated { len: usize },

    #[error("device reported {0}")]
    Status(StatusCode),

    #[error("invalid hex in {field}")]
    InvalidHex { field: &'static str },

    #[error("data length error: LENID {lenid:04X}")]
    LengthChecksum { lenid: u16 },

    #[error("checksum error: calculated {calculated:04X}, received {received:04X}")]
    Checksum { calculated: u16, received: u16 },

    #[error("body too short: {len} characters")]
    UndersizedBody { len: usize },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

fn hex_u16(digits: &str, field: &'static str) -> Result<u16, FrameError> {
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FrameError::InvalidHex { field });
    }
    u16::from_str_radix(digits, 16).map_err(|_| FrameError::InvalidHex { field })
}

/// A response that passed every frame-level check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame<'a> {
    text: &'a str,
    lenid: u16,
    checksum: u16,
}

impl<'a> ResponseFrame<'a> {
    /// Validate raw bytes read from the transport.
    ///
    /// A trailing delimiter is stripped if present.
    pub fn parse(raw: &'a [u8]) -> Result<Self, FrameError> {
        let raw = raw.strip_suffix(&[EOI]).unwrap_or(raw);
        if !raw.is_ascii() {
            return Err(FrameError::Unreadable);
        }
        let text = std::str::from_utf8(raw).map_err(|_| FrameError::Unreadable)?;
        if text.len() < MIN_FRAME_LEN {
            return Err(FrameError::Truncated { len: text.len() });
        }

        let cid2 = &raw[CID2_OFFSET..CID2_OFFSET + 2];
        let status = StatusCode::from_cid2([cid2[0], cid2[1]]);
        if !status.is_ok() {
            return Err(FrameError::Status(status));
        }

        let lenid = hex_u16(&text[LENID_OFFSET..LENID_OFFSET + 4], "LENID")?;
        if !length_checksum_valid(lenid) {
            return Err(FrameError::LengthChecksum { lenid });
        }

        let checksum_at = text.len() - CHECKSUM_LEN;
        let received = hex_u16(&text[checksum_at..], "CHKSUM")?;
        let calculated = frame_checksum(&text[1..checksum_at]);
        if calculated != received {
            return Err(FrameError::Checksum {
                calculated,
                received,
            });
        }

        let frame = ResponseFrame {
            text,
            lenid,
            checksum: received,
        };
        let len = frame.body().len();
        if len < MIN_BODY_LEN {
            return Err(FrameError::UndersizedBody { len });
        }
        Ok(frame)
    }

    /// Text between the LENID field and the checksum
    pub fn body(&self) -> &'a str {
        &self.text[BODY_OFFSET..self.text.len() - CHECKSUM_LEN]
    }

    /// Body length announced by the LENID field
    pub fn declared_length(&self) -> usize {
        (self.lenid & 0x0FFF) as usize
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Decode the body into a reading
    pub fn decode(&self) -> Result<BatteryReading, FrameError> {
        Ok(telemetry::decode(self.body())?)
    }
}

/// Build a well-formed response around `body` with the given CID2
#[cfg(test)]
pub(crate) fn build_response(cid2: &str, body: &str) -> Vec<u8> {
    use crate::checksum::length_checksum;

    let lenid = length_checksum(body.len() as u16);
    let inner = format!("22014A{cid2}{lenid:04X}{body}");
    let checksum = frame_checksum(&inner);
    format!("~{inner}{checksum:04X}\r").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::tests::sample_body;

    #[test]
    fn test_parse_valid_response() {
        let body = sample_body();
        let raw = build_response("00", &body);
        let frame = ResponseFrame::parse(&raw).unwrap();
        assert_eq!(frame.body(), body);
        assert_eq!(frame.declared_length(), body.len());
        assert!(frame.decode().is_ok());
    }

    #[test]
    fn test_parse_without_delimiter() {
        let raw = build_response("00", &sample_body());
        assert!(ResponseFrame::parse(&raw[..raw.len() - 1]).is_ok());
    }

    #[test]
    fn test_status_error_is_rejected_before_checksums() {
        // Garbage checksum too: the status code must be reported first
        let mut raw = build_response("91", &sample_body());
        let n = raw.len();
        raw[n - 3] = b'X';
        assert_eq!(
            ResponseFrame::parse(&raw),
            Err(FrameError::Status(StatusCode::BatteryCommunicationError))
        );
    }

    #[test]
    fn test_every_error_status_is_rejected() {
        for code in ["01", "02", "03", "04", "05", "06", "90", "91", "A7"] {
            let raw = build_response(code, &sample_body());
            assert!(
                matches!(ResponseFrame::parse(&raw), Err(FrameError::Status(_))),
                "CID2 {code}"
            );
        }
    }

    #[test]
    fn test_truncated_response() {
        assert_eq!(
            ResponseFrame::parse(b"~22014A00\r"),
            Err(FrameError::Truncated { len: 9 })
        );
        assert_eq!(ResponseFrame::parse(b""), Err(FrameError::Truncated { len: 0 }));
    }

    #[test]
    fn test_non_ascii_response() {
        let mut raw = build_response("00", &sample_body());
        raw[20] = 0xC3;
        assert_eq!(ResponseFrame::parse(&raw), Err(FrameError::Unreadable));
    }

    #[test]
    fn test_length_checksum_mismatch() {
        let raw = build_response("00", &sample_body());
        let mut text = String::from_utf8(raw).unwrap();
        // 128 = 0x080 → LENID 8080; flip the checksum nibble
        text.replace_range(LENID_OFFSET..LENID_OFFSET + 4, "7080");
        let inner = text[1..text.len() - 5].to_string();
        let checksum = frame_checksum(&inner);
        text.replace_range(text.len() - 5..text.len() - 1, &format!("{checksum:04X}"));
        assert_eq!(
            ResponseFrame::parse(text.as_bytes()),
            Err(FrameError::LengthChecksum { lenid: 0x7080 })
        );
    }

    #[test]
    fn test_frame_checksum_mismatch() {
        let mut raw = build_response("00", &sample_body());
        raw[BODY_OFFSET + 3] = b'9';
        assert!(matches!(
            ResponseFrame::parse(&raw),
            Err(FrameError::Checksum { .. })
        ));
    }

    #[test]
    fn test_non_hex_checksum() {
        let mut raw = build_response("00", &sample_body());
        let n = raw.len();
        raw[n - 2] = b'Z';
        assert_eq!(
            ResponseFrame::parse(&raw),
            Err(FrameError::InvalidHex { field: "CHKSUM" })
        );
    }

    #[test]
    fn test_undersized_body() {
        let body = &sample_body()[..MIN_BODY_LEN - 1];
        let raw = build_response("00", body);
        assert_eq!(
            ResponseFrame::parse(&raw),
            Err(FrameError::UndersizedBody {
                len: MIN_BODY_LEN - 1
            })
        );
    }

    #[test]
    fn test_body_shorter_than_telemetry_span_fails_decode() {
        let body = &sample_body()[..MIN_BODY_LEN];
        let raw = build_response("00", body);
        let frame = ResponseFrame::parse(&raw).unwrap();
        assert_eq!(
            frame.decode(),
            Err(FrameError::Decode(DecodeError::Truncated { len: MIN_BODY_LEN }))
        );
    }
}
