//! Checksums used by the JC03 frame format.
//!
//! Every frame carries two independent checks: a 16-bit two's-complement sum
//! over the ASCII text of the frame, and a 4-bit checksum packed into the top
//! nibble of the LENID length field.

use crate::constants::{EOI, SOI};

/// Compute the frame checksum over `text`.
///
/// Sums the ASCII code of every character modulo 2^16, then negates the sum
/// (complement plus one). For a response this is applied to everything
/// between the SOI marker and the trailing checksum field.
pub fn frame_checksum(text: &str) -> u16 {
    let sum = text
        .bytes()
        .fold(0u16, |acc, byte| acc.wrapping_add(byte as u16));
    (!sum).wrapping_add(1)
}

/// Pack a 12-bit body length into a LENID field.
///
/// The three nibbles of the length are summed, the low 4 bits of the sum are
/// negated within 4 bits and the result goes into bits 12..16. Bits above the
/// 12-bit length in `value` are ignored.
pub fn length_checksum(value: u16) -> u16 {
    let length = value & 0x0FFF;
    let nibbles = (length & 0xF) + ((length >> 4) & 0xF) + ((length >> 8) & 0xF);
    let check = (((nibbles & 0xF) ^ 0xF) + 1) & 0xF;
    (check << 12) | length
}

/// Check a received LENID field against its embedded checksum nibble.
pub fn length_checksum_valid(lenid: u16) -> bool {
    length_checksum(lenid & 0x0FFF) == lenid
}

/// Build a complete outgoing frame, SOI to EOI.
///
/// `info` is the hex-encoded command information; its length is stamped into
/// the LENID field and the frame checksum is appended before the delimiter.
pub fn encode_frame(version: u8, address: u8, cid1: u8, cid2: u8, info: &str) -> String {
    let lenid = length_checksum(info.len() as u16);
    let inner = format!("{version:02X}{address:02X}{cid1:02X}{cid2:02X}{lenid:04X}{info}");
    let checksum = frame_checksum(&inner);
    format!("{}{inner}{checksum:04X}{}", SOI as char, EOI as char)
}
