//! Protocol constants for JC03 BMS communication.
//!
//! This module defines the fixed request frames, frame layout offsets and
//! timing parameters used by the JC03 ASCII-hex serial protocol.

/// End-of-frame delimiter (carriage return)
pub const EOI: u8 = 0x0D;

/// Start-of-frame marker
pub const SOI: u8 = b'~';

/// Protocol version field sent in every request
pub const PROTOCOL_VERSION: u8 = 0x22;

/// Device address field sent in every request
pub const DEVICE_ADDRESS: u8 = 0x01;

/// Device type field (battery) sent in every request
pub const CID1_BATTERY: u8 = 0x4A;

/// Analog values request, sent three times at the start of each cycle
pub const STATUS_REQUEST: &[u8] = b"~22014A42E00201FD28\r";

/// First alternate command (CID2 0x4D)
pub const COMMAND_A_REQUEST: &[u8] = b"~22014A4D0000FD8E\r";

/// Second alternate command (CID2 0x51)
pub const COMMAND_B_REQUEST: &[u8] = b"~22014A510000FDA0\r";

/// Last command of a cycle (CID2 0x47) before starting over
pub const CYCLE_RESTART_REQUEST: &[u8] = b"~22014A47E00201FD23\r";

/// Offset of the 2-character CID2 status code in a response
pub const CID2_OFFSET: usize = 7;

/// Offset of the 4-character LENID field in a response
pub const LENID_OFFSET: usize = 9;

/// Offset of the first body character in a response
pub const BODY_OFFSET: usize = 13;

/// Width of the trailing frame checksum in characters
pub const CHECKSUM_LEN: usize = 4;

/// Shortest response that holds every header field plus the checksum
pub const MIN_FRAME_LEN: usize = BODY_OFFSET + CHECKSUM_LEN;

/// Shortest body accepted as a telemetry reply
pub const MIN_BODY_LEN: usize = 118;

/// Body length needed to read every telemetry window
pub const TELEMETRY_SPAN: usize = 128;

/// Number of cells reported by the BMS
pub const CELL_COUNT: usize = 16;

/// Number of auxiliary temperature probes reported by the BMS
pub const AUX_TEMP_COUNT: usize = 4;

/// Default serial baud rate
pub const BAUD_RATE: u32 = 9600;

/// Per-step send/receive timeout (and pause between retries) in seconds
pub const STEP_BUDGET_SECS: u64 = 3;

/// Default interval between polls in seconds
pub const UPDATE_INTERVAL_SECS: u64 = 5;

/// Upper bound on buffered bytes while waiting for a delimiter
pub const MAX_FRAME_BYTES: usize = 4096;
