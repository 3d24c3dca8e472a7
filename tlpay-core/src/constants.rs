//! Protocol constants

/// Frame start marker
pub const STX: u8 = 0x02;

/// Frame terminator
pub const ETX: u8 = 0x03;

/// Positive handshake byte
pub const ACK: u8 = 0x06;

/// Negative handshake byte
pub const NAK: u8 = 0x15;

/// Terminal identifier (CAT/MID) width
pub const ID_LEN: usize = 16;

/// Timestamp width (`YYYYMMDDhhmmss`)
pub const TIMESTAMP_LEN: usize = 14;

/// Header size, start marker through payload length
pub const HEADER_SIZE: usize = 35;

/// Terminator + checksum
pub const TRAILER_SIZE: usize = 2;

/// Largest payload length a sane header may declare
pub const MAX_SANE_PAYLOAD: usize = 4096;

/// Header field offsets, counted from the start marker
pub mod offsets {
    pub const START: usize = 0;
    pub const ID: usize = 1;
    pub const TIMESTAMP: usize = ID + super::ID_LEN;
    pub const JOB: usize = TIMESTAMP + super::TIMESTAMP_LEN;
    pub const RESPONSE_CODE: usize = JOB + 1;
    pub const PAYLOAD_LEN: usize = RESPONSE_CODE + 1;
    pub const PAYLOAD: usize = PAYLOAD_LEN + 2;
}

/// Default handshake (ACK/NAK/STX) wait in milliseconds
pub const DEFAULT_ACK_WAIT_MS: u64 = 3_000;

/// Default response wait in milliseconds
pub const DEFAULT_RESPONSE_WAIT_MS: u64 = 25_000;

/// Default follow-up window in milliseconds
pub const DEFAULT_FOLLOW_UP_WINDOW_MS: u64 = 180_000;

/// Maximum resends after NAK
pub const MAX_RETRIES: u32 = 3;
