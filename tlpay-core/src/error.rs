//! Error types for tlpay-core

/// Result type alias for tlpay-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Buffer is too short to hold a header and trailer
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// First byte is not the start marker
    #[error("Start marker mismatch: 0x{0:02X}")]
    StartMarkerMismatch(u8),

    /// Declared payload length runs past the end of the buffer
    #[error("Incomplete frame: len={actual}, expected={expected} (payload_len={payload_len})")]
    IncompleteFrame {
        actual: usize,
        expected: usize,
        payload_len: usize,
    },

    /// Byte at the computed terminator position is not ETX
    #[error("Terminator mismatch at {position}: 0x{found:02X} (payload_len={payload_len})")]
    TerminatorMismatch {
        position: usize,
        found: u8,
        payload_len: usize,
    },

    /// BCC verification failed
    #[error("Checksum mismatch: calc=0x{calculated:02X}, recv=0x{received:02X}")]
    ChecksumMismatch {
        calculated: u8,
        received: u8,
    },

    /// Unknown job code byte
    #[error("Unknown job code: 0x{0:02X}")]
    UnknownJobCode(u8),

    /// Timestamp is not 14 characters (`YYYYMMDDhhmmss`)
    #[error("Invalid timestamp: {0:?} (must be 14 chars YYYYMMDDhhmmss)")]
    InvalidTimestamp(String),

    /// Required builder field not set
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Payload does not fit the 16-bit length field
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
}

impl Error {
    /// Check if the failure is confined to the trailer (terminator/checksum)
    ///
    /// Such frames still carry a usable header and payload and may be
    /// salvaged with [`Frame::decode_lenient`](crate::Frame::decode_lenient).
    pub fn is_trailer_error(&self) -> bool {
        matches!(
            self,
            Self::TerminatorMismatch { .. } | Self::ChecksumMismatch { .. }
        )
    }
}
