//! Caller-facing view of a decoded frame

use std::fmt;

use tlpay_core::Frame;

/// Decoded frame as reported to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    /// Terminal identifier (CAT/MID)
    pub terminal_id: String,

    /// `YYYYMMDDhhmmss`
    pub timestamp: String,

    /// Job code as a one-character string
    pub job: String,

    /// Header response code
    pub response_code: u32,

    /// Payload as uppercase hex
    pub data_hex: String,
}

impl From<&Frame> for FrameSummary {
    fn from(frame: &Frame) -> Self {
        Self {
            terminal_id: frame.terminal_id.clone(),
            timestamp: frame.timestamp.clone(),
            job: frame.job.as_char().to_string(),
            response_code: u32::from(frame.response_code),
            data_hex: hex::encode_upper(&frame.payload),
        }
    }
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame[id: {}, ts: {}, job: {}, resp: {}, data: {}]",
            self.terminal_id, self.timestamp, self.job, self.response_code, self.data_hex
        )
    }
}
