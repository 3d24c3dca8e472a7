//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Channel is not open")]
    NotConnected,

    #[error("Channel is already open")]
    AlreadyConnected,

    #[error("Timed out opening channel")]
    ConnectionTimeout,

    #[error("Read timeout: got {received} of {expected} bytes")]
    ReadTimeout { expected: usize, received: usize },

    #[error("Terminal side closed the channel")]
    ConnectionClosed,

    #[error("Short write: {written}/{expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("Channel I/O: {0}")]
    Io(#[from] io::Error),

    #[error("Bad endpoint {0}")]
    InvalidAddress(String),
}

impl Error {
    /// Check if the error is a read that ran out of time
    pub fn is_read_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout { .. })
    }
}
