//! High-level error types

use std::time::Duration;

use tlpay_core::JobCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] tlpay_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] tlpay_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] tlpay_types::Error),

    #[error("Terminal kept answering NAK after {retries} resends")]
    RetryExhausted { retries: u32 },

    #[error("No ACK, NAK or frame start within {waited:?}")]
    HandshakeTimeout { waited: Duration },

    #[error("ACK received but no {expected} frame started within {waited:?}")]
    ResponseTimeout { waited: Duration, expected: JobCode },

    #[error("No {expected} reply within the {window:?} follow-up window")]
    FollowUpExceeded { window: Duration, expected: JobCode },

    #[error("Terminal did not resend {expected} after NAK")]
    ResendTimeout { expected: JobCode },
}

impl Error {
    /// Check if the exchange ran out of time
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::HandshakeTimeout { .. }
            | Self::ResponseTimeout { .. }
            | Self::FollowUpExceeded { .. }
            | Self::ResendTimeout { .. } => true,
            Self::Transport(e) => {
                e.is_read_timeout() || matches!(e, tlpay_transport::Error::ConnectionTimeout)
            }
            _ => false,
        }
    }

    /// Check if the terminal misbehaved at the protocol level
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Core(_) | Self::RetryExhausted { .. })
    }

    /// Short, stable diagnostic code
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Core(_) => "protocol",
            Self::Transport(_) => "transport",
            Self::Types(_) => "validation",
            Self::RetryExhausted { .. } => "retry-exhausted",
            Self::HandshakeTimeout { .. } => "handshake-timeout",
            Self::ResponseTimeout { .. } => "response-timeout",
            Self::FollowUpExceeded { .. } => "follow-up-exceeded",
            Self::ResendTimeout { .. } => "resend-timeout",
        }
    }
}
