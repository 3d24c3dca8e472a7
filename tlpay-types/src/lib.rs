//! Type definitions for tlpay

pub mod error;
pub mod request;
pub mod summary;

pub use error::{Error, Result};
pub use request::{ApproveRequest, CancelRequest};
pub use summary::FrameSummary;
pub use tlpay_core::SignatureMode;
