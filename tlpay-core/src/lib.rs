//! # tlpay-core
//!
//! Core protocol implementation for serial-attached card payment terminals.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding (strict and lenient)
//! - BCC checksum calculation
//! - Job code definitions
//! - Header sanity checks and resynchronization
//! - Request payload builders

pub mod checksum;
pub mod constants;
pub mod error;
pub mod frame;
pub mod header;
pub mod job;
pub mod pad;
pub mod request;

pub use error::{Error, Result};
pub use frame::{Frame, FrameBuilder};
pub use header::{Anchor, Header, Resync};
pub use job::JobCode;
pub use request::{Requests, SignatureMode};
