//! # tlpay
//!
//! Client for card payment terminals speaking the STX/ETX framed serial
//! protocol.
//!
//! ## Features
//!
//! - Strict and lenient frame decoding with XOR checksum
//! - ACK/NAK handshake with bounded resends
//! - Header resynchronization after line noise
//! - Event frames filtered out of request/response exchanges
//! - One exchange at a time through a fair lock
//!
//! ## Quick Start
//!
//! ```no_run
//! use tlpay::{ApproveRequest, Client, ClientConfig, Gateway, Requests};
//! use tlpay_transport::TcpTransport;
//!
//! #[tokio::main]
//! async fn main() -> tlpay::Result<()> {
//!     let transport = TcpTransport::new("192.168.0.50", 4001);
//!     let gateway = Gateway::new(
//!         Client::new(transport, ClientConfig::default()),
//!         Requests::new("CAT0001"),
//!     );
//!
//!     let request = ApproveRequest::new("1004");
//!     request.validate()?;
//!
//!     let reply = gateway.approve(&request).await?;
//!     println!("{}", tlpay::FrameSummary::from(&reply));
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;

// Re-exports
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use gateway::Gateway;

// Re-export types
pub use tlpay_core::{Frame, JobCode, Requests};
pub use tlpay_types::{ApproveRequest, CancelRequest, FrameSummary, SignatureMode};
