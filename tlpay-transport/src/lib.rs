//! Transport layer for the terminal protocol
//!
//! The protocol needs nothing more than a byte channel: open/close, a
//! whole-buffer write, a read of exactly N bytes with a timeout, and a
//! single-byte read that reports "nothing arrived" as `None`.

pub mod error;
pub mod memory;
pub mod tcp;

pub use error::{Error, Result};
pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Byte channel to a payment terminal
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel
    async fn open(&mut self) -> Result<()>;

    /// Close the channel
    async fn close(&mut self) -> Result<()>;

    /// Check if open
    fn is_open(&self) -> bool;

    /// Write the whole buffer
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `len` bytes, failing with [`Error::ReadTimeout`] if they
    /// do not all arrive within `timeout`
    async fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<BytesMut>;

    /// Read one byte, or `None` if nothing arrived within `timeout`
    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    /// Human-readable endpoint name for logs
    fn name(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data).await
    }

    async fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<BytesMut> {
        (**self).read_exact(len, timeout).await
    }

    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte(timeout).await
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
