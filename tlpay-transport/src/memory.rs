//! In-memory transport
//!
//! A scripted stand-in for the terminal. Bytes queued with
//! [`MemoryTransport::push_incoming`] are readable immediately; replies
//! queued with [`MemoryTransport::reply`] are released one per frame the
//! host writes. Single-byte writes (ACK/NAK) are recorded but do not
//! release a reply; bytes queued with [`MemoryTransport::resend_on_nak`]
//! are released when the host writes NAK instead. Reads that find nothing wait out their full timeout on
//! the tokio clock, so tests can run with paused time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use tracing::trace;

use crate::{Transport, error::*};

const NAK: u8 = 0x15;

#[derive(Debug, Default)]
struct State {
    open: bool,
    incoming: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    on_nak: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    opens: usize,
    closes: usize,
    fail_writes: bool,
}

/// Scripted in-memory transport
///
/// Clones share the same state, so a test can keep one handle to inspect
/// what the client wrote after moving another into it.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
}

impl MemoryTransport {
    /// Create an empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Make bytes readable right away
    pub fn push_incoming(&self, bytes: &[u8]) {
        self.state.lock().incoming.extend(bytes);
    }

    /// Queue bytes to be released after the next frame written by the host
    pub fn reply(&self, bytes: impl Into<Vec<u8>>) -> &Self {
        self.state.lock().replies.push_back(bytes.into());
        self
    }

    /// Queue bytes to be released after the next NAK written by the host
    pub fn resend_on_nak(&self, bytes: impl Into<Vec<u8>>) -> &Self {
        self.state.lock().on_nak.push_back(bytes.into());
        self
    }

    /// Make every write fail with a short write
    pub fn fail_writes(&self) {
        self.state.lock().fail_writes = true;
    }

    /// Everything written by the host, one entry per write
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    /// Frames written by the host (multi-byte writes)
    pub fn frames_written(&self) -> Vec<Vec<u8>> {
        self.written().into_iter().filter(|w| w.len() > 1).collect()
    }

    /// Control bytes written by the host (single-byte writes)
    pub fn controls_written(&self) -> Vec<u8> {
        self.written()
            .into_iter()
            .filter(|w| w.len() == 1)
            .map(|w| w[0])
            .collect()
    }

    /// Bytes still unread
    pub fn pending(&self) -> usize {
        self.state.lock().incoming.len()
    }

    /// Number of times the channel was opened
    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    /// Number of times the channel was closed
    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.open {
            return Err(Error::AlreadyConnected);
        }
        state.open = true;
        state.opens += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.open = false;
        state.closes += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(Error::NotConnected);
        }
        if state.fail_writes {
            return Err(Error::ShortWrite { written: 0, expected: data.len() });
        }

        trace!("memory << {}", hex::encode(data));
        state.written.push(data.to_vec());

        let released = match data {
            [NAK] => state.on_nak.pop_front(),
            [_] => None,
            _ => state.replies.pop_front(),
        };
        if let Some(bytes) = released {
            state.incoming.extend(bytes);
        }
        Ok(())
    }

    async fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<BytesMut> {
        {
            let mut state = self.state.lock();
            if !state.open {
                return Err(Error::NotConnected);
            }
            if state.incoming.len() >= len {
                let bytes: Vec<u8> = state.incoming.drain(..len).collect();
                return Ok(BytesMut::from(&bytes[..]));
            }
        }

        tokio::time::sleep(timeout).await;

        let mut state = self.state.lock();
        let received = state.incoming.len();
        state.incoming.clear();
        Err(Error::ReadTimeout { expected: len, received })
    }

    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        {
            let mut state = self.state.lock();
            if !state.open {
                return Err(Error::NotConnected);
            }
            if let Some(b) = state.incoming.pop_front() {
                return Ok(Some(b));
            }
        }

        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(50);

    #[tokio::test(start_paused = true)]
    async fn test_memory_requires_open() {
        let mut transport = MemoryTransport::new();

        assert!(matches!(transport.write(b"xx").await, Err(Error::NotConnected)));
        assert!(matches!(transport.read_byte(WAIT).await, Err(Error::NotConnected)));

        transport.open().await.unwrap();
        assert!(matches!(transport.open().await, Err(Error::AlreadyConnected)));
        assert_eq!(transport.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_reply_released_on_frame_write() {
        let handle = MemoryTransport::new();
        handle.reply(vec![0x06, 0x02]);
        let mut transport = handle.clone();
        transport.open().await.unwrap();

        assert_eq!(transport.read_byte(WAIT).await.unwrap(), None);

        // control bytes do not release a reply
        transport.write(&[0x15]).await.unwrap();
        assert_eq!(handle.pending(), 0);

        transport.write(b"FRAME").await.unwrap();
        assert_eq!(transport.read_byte(WAIT).await.unwrap(), Some(0x06));
        assert_eq!(transport.read_byte(WAIT).await.unwrap(), Some(0x02));

        assert_eq!(handle.controls_written(), vec![0x15]);
        assert_eq!(handle.frames_written(), vec![b"FRAME".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_resend_on_nak() {
        let handle = MemoryTransport::new();
        handle.resend_on_nak(b"again".to_vec());
        let mut transport = handle.clone();
        transport.open().await.unwrap();

        transport.write(&[0x06]).await.unwrap();
        assert_eq!(handle.pending(), 0);

        transport.write(&[NAK]).await.unwrap();
        let bytes = transport.read_exact(5, WAIT).await.unwrap();
        assert_eq!(&bytes[..], b"again");
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_read_exact_timeout() {
        let handle = MemoryTransport::new();
        let mut transport = handle.clone();
        transport.open().await.unwrap();
        handle.push_incoming(b"ab");

        let err = transport.read_exact(3, WAIT).await.unwrap_err();
        assert!(matches!(err, Error::ReadTimeout { expected: 3, received: 2 }));

        handle.push_incoming(b"abc");
        let bytes = transport.read_exact(3, WAIT).await.unwrap();
        assert_eq!(&bytes[..], b"abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_fail_writes() {
        let handle = MemoryTransport::new();
        let mut transport = handle.clone();
        transport.open().await.unwrap();
        handle.fail_writes();

        assert!(matches!(
            transport.write(b"frame").await,
            Err(Error::ShortWrite { written: 0, expected: 5 })
        ));
        transport.close().await.unwrap();
        assert_eq!(handle.closes(), 1);
    }
}
