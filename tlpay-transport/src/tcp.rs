//! TCP transport
//!
//! For terminals wired to a serial device server (RS-232 to Ethernet
//! bridge) that passes the raw serial byte stream through a TCP port.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tracing::{debug, trace, warn};

use crate::{Transport, error::*};

/// Byte channel to a terminal behind a serial device server
pub struct TcpTransport {
    host: String,
    port: u16,
    resolved: Option<SocketAddr>,
    stream: Option<TcpStream>,
    open_timeout: Duration,
    drain_window: Duration,
}

impl TcpTransport {
    /// Create a transport for `host:port`; nothing is connected yet
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            resolved: None,
            stream: None,
            open_timeout: Duration::from_secs(5),
            drain_window: Duration::from_millis(250),
        }
    }

    /// Set how long `open` may take
    pub fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.open_timeout = limit;
        self
    }

    /// Set how long stale input is drained after opening
    pub fn with_drain_window(mut self, window: Duration) -> Self {
        self.drain_window = window;
        self
    }

    // Looked up once; the bridge address does not move between calls.
    async fn endpoint(&mut self) -> Result<SocketAddr> {
        if let Some(resolved) = self.resolved {
            return Ok(resolved);
        }

        let target = format!("{}:{}", self.host, self.port);
        let resolved = tokio::net::lookup_host(&target)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{target}: {e}")))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("{target}: no address")))?;

        self.resolved = Some(resolved);
        Ok(resolved)
    }

    /// Discard whatever the bridge buffered while nobody was listening
    async fn drain_input(stream: &mut TcpStream, window: Duration) -> Result<usize> {
        let deadline = Instant::now() + window;
        let mut scratch = [0u8; 256];
        let mut discarded = 0;

        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match timeout(left, stream.read(&mut scratch)).await {
                Err(_) => break,
                Ok(Ok(0)) => return Err(Error::ConnectionClosed),
                Ok(Ok(n)) => discarded += n,
                Ok(Err(e)) => return Err(e.into()),
            }
        }

        if discarded > 0 {
            debug!(discarded, "Dropped stale bridge input");
        }
        Ok(discarded)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let endpoint = self.endpoint().await?;
        debug!(%endpoint, "Opening bridge connection");

        let mut stream = match timeout(self.open_timeout, TcpStream::connect(endpoint)).await {
            Ok(connected) => connected?,
            Err(_) => return Err(Error::ConnectionTimeout),
        };

        // ACK/NAK go out as single bytes
        stream.set_nodelay(true)?;

        // the stream is kept only once it survived the drain
        Self::drain_input(&mut stream, self.drain_window).await?;
        self.stream = Some(stream);

        debug!(%endpoint, "Bridge connection open");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        debug!("Closing bridge connection to {}", self.name());
        if let Err(e) = stream.shutdown().await {
            trace!("Shutdown: {}", e);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        trace!("bridge << {}", hex::encode_upper(data));
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_exact(&mut self, len: usize, wait: Duration) -> Result<BytesMut> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let deadline = Instant::now() + wait;
        let mut buf = BytesMut::zeroed(len);
        let mut filled = 0;

        while filled < len {
            let Some(left) = deadline.checked_duration_since(Instant::now()) else {
                return Err(Error::ReadTimeout { expected: len, received: filled });
            };

            let n = timeout(left, stream.read(&mut buf[filled..]))
                .await
                .map_err(|_| Error::ReadTimeout { expected: len, received: filled })??;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            filled += n;
        }

        trace!("bridge >> {}", hex::encode_upper(&buf));
        Ok(buf)
    }

    async fn read_byte(&mut self, wait: Duration) -> Result<Option<u8>> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        match timeout(wait, stream.read_u8()).await {
            Err(_) => Ok(None),
            Ok(Ok(byte)) => Ok(Some(byte)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(Error::ConnectionClosed)
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }

    fn name(&self) -> String {
        match self.resolved {
            Some(endpoint) => endpoint.to_string(),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("Bridge connection to {} dropped without close", self.name());
        }
    }
}
