//! Request/response exchange with the terminal
//!
//! One [`Client::request_response`] call is one exchange:
//!
//! 1. Drain stale input, send the request, pause briefly.
//! 2. Wait `ack_wait` for ACK, NAK or a frame start; if nothing arrives,
//!    keep listening for `response_wait`. NAK resends, up to `max_retries`.
//! 3. After a frame start, read the header (re-anchoring on a later STX if
//!    the first read is misaligned), then payload and trailer.
//! 4. Event frames are read and dropped without ACK, and the client keeps
//!    listening in the follow-up window for the real reply.
//! 5. A good frame is ACKed. A frame with a bad trailer is salvaged and
//!    ACKed. Anything else is NAKed and the client waits for the resend.
//!
//! Every wait is bounded, so a silent terminal cannot hold a caller
//! forever.

use std::time::Duration;

use bytes::BytesMut;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, trace, warn};

use tlpay_core::{
    Anchor, Frame, Header, JobCode,
    constants::{ACK, HEADER_SIZE, NAK, STX},
    header::HEADER_REST,
};
use tlpay_transport::{self as transport, Transport};

use crate::{
    config::ClientConfig,
    error::{Error, Result},
};

/// Control byte seen while waiting on the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Ack,
    Nak,
    Start,
}

impl Signal {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ACK => Some(Self::Ack),
            NAK => Some(Self::Nak),
            STX => Some(Self::Start),
            _ => None,
        }
    }
}

/// Where the handshake left us
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handshake {
    /// A frame start was consumed
    Reply,
    /// The terminal asked for the request again
    Resend,
}

/// One frame read after a start marker
#[derive(Debug)]
enum Received {
    Frame(Frame),
    Event,
    ParseFailed(String),
}

/// Protocol client over a transport
///
/// The client does not open or close the transport by itself; see
/// [`Gateway`](crate::Gateway) for the open/exchange/close cycle.
pub struct Client<T: Transport> {
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> Client<T> {
    /// Create a client with the given configuration
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open the transport
    pub async fn open(&mut self) -> Result<()> {
        debug!("Opening {}", self.transport.name());
        self.transport.open().await?;
        Ok(())
    }

    /// Close the transport
    pub async fn close(&mut self) -> Result<()> {
        debug!("Closing {}", self.transport.name());
        self.transport.close().await?;
        Ok(())
    }

    /// Check if the transport is open
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Send a request and return the terminal's matching reply
    ///
    /// Event frames are consumed along the way and never returned. The
    /// reply matches when its job code is the request's expected response,
    /// compared case-insensitively.
    ///
    /// # Errors
    ///
    /// - [`Error::RetryExhausted`] if the terminal keeps answering NAK
    /// - [`Error::HandshakeTimeout`] if the terminal stays silent
    /// - [`Error::ResponseTimeout`] if an ACK is not followed by a frame
    /// - [`Error::FollowUpExceeded`] if no matching reply arrives in the
    ///   follow-up window
    /// - [`Error::ResendTimeout`] if a rejected frame is never resent
    /// - [`Error::Transport`] on I/O failure
    pub async fn request_response(&mut self, request: &Frame) -> Result<Frame> {
        let encoded = request.encode()?;
        let expected = request.job.expected_response();
        let mut resends = 0u32;

        info!(job = %request.job, len = encoded.len(), "Sending request");

        loop {
            self.send(&encoded).await?;

            match self.handshake(expected).await? {
                Handshake::Reply => return self.receive_reply(expected).await,
                Handshake::Resend => {
                    if resends >= self.config.max_retries {
                        warn!(resends, "NAK with no retries left");
                        return Err(Error::RetryExhausted { retries: resends });
                    }
                    resends += 1;
                    warn!(attempt = resends, max = self.config.max_retries, "NAK received, resending");
                }
            }
        }
    }

    async fn send(&mut self, encoded: &[u8]) -> Result<()> {
        self.drain().await?;

        trace!("TX {}", hex::encode_upper(encoded));
        self.transport.write(encoded).await?;

        sleep(self.config.post_write_pause).await;
        Ok(())
    }

    // Discard leftovers of an earlier exchange so they are not taken as
    // the handshake.
    async fn drain(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.config.drain_window;
        let mut drained = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.transport.read_byte(remaining.min(self.config.poll_slice)).await? {
                Some(byte) => drained.push(byte),
                None => break,
            }
        }

        if !drained.is_empty() {
            debug!(count = drained.len(), bytes = %hex::encode_upper(&drained), "Drained stale input");
        }
        Ok(())
    }

    async fn send_control(&mut self, byte: u8) -> Result<()> {
        debug!("TX {}", if byte == ACK { "ACK" } else { "NAK" });
        self.transport.write(&[byte]).await?;
        Ok(())
    }

    async fn handshake(&mut self, expected: JobCode) -> Result<Handshake> {
        let ack_wait = self.config.ack_wait;
        let response_wait = self.config.response_wait;

        let signal = match self.wait_signal(ack_wait).await? {
            Some(signal) => signal,
            None => {
                debug!(?ack_wait, "No handshake yet, waiting for a late one");
                self.wait_signal(response_wait)
                    .await?
                    .ok_or(Error::HandshakeTimeout { waited: ack_wait + response_wait })?
            }
        };

        match signal {
            Signal::Start => {
                debug!("Frame start without ACK");
                Ok(Handshake::Reply)
            }
            Signal::Nak => Ok(Handshake::Resend),
            Signal::Ack => {
                debug!("ACK received");
                self.await_start_after_ack(expected).await
            }
        }
    }

    // Bounded by the response tier, not the follow-up window.
    async fn await_start_after_ack(&mut self, expected: JobCode) -> Result<Handshake> {
        let waited = self.config.response_wait;
        let deadline = Instant::now() + waited;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.wait_signal(remaining).await? {
                Some(Signal::Start) => return Ok(Handshake::Reply),
                Some(Signal::Nak) => return Ok(Handshake::Resend),
                Some(Signal::Ack) => trace!("Duplicate ACK"),
                None => return Err(Error::ResponseTimeout { waited, expected }),
            }
        }
    }

    /// Poll single bytes until a control byte shows up or `wait` elapses
    async fn wait_signal(&mut self, wait: Duration) -> Result<Option<Signal>> {
        let deadline = Instant::now() + wait;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let slice = remaining.min(self.config.poll_slice);
            if let Some(byte) = self.transport.read_byte(slice).await? {
                match Signal::from_byte(byte) {
                    Some(signal) => return Ok(Some(signal)),
                    None => trace!("Skipping stray byte {:02X}", byte),
                }
            }
        }
    }

    /// Wait for a frame start, ignoring ACK/NAK
    async fn wait_start(&mut self, wait: Duration) -> Result<bool> {
        let deadline = Instant::now() + wait;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.wait_signal(remaining).await? {
                Some(Signal::Start) => return Ok(true),
                Some(signal) => trace!(?signal, "Ignoring control byte while waiting for a frame"),
                None => return Ok(false),
            }
        }
    }

    async fn receive_reply(&mut self, expected: JobCode) -> Result<Frame> {
        match self.read_after_start().await? {
            Received::Frame(frame) if expected.matches(frame.job) => Ok(frame),
            Received::Frame(frame) => {
                warn!(%expected, actual = %frame.job, "Unexpected reply, waiting for follow-up");
                self.follow_up(expected).await
            }
            Received::Event => self.follow_up(expected).await,
            Received::ParseFailed(reason) => {
                warn!(%reason, "Reply unreadable, waiting for resend");
                self.await_resend(expected).await
            }
        }
    }

    async fn await_resend(&mut self, expected: JobCode) -> Result<Frame> {
        let deadline = Instant::now() + self.config.response_wait;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.next_received(remaining).await? {
                Some(Received::Frame(frame)) if expected.matches(frame.job) => return Ok(frame),
                Some(Received::Frame(frame)) => {
                    warn!(%expected, actual = %frame.job, "Unexpected job after resend");
                    return self.follow_up(expected).await;
                }
                Some(Received::Event) => return self.follow_up(expected).await,
                Some(Received::ParseFailed(reason)) => warn!(%reason, "Resent frame unreadable"),
                None => return Err(Error::ResendTimeout { expected }),
            }
        }
    }

    async fn follow_up(&mut self, expected: JobCode) -> Result<Frame> {
        let window = self.config.follow_up_window;
        let deadline = Instant::now() + window;

        info!(%expected, ?window, "Waiting for follow-up reply");

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::FollowUpExceeded { window, expected });
            }

            match self.next_received(remaining.min(self.config.response_wait)).await? {
                Some(Received::Frame(frame)) if expected.matches(frame.job) => return Ok(frame),
                Some(Received::Frame(frame)) => {
                    warn!(%expected, actual = %frame.job, "Ignoring unexpected job")
                }
                Some(Received::Event) => debug!("Event during follow-up"),
                Some(Received::ParseFailed(reason)) => warn!(%reason, "Unreadable frame during follow-up"),
                None => trace!("No frame yet"),
            }
        }
    }

    async fn next_received(&mut self, wait: Duration) -> Result<Option<Received>> {
        if !self.wait_start(wait).await? {
            return Ok(None);
        }
        self.read_after_start().await.map(Some)
    }

    /// Read one frame, the start marker already consumed
    async fn read_after_start(&mut self) -> Result<Received> {
        let Some(header) = self.read_header().await? else {
            return Ok(Received::ParseFailed("header unrecoverable".to_string()));
        };

        if header.job().is_some_and(|job| job.is_event()) {
            self.skip_event(&header).await?;
            return Ok(Received::Event);
        }

        self.read_body(header).await
    }

    async fn read_header(&mut self) -> Result<Option<Header>> {
        let Some(raw) = self.read_or_timeout(HEADER_REST).await? else {
            return Ok(None);
        };
        let Ok(rest) = <[u8; HEADER_REST]>::try_from(&raw[..]) else {
            return Ok(None);
        };

        let mut anchor = Anchor::locate(&rest);
        loop {
            match anchor {
                Anchor::Sane(header) => return Ok(Some(header)),
                Anchor::Resync(resync) => {
                    let missing = resync.missing();
                    warn!(missing, "Header misaligned, resynchronizing on a later STX");
                    let Some(more) = self.read_or_timeout(missing).await? else {
                        return Ok(None);
                    };
                    anchor = resync.advance(&more);
                }
                Anchor::Lost => {
                    warn!(raw = %hex::encode_upper(rest), "Header invalid, nothing to resync on");
                    return Ok(None);
                }
            }
        }
    }

    async fn skip_event(&mut self, header: &Header) -> Result<()> {
        info!(len = header.payload_len(), "Event frame, dropping without ACK");

        if self.read_or_timeout(header.remaining_len()).await?.is_none() {
            warn!("Event frame cut short");
        }
        Ok(())
    }

    async fn read_body(&mut self, header: Header) -> Result<Received> {
        let Some(tail) = self.read_or_timeout(header.remaining_len()).await? else {
            self.send_control(NAK).await?;
            return Ok(Received::ParseFailed("body cut short".to_string()));
        };

        let mut raw = BytesMut::with_capacity(HEADER_SIZE + tail.len());
        raw.extend_from_slice(header.as_bytes());
        raw.extend_from_slice(&tail);

        trace!("RX {}", hex::encode_upper(&raw));

        let frame = match Frame::decode(&raw) {
            Ok(frame) => frame,
            Err(e) if e.is_trailer_error() => match Frame::decode_lenient(&raw) {
                Ok(frame) => {
                    warn!(error = %e, "Bad trailer, keeping frame");
                    frame
                }
                Err(e) => return self.reject(e).await,
            },
            Err(e) => return self.reject(e).await,
        };

        self.send_control(ACK).await?;
        info!(
            job = %frame.job,
            response_code = frame.response_code,
            len = frame.payload.len(),
            "Frame received"
        );
        Ok(Received::Frame(frame))
    }

    async fn reject(&mut self, error: tlpay_core::Error) -> Result<Received> {
        warn!(%error, "Frame rejected");
        self.send_control(NAK).await?;
        Ok(Received::ParseFailed(error.to_string()))
    }

    /// Read exactly `len` bytes; a timeout is `None`, other failures are errors
    async fn read_or_timeout(&mut self, len: usize) -> Result<Option<BytesMut>> {
        match self.transport.read_exact(len, self.config.response_wait).await {
            Ok(buf) => Ok(Some(buf)),
            Err(transport::Error::ReadTimeout { expected, received }) => {
                warn!(expected, received, "Short read");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
