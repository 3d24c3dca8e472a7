//! Terminal protocol frame structure and encoding/decoding

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    checksum,
    constants::{ETX, HEADER_SIZE, ID_LEN, STX, TIMESTAMP_LEN, TRAILER_SIZE, offsets},
    error::{Error, Result},
    job::JobCode,
};

/// Terminal protocol frame
///
/// # Frame Structure
///
/// ```text
/// ┌─────┬──────────┬───────────┬─────┬──────┬─────────┬─────────┬─────┬─────┐
/// │ STX │ CAT/MID  │ Timestamp │ Job │ Resp │   Len   │ Payload │ ETX │ BCC │
/// │  1  │    16    │    14     │  1  │  1   │ 2 (LE)  │    N    │  1  │  1  │
/// └─────┴──────────┴───────────┴─────┴──────┴─────────┴─────────┴─────┴─────┘
/// ```
///
/// BCC is the XOR of every byte from STX through ETX inclusive. The trailer
/// is not kept on the decoded value.
///
/// # Examples
///
/// ```
/// use tlpay_core::{Frame, JobCode};
///
/// let frame = Frame::builder()
///     .terminal_id("CAT0001")
///     .timestamp("20251203185306")
///     .job(JobCode::DEVICE_CHECK)
///     .build()
///     .unwrap();
///
/// let encoded = frame.encode().unwrap();
/// let decoded = Frame::decode(&encoded).unwrap();
/// assert_eq!(frame.job, decoded.job);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Terminal identifier (CAT/MID)
    pub terminal_id: String,

    /// `YYYYMMDDhhmmss`
    pub timestamp: String,

    /// Job code
    pub job: JobCode,

    /// Header response code (0 = success on replies, always 0 on requests)
    pub response_code: u8,

    /// Job-specific data
    pub payload: Bytes,
}

impl Frame {
    /// Maximum payload size representable in the length field
    pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

    /// Start a new frame builder
    pub fn builder() -> FrameBuilder {
        FrameBuilder::default()
    }

    /// Encode frame to bytes
    ///
    /// # Errors
    ///
    /// Fails if the timestamp is not exactly 14 ASCII characters or the
    /// payload exceeds the 16-bit length field.
    pub fn encode(&self) -> Result<BytesMut> {
        encode(
            &self.terminal_id,
            &self.timestamp,
            self.job,
            self.response_code,
            &self.payload,
        )
    }

    /// Decode frame from bytes, verifying terminator and checksum
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than header + trailer
    /// - First byte is not STX
    /// - Job code is unknown
    /// - Buffer ends before the declared payload and trailer
    /// - Terminator is not ETX
    /// - Checksum verification fails
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let header = RawHeader::parse(buf)?;
        let payload_len = header.payload_len;

        let etx_pos = HEADER_SIZE + payload_len;
        let bcc_pos = etx_pos + 1;
        let expected_total = bcc_pos + 1;

        if buf.len() < expected_total {
            return Err(Error::IncompleteFrame {
                actual: buf.len(),
                expected: expected_total,
                payload_len,
            });
        }

        if buf[etx_pos] != ETX {
            return Err(Error::TerminatorMismatch {
                position: etx_pos,
                found: buf[etx_pos],
                payload_len,
            });
        }

        let calculated = checksum::calculate(&buf[offsets::START..=etx_pos]);
        let received = buf[bcc_pos];
        if calculated != received {
            return Err(Error::ChecksumMismatch { calculated, received });
        }

        Ok(header.into_frame(&buf[HEADER_SIZE..etx_pos]))
    }

    /// Decode frame without requiring a valid trailer
    ///
    /// The payload length is clamped to what the buffer holds (minus two
    /// trailer bytes). Terminator and checksum are ignored. Only meant as
    /// a fallback after [`Frame::decode`] fails on the trailer.
    pub fn decode_lenient(buf: &[u8]) -> Result<Self> {
        let header = RawHeader::parse(buf)?;

        let available = buf.len().saturating_sub(HEADER_SIZE + TRAILER_SIZE);
        let payload_len = header.payload_len.min(available);

        Ok(header.into_frame(&buf[HEADER_SIZE..HEADER_SIZE + payload_len]))
    }

    /// Check if the terminal reported success in the header
    pub fn is_success(&self) -> bool {
        self.response_code == 0
    }

    /// Get total encoded size
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + TRAILER_SIZE
    }
}

/// Encode a frame from its parts
///
/// The identifier is left-aligned in 16 bytes and NUL-padded; longer
/// identifiers are cut at 16 bytes.
pub fn encode(
    terminal_id: &str,
    timestamp: &str,
    job: JobCode,
    response_code: u8,
    payload: &[u8],
) -> Result<BytesMut> {
    if !is_timestamp_shape(timestamp) {
        return Err(Error::InvalidTimestamp(timestamp.to_string()));
    }
    if payload.len() > Frame::MAX_PAYLOAD_SIZE {
        return Err(Error::PayloadTooLarge {
            size: payload.len(),
            max: Frame::MAX_PAYLOAD_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);

    buf.put_u8(STX);
    buf.put_slice(&crate::pad::nul_right(terminal_id, ID_LEN));
    buf.put_slice(timestamp.as_bytes());
    buf.put_u8(job.code());
    buf.put_u8(response_code);
    buf.put_u16_le(payload.len() as u16);
    buf.put_slice(payload);
    buf.put_u8(ETX);

    let bcc = checksum::calculate(&buf);
    buf.put_u8(bcc);

    Ok(buf)
}

/// Render identifier bytes as text, or as uppercase hex if not printable
///
/// Trailing NUL padding is dropped first. If every remaining byte is
/// printable ASCII (space through tilde) the trimmed text is returned.
///
/// # Examples
///
/// ```
/// use tlpay_core::frame::render_identifier;
///
/// assert_eq!(render_identifier(b"CAT0001\0\0\0"), "CAT0001");
/// assert_eq!(render_identifier(&[0x01, 0xFF]), "01FF");
/// ```
pub fn render_identifier(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0x00).map_or(0, |i| i + 1);
    let body = &bytes[..end];

    if body.iter().all(|b| (0x20..=0x7E).contains(b)) {
        String::from_utf8_lossy(body).trim().to_string()
    } else {
        hex::encode_upper(bytes)
    }
}

/// Current local time as `YYYYMMDDhhmmss`
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

fn is_timestamp_shape(timestamp: &str) -> bool {
    timestamp.len() == TIMESTAMP_LEN && timestamp.is_ascii()
}

/// Header fields shared by strict and lenient decoding
struct RawHeader<'a> {
    id: &'a [u8],
    timestamp: &'a [u8],
    job: JobCode,
    response_code: u8,
    payload_len: usize,
}

impl<'a> RawHeader<'a> {
    fn parse(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE + TRAILER_SIZE {
            return Err(Error::FrameTooShort {
                expected: HEADER_SIZE + TRAILER_SIZE,
                actual: buf.len(),
            });
        }
        if buf[offsets::START] != STX {
            return Err(Error::StartMarkerMismatch(buf[offsets::START]));
        }

        Ok(Self {
            id: &buf[offsets::ID..offsets::TIMESTAMP],
            timestamp: &buf[offsets::TIMESTAMP..offsets::JOB],
            job: JobCode::try_from(buf[offsets::JOB])?,
            response_code: buf[offsets::RESPONSE_CODE],
            payload_len: LittleEndian::read_u16(&buf[offsets::PAYLOAD_LEN..offsets::PAYLOAD])
                as usize,
        })
    }

    fn into_frame(self, payload: &[u8]) -> Frame {
        Frame {
            terminal_id: render_identifier(self.id),
            timestamp: String::from_utf8_lossy(self.timestamp).into_owned(),
            job: self.job,
            response_code: self.response_code,
            payload: Bytes::copy_from_slice(payload),
        }
    }
}

/// Builder for outbound frames
///
/// Terminal id and job code are required. The timestamp defaults to the
/// current local time, the response code to 0 and the payload to empty.
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    terminal_id: Option<String>,
    timestamp: Option<String>,
    job: Option<JobCode>,
    response_code: u8,
    payload: Bytes,
}

impl FrameBuilder {
    /// Set terminal identifier
    pub fn terminal_id(mut self, id: impl Into<String>) -> Self {
        self.terminal_id = Some(id.into());
        self
    }

    /// Set timestamp (`YYYYMMDDhhmmss`)
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Set job code
    pub fn job(mut self, job: JobCode) -> Self {
        self.job = Some(job);
        self
    }

    /// Set header response code
    pub fn response_code(mut self, code: u8) -> Self {
        self.response_code = code;
        self
    }

    /// Set payload
    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Build the frame
    ///
    /// # Errors
    ///
    /// Fails if terminal id or job code is missing, the timestamp is not
    /// 14 ASCII digits, or the payload is too large.
    pub fn build(self) -> Result<Frame> {
        let terminal_id = self.terminal_id.ok_or(Error::MissingField("terminal_id"))?;
        let job = self.job.ok_or(Error::MissingField("job"))?;
        let timestamp = self.timestamp.unwrap_or_else(timestamp_now);

        if !is_timestamp_shape(&timestamp) || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidTimestamp(timestamp));
        }
        if self.payload.len() > Frame::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: self.payload.len(),
                max: Frame::MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Frame {
            terminal_id,
            timestamp,
            job,
            response_code: self.response_code,
            payload: self.payload,
        })
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("terminal_id", &self.terminal_id)
            .field("timestamp", &self.timestamp)
            .field("job", &self.job)
            .field("response_code", &format!("0x{:02X}", self.response_code))
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame[{}](id={}, ts={}, resp={}, len={})",
            self.job,
            self.terminal_id,
            self.timestamp,
            self.response_code,
            self.payload.len()
        )
    }
}
