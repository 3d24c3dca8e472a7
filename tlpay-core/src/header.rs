//! Fixed 35-byte frame header, sanity checks and resynchronization
//!
//! Once a start marker has been read off the wire, the next 34 bytes are
//! expected to complete the header. Line noise can make that read start
//! at the wrong place; [`Anchor::locate`] then tries to re-anchor on each
//! start marker inside the bytes just read, earliest first, until one
//! completes to a sane header.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    constants::{HEADER_SIZE, MAX_SANE_PAYLOAD, STX, TIMESTAMP_LEN, TRAILER_SIZE, offsets},
    job::JobCode,
};

/// Bytes that follow the start marker in a header
pub const HEADER_REST: usize = HEADER_SIZE - 1;

/// A complete header, start marker included
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Header([u8; HEADER_SIZE]);

impl Header {
    /// Build a header from the bytes read after a start marker
    pub fn after_start(rest: &[u8; HEADER_REST]) -> Self {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0] = STX;
        raw[1..].copy_from_slice(rest);
        Self(raw)
    }

    /// Build a header from raw bytes (must be exactly 35 bytes)
    pub fn from_slice(raw: &[u8]) -> Option<Self> {
        <[u8; HEADER_SIZE]>::try_from(raw).ok().map(Self)
    }

    /// Check header plausibility
    ///
    /// The timestamp must be 14 ASCII digits, the job code must be known
    /// and the declared payload length must not exceed 4096.
    pub fn is_sane(&self) -> bool {
        let ts = &self.0[offsets::TIMESTAMP..offsets::TIMESTAMP + TIMESTAMP_LEN];
        if !ts.iter().all(u8::is_ascii_digit) {
            return false;
        }
        if !JobCode::is_known(self.0[offsets::JOB]) {
            return false;
        }
        self.payload_len() <= MAX_SANE_PAYLOAD
    }

    /// Job code, if known
    pub fn job(&self) -> Option<JobCode> {
        JobCode::try_from(self.0[offsets::JOB]).ok()
    }

    /// Declared payload length
    pub fn payload_len(&self) -> usize {
        LittleEndian::read_u16(&self.0[offsets::PAYLOAD_LEN..offsets::PAYLOAD]) as usize
    }

    /// Bytes still to read after the header: payload, terminator, checksum
    pub fn remaining_len(&self) -> usize {
        self.payload_len() + TRAILER_SIZE
    }

    /// Raw header bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Header({})", hex::encode(self.0))
    }
}

/// Outcome of anchoring a header after a start marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// The bytes form a sane header
    Sane(Header),

    /// Waiting on more bytes to try the next embedded start marker
    Resync(Resync),

    /// No usable header
    Lost,
}

impl Anchor {
    /// Anchor a header on the 34 bytes read after a start marker
    ///
    /// # Examples
    ///
    /// ```
    /// use tlpay_core::{Anchor, header::HEADER_REST};
    ///
    /// let rest = [0xFFu8; HEADER_REST];
    /// assert_eq!(Anchor::locate(&rest), Anchor::Lost);
    /// ```
    pub fn locate(rest: &[u8; HEADER_REST]) -> Self {
        let first = Header::after_start(rest);
        if first.is_sane() {
            return Self::Sane(first);
        }

        Resync::find(rest, 0, HEADER_REST).map_or(Self::Lost, Self::Resync)
    }
}

/// Header candidate starting at an embedded start marker
///
/// Candidates are only taken from the bytes of the first header read, and
/// never from its final byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resync {
    window: Vec<u8>,
    scanned: usize,
}

impl Resync {
    fn find(bytes: &[u8], from: usize, scanned: usize) -> Option<Self> {
        let end = scanned.saturating_sub(1);
        let idx = bytes.get(from..end)?.iter().position(|&b| b == STX)? + from;

        Some(Self {
            window: bytes[idx..].to_vec(),
            scanned: scanned - idx,
        })
    }

    /// Candidate bytes held so far, start marker first
    pub fn prefix(&self) -> &[u8] {
        &self.window
    }

    /// Bytes to read before the candidate can be checked
    pub fn missing(&self) -> usize {
        HEADER_SIZE.saturating_sub(self.window.len())
    }

    /// Check the candidate with `more` bytes appended
    ///
    /// Moves on to the next start marker when the candidate is not sane.
    pub fn advance(mut self, more: &[u8]) -> Anchor {
        self.window.extend_from_slice(more);

        let header = self
            .window
            .get(..HEADER_SIZE)
            .and_then(Header::from_slice)
            .filter(Header::is_sane);
        if let Some(header) = header {
            return Anchor::Sane(header);
        }

        Self::find(&self.window, 1, self.scanned).map_or(Anchor::Lost, Anchor::Resync)
    }
}
