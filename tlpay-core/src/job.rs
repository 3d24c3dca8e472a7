//! Job code definitions
//!
//! Requests use an uppercase letter, replies the same letter in lowercase.
//! `@` marks an asynchronous event frame. `h` and `r` do not exist: the
//! terminal never replies to `H` and `R`.

use std::fmt;

use crate::error::{Error, Result};

/// Protocol job code
///
/// A closed set: values can only be obtained through the associated
/// constants or [`JobCode::try_from`], which rejects bytes outside the set.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct JobCode(u8);

impl JobCode {
    /// Device check request
    pub const DEVICE_CHECK: Self = Self(b'A');

    /// Device check reply
    pub const DEVICE_CHECK_REPLY: Self = Self(b'a');

    /// Approval request
    pub const APPROVE: Self = Self(b'B');

    /// Approval reply
    pub const APPROVE_REPLY: Self = Self(b'b');

    /// Cancellation request
    pub const CANCEL: Self = Self(b'C');

    /// Cancellation reply
    pub const CANCEL_REPLY: Self = Self(b'c');

    /// No-reply request
    pub const NO_REPLY: Self = Self(b'H');

    /// Terminal reset (no reply frame)
    pub const RESET: Self = Self(b'R');

    /// Asynchronous event
    pub const EVENT: Self = Self(b'@');

    /// Check whether `code` belongs to the job code set
    pub const fn is_known(code: u8) -> bool {
        match code {
            b'@' | b'A'..=b'Z' => true,
            b'h' | b'r' => false,
            b'a'..=b'z' => true,
            _ => false,
        }
    }

    /// Raw wire byte
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Wire byte as a character
    pub const fn as_char(self) -> char {
        self.0 as char
    }

    /// Check if this is an event frame code
    pub fn is_event(self) -> bool {
        self == Self::EVENT
    }

    /// Check if this is a request code (host to terminal)
    pub fn is_request(self) -> bool {
        self.0.is_ascii_uppercase()
    }

    /// Check if this is a reply code (terminal to host)
    pub fn is_response(self) -> bool {
        self.0.is_ascii_lowercase()
    }

    /// Check if the terminal answers this request with a reply frame
    pub fn expects_reply(self) -> bool {
        self.is_request() && Self::is_known(self.0.to_ascii_lowercase())
    }

    /// Reply code the terminal is expected to send for this request
    ///
    /// `B` maps to `b`. Codes without a lowercase counterpart (and
    /// non-request codes) map to themselves.
    ///
    /// # Examples
    ///
    /// ```
    /// use tlpay_core::JobCode;
    ///
    /// assert_eq!(JobCode::APPROVE.expected_response(), JobCode::APPROVE_REPLY);
    /// assert_eq!(JobCode::RESET.expected_response(), JobCode::RESET);
    /// ```
    pub fn expected_response(self) -> Self {
        if self.is_request() {
            let lower = self.0.to_ascii_lowercase();
            if Self::is_known(lower) {
                return Self(lower);
            }
        }
        self
    }

    /// Check if `actual` satisfies a pending request expecting `self`
    ///
    /// Letters match regardless of case. An event never matches.
    pub fn matches(self, actual: Self) -> bool {
        if self.is_event() || actual.is_event() {
            return false;
        }
        self.0.eq_ignore_ascii_case(&actual.0)
    }

    /// Get job name
    pub fn name(self) -> &'static str {
        match self.0 {
            b'A' => "DEVICE_CHECK",
            b'a' => "DEVICE_CHECK_REPLY",
            b'B' => "APPROVE",
            b'b' => "APPROVE_REPLY",
            b'C' => "CANCEL",
            b'c' => "CANCEL_REPLY",
            b'H' => "NO_REPLY",
            b'R' => "RESET",
            b'@' => "EVENT",
            _ => "JOB",
        }
    }
}

impl From<JobCode> for u8 {
    fn from(job: JobCode) -> u8 {
        job.0
    }
}

impl TryFrom<u8> for JobCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        if Self::is_known(value) {
            Ok(Self(value))
        } else {
            Err(Error::UnknownJobCode(value))
        }
    }
}

impl TryFrom<char> for JobCode {
    type Error = Error;

    fn try_from(value: char) -> Result<Self> {
        u8::try_from(value)
            .map_err(|_| Error::UnknownJobCode(0xFF))
            .and_then(Self::try_from)
    }
}

impl fmt::Debug for JobCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobCode('{}')", self.as_char())
    }
}

impl fmt::Display for JobCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_char())
    }
}
