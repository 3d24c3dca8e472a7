//! Outbound request builders
//!
//! Every numeric field is right-aligned and zero-padded to its fixed
//! width. Oversized values keep their rightmost digits instead of being
//! rejected, matching the fixed-width wire contract.

use std::fmt;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::{
    error::Result,
    frame::{Frame, timestamp_now},
    job::JobCode,
    pad::{space_right, zero_left},
};

/// Transaction type digit used for approvals
pub const APPROVAL_TRANSACTION_TYPE: u8 = b'1';

/// Longest extra-data block a cancel request can carry (2-digit length)
pub const MAX_EXTRA_LEN: usize = 99;

/// Signature requirement sent with approvals and cancellations
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignatureMode {
    /// No signature pad prompt
    NoSignature,

    /// Cardholder signs on the terminal
    Signature,
}

impl SignatureMode {
    /// Map a caller's "no signature" flag
    pub fn from_no_signature(no_signature: bool) -> Self {
        if no_signature {
            Self::NoSignature
        } else {
            Self::Signature
        }
    }

    /// Wire digit
    pub fn digit(self) -> u8 {
        match self {
            Self::NoSignature => b'1',
            Self::Signature => b'2',
        }
    }
}

/// Fields of an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Approval<'a> {
    pub amount: &'a str,
    pub tax: &'a str,
    pub service: &'a str,
    pub installments: &'a str,
    pub signature: SignatureMode,
}

/// Fields of a cancellation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancellation<'a> {
    pub cancel_type: &'a str,
    pub transaction_type: &'a str,
    pub amount: &'a str,
    pub tax: &'a str,
    pub service: &'a str,
    pub installments: &'a str,
    pub signature: SignatureMode,
    pub approval_number: &'a str,
    pub original_date: &'a str,
    pub original_time: &'a str,
    pub extra: &'a str,
}

/// Device check payload (empty)
pub fn device_check_payload() -> Bytes {
    Bytes::new()
}

/// Approval payload (30 bytes)
///
/// ```text
/// type(1) amount(10) tax(8) service(8) installments(2) signature(1)
/// ```
///
/// # Examples
///
/// ```
/// use tlpay_core::request::{approve_payload, Approval};
/// use tlpay_core::SignatureMode;
///
/// let payload = approve_payload(&Approval {
///     amount: "10",
///     tax: "0",
///     service: "0",
///     installments: "00",
///     signature: SignatureMode::NoSignature,
/// });
/// assert_eq!(&payload[..], b"100000000100000000000000000001");
/// ```
pub fn approve_payload(fields: &Approval<'_>) -> Bytes {
    let mut buf = BytesMut::with_capacity(30);

    buf.put_u8(APPROVAL_TRANSACTION_TYPE);
    put_amounts(&mut buf, fields.amount, fields.tax, fields.service, fields.installments);
    buf.put_u8(fields.signature.digit());

    buf.freeze()
}

/// Cancellation payload (59 bytes plus extra data)
///
/// ```text
/// cancel_type(1) type(1) amount(10) tax(8) service(8) installments(2)
/// signature(1) approval_no(12) date(8) time(6) extra_len(2) extra(N)
/// ```
///
/// Extra data longer than 99 bytes is cut so that its length fits the
/// 2-digit length field.
pub fn cancel_payload(fields: &Cancellation<'_>) -> Bytes {
    let extra = cap_extra(fields.extra);
    let mut buf = BytesMut::with_capacity(59 + extra.len());

    buf.put_slice(&zero_left(fields.cancel_type, 1));
    buf.put_slice(&zero_left(fields.transaction_type, 1));
    put_amounts(&mut buf, fields.amount, fields.tax, fields.service, fields.installments);
    buf.put_u8(fields.signature.digit());
    buf.put_slice(&space_right(fields.approval_number, 12));
    buf.put_slice(&zero_left(fields.original_date, 8));
    buf.put_slice(&zero_left(fields.original_time, 6));
    buf.put_slice(&zero_left(&extra.len().to_string(), 2));
    buf.put_slice(&extra);

    buf.freeze()
}

fn put_amounts(buf: &mut BytesMut, amount: &str, tax: &str, service: &str, installments: &str) {
    buf.put_slice(&zero_left(amount, 10));
    buf.put_slice(&zero_left(tax, 8));
    buf.put_slice(&zero_left(service, 8));
    buf.put_slice(&zero_left(installments, 2));
}

// Extra data is free text, capped at 99 bytes.
fn cap_extra(extra: &str) -> Vec<u8> {
    let len = extra.chars().count().min(MAX_EXTRA_LEN);
    space_right(extra, len)
}

type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// Request frame factory bound to one terminal identifier
///
/// # Examples
///
/// ```
/// use tlpay_core::{JobCode, Requests};
///
/// let requests = Requests::new("CAT0001");
/// let frame = requests.device_check().unwrap();
/// assert_eq!(frame.job, JobCode::DEVICE_CHECK);
/// ```
#[derive(Clone)]
pub struct Requests {
    terminal_id: String,
    clock: Clock,
}

impl Requests {
    /// Create a factory stamping frames with the current local time
    pub fn new(terminal_id: impl Into<String>) -> Self {
        Self {
            terminal_id: terminal_id.into(),
            clock: Arc::new(timestamp_now),
        }
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Terminal identifier
    pub fn terminal_id(&self) -> &str {
        &self.terminal_id
    }

    /// Device check request (`A`)
    pub fn device_check(&self) -> Result<Frame> {
        self.frame(JobCode::DEVICE_CHECK, device_check_payload())
    }

    /// Approval request (`B`)
    pub fn approve(&self, fields: &Approval<'_>) -> Result<Frame> {
        self.frame(JobCode::APPROVE, approve_payload(fields))
    }

    /// Cancellation request (`C`)
    pub fn cancel(&self, fields: &Cancellation<'_>) -> Result<Frame> {
        self.frame(JobCode::CANCEL, cancel_payload(fields))
    }

    fn frame(&self, job: JobCode, payload: Bytes) -> Result<Frame> {
        debug!(job = %job, payload_len = payload.len(), "Building request");

        Frame::builder()
            .terminal_id(self.terminal_id.clone())
            .timestamp((self.clock)())
            .job(job)
            .payload(payload)
            .build()
    }
}

impl fmt::Debug for Requests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requests")
            .field("terminal_id", &self.terminal_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum;
    use pretty_assertions::assert_eq;

    fn approval(amount: &str) -> Approval<'_> {
        Approval {
            amount,
            tax: "0",
            service: "0",
            installments: "00",
            signature: SignatureMode::NoSignature,
        }
    }

    fn cancellation(extra: &str) -> Cancellation<'_> {
        Cancellation {
            cancel_type: "1",
            transaction_type: "1",
            amount: "1004",
            tax: "91",
            service: "0",
            installments: "00",
            signature: SignatureMode::Signature,
            approval_number: "03304901",
            original_date: "20251203",
            original_time: "185306",
            extra,
        }
    }

    fn requests() -> Requests {
        Requests::new("CAT0001").with_clock(|| "20251203185306".to_string())
    }

    #[test]
    fn test_device_check_payload_empty() {
        let frame = requests().device_check().unwrap();
        assert_eq!(frame.job, JobCode::DEVICE_CHECK);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_approve_payload_layout() {
        let payload = approve_payload(&approval("10"));

        assert_eq!(payload.len(), 30);
        assert_eq!(&payload[0..1], b"1");
        assert_eq!(&payload[1..11], b"0000000010");
        assert_eq!(&payload[11..19], b"00000000");
        assert_eq!(&payload[19..27], b"00000000");
        assert_eq!(&payload[27..29], b"00");
        assert_eq!(&payload[29..30], b"1");
    }

    #[test]
    fn test_approve_signature_digit() {
        let mut fields = approval("10");
        fields.signature = SignatureMode::Signature;

        assert_eq!(approve_payload(&fields)[29], b'2');
        assert_eq!(SignatureMode::from_no_signature(true), SignatureMode::NoSignature);
        assert_eq!(SignatureMode::from_no_signature(false), SignatureMode::Signature);
    }

    #[test]
    fn test_approve_truncates_oversized_amount() {
        let payload = approve_payload(&approval("123456789012"));
        assert_eq!(&payload[1..11], b"3456789012");
    }

    #[test]
    fn test_approve_frame_end_to_end() {
        let frame = requests().approve(&approval("10")).unwrap();
        let encoded = frame.encode().unwrap();

        assert_eq!(frame.job, JobCode::APPROVE);
        assert_eq!(encoded.len(), 35 + 30 + 2);
        assert_eq!(encoded[65], crate::constants::ETX);
        assert_eq!(encoded[66], checksum::calculate(&encoded[..=65]));
    }

    #[test]
    fn test_cancel_payload_layout() {
        let payload = cancel_payload(&cancellation(""));

        assert_eq!(payload.len(), 59);
        assert_eq!(&payload[0..2], b"11");
        assert_eq!(&payload[2..12], b"0000001004");
        assert_eq!(&payload[12..20], b"00000091");
        assert_eq!(&payload[20..28], b"00000000");
        assert_eq!(&payload[28..30], b"00");
        assert_eq!(payload[30], b'2');
        assert_eq!(&payload[31..43], b"03304901    ");
        assert_eq!(&payload[43..51], b"20251203");
        assert_eq!(&payload[51..57], b"185306");
        assert_eq!(&payload[57..59], b"00");
    }

    #[test]
    fn test_cancel_payload_with_extra() {
        let payload = cancel_payload(&cancellation("ORDER-42"));

        assert_eq!(payload.len(), 59 + 8);
        assert_eq!(&payload[57..59], b"08");
        assert_eq!(&payload[59..], b"ORDER-42");
    }

    #[test]
    fn test_cancel_extra_capped() {
        let extra = "x".repeat(150);
        let payload = cancel_payload(&cancellation(&extra));

        assert_eq!(&payload[57..59], b"99");
        assert_eq!(payload.len(), 59 + MAX_EXTRA_LEN);
    }

    #[test]
    fn test_requests_stamp_clock() {
        let frame = requests().cancel(&cancellation("")).unwrap();

        assert_eq!(frame.timestamp, "20251203185306");
        assert_eq!(frame.terminal_id, "CAT0001");
        assert_eq!(frame.response_code, 0);
        assert_eq!(frame.job, JobCode::CANCEL);
    }

    #[test]
    fn test_requests_reject_bad_clock() {
        let requests = Requests::new("CAT0001").with_clock(|| "now".to_string());
        assert!(requests.device_check().is_err());
    }
}
