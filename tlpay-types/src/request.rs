//! Caller-facing request structures

use chrono::{NaiveDate, NaiveTime};
use tlpay_core::request::{Approval, Cancellation, MAX_EXTRA_LEN};
use tlpay_core::SignatureMode;

use crate::error::{Error, Result};

/// Approval request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveRequest {
    /// Amount in won, 1 to 10 digits
    pub amount: String,

    /// VAT, 1 to 8 digits
    pub tax: String,

    /// Service charge, 1 to 8 digits
    pub service: String,

    /// Installment months, 2 digits (`00` = lump sum)
    pub installments: String,

    /// Skip the signature prompt
    pub no_signature: bool,
}

impl ApproveRequest {
    /// Lump-sum, no-signature approval with zero tax and service charge
    pub fn new(amount: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            tax: "0".to_string(),
            service: "0".to_string(),
            installments: "00".to_string(),
            no_signature: true,
        }
    }

    /// Check field formats
    pub fn validate(&self) -> Result<()> {
        digits("amount", &self.amount, 1, 10)?;
        digits("tax", &self.tax, 1, 8)?;
        digits("service", &self.service, 1, 8)?;
        digits("installments", &self.installments, 2, 2)?;
        Ok(())
    }

    /// Borrow as builder fields
    pub fn as_approval(&self) -> Approval<'_> {
        Approval {
            amount: &self.amount,
            tax: &self.tax,
            service: &self.service,
            installments: &self.installments,
            signature: SignatureMode::from_no_signature(self.no_signature),
        }
    }
}

/// Cancellation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequest {
    /// Cancel type, `1`..=`6` (`2` cancels the previous transaction)
    pub cancel_type: String,

    /// Transaction type, one of `1234568`
    pub transaction_type: String,

    pub amount: String,
    pub tax: String,
    pub service: String,
    pub installments: String,
    pub no_signature: bool,

    /// Approval number of the original transaction, at most 12 chars
    pub approval_number: String,

    /// `YYYYMMDD`
    pub original_date: String,

    /// `hhmmss`
    pub original_time: String,

    /// Optional extra data
    pub extra: String,
}

impl CancelRequest {
    /// Check field formats
    pub fn validate(&self) -> Result<()> {
        one_of("cancel_type", &self.cancel_type, "123456")?;
        one_of("transaction_type", &self.transaction_type, "1234568")?;
        digits("amount", &self.amount, 1, 10)?;
        digits("tax", &self.tax, 1, 8)?;
        digits("service", &self.service, 1, 8)?;
        digits("installments", &self.installments, 2, 2)?;

        if self.approval_number.trim().is_empty() {
            return Err(Error::validation("approval_number", "must not be blank"));
        }
        if !self.approval_number.is_ascii() || self.approval_number.len() > 12 {
            return Err(Error::validation("approval_number", "at most 12 ASCII characters"));
        }

        digits("original_date", &self.original_date, 8, 8)?;
        NaiveDate::parse_from_str(&self.original_date, "%Y%m%d")
            .map_err(|e| Error::validation("original_date", e.to_string()))?;

        digits("original_time", &self.original_time, 6, 6)?;
        NaiveTime::parse_from_str(&self.original_time, "%H%M%S")
            .map_err(|e| Error::validation("original_time", e.to_string()))?;

        if !self.extra.is_ascii() || self.extra.len() > MAX_EXTRA_LEN {
            return Err(Error::validation(
                "extra",
                format!("at most {MAX_EXTRA_LEN} ASCII characters"),
            ));
        }
        Ok(())
    }

    /// Borrow as builder fields
    pub fn as_cancellation(&self) -> Cancellation<'_> {
        Cancellation {
            cancel_type: &self.cancel_type,
            transaction_type: &self.transaction_type,
            amount: &self.amount,
            tax: &self.tax,
            service: &self.service,
            installments: &self.installments,
            signature: SignatureMode::from_no_signature(self.no_signature),
            approval_number: &self.approval_number,
            original_date: &self.original_date,
            original_time: &self.original_time,
            extra: &self.extra,
        }
    }
}

fn digits(field: &'static str, value: &str, min: usize, max: usize) -> Result<()> {
    let ok = (min..=max).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit());
    if ok {
        Ok(())
    } else if min == max {
        Err(Error::validation(field, format!("expected {min} digits, got {value:?}")))
    } else {
        Err(Error::validation(field, format!("expected {min}-{max} digits, got {value:?}")))
    }
}

fn one_of(field: &'static str, value: &str, allowed: &str) -> Result<()> {
    let ok = value.len() == 1 && allowed.contains(value);
    if ok {
        Ok(())
    } else {
        Err(Error::validation(field, format!("expected one of [{allowed}], got {value:?}")))
    }
}
