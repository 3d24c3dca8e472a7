//! BCC checksum
//!
//! The block check character is the running XOR of every byte from the
//! start marker through the terminator, inclusive.

use tracing::trace;

/// Calculate BCC over `data`
///
/// # Examples
///
/// ```
/// use tlpay_core::checksum;
///
/// assert_eq!(checksum::calculate(&[0x02, 0x41, 0x03]), 0x40);
/// ```
pub fn calculate(data: &[u8]) -> u8 {
    let bcc = data.iter().fold(0u8, |acc, b| acc ^ b);

    trace!(len = data.len(), bcc = format!("0x{:02X}", bcc), "Calculated BCC");

    bcc
}
