//! Fixed-width ASCII field helpers
//!
//! Non-ASCII characters are replaced with `?`, the same way a US-ASCII
//! encoder would substitute them.

fn ascii_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// Right-align `s` in `width` bytes, padding on the left with `'0'`
///
/// Oversized input keeps its rightmost `width` characters.
///
/// # Examples
///
/// ```
/// use tlpay_core::pad;
///
/// assert_eq!(pad::zero_left("10", 6), b"000010");
/// assert_eq!(pad::zero_left("1234567", 4), b"4567");
/// ```
pub fn zero_left(s: &str, width: usize) -> Vec<u8> {
    let src = ascii_bytes(s);
    let keep = src.len().min(width);

    let mut out = vec![b'0'; width - keep];
    out.extend_from_slice(&src[src.len() - keep..]);
    out
}

/// Left-align `s` in `width` bytes, padding on the right with spaces
///
/// Oversized input keeps its leftmost `width` characters.
pub fn space_right(s: &str, width: usize) -> Vec<u8> {
    let mut out = ascii_bytes(s);
    out.truncate(width);
    out.resize(width, b' ');
    out
}

/// Left-align `s` in `width` bytes, padding on the right with NUL
pub fn nul_right(s: &str, width: usize) -> Vec<u8> {
    let mut out = ascii_bytes(s);
    out.truncate(width);
    out.resize(width, 0x00);
    out
}
