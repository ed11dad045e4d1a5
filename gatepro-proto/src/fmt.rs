//! No-std number formatting and parsing helpers for protocol tokens.
//!
//! The GatePro wire format carries status bytes as two-digit uppercase hex
//! tokens and parameter values as unsigned decimal. These helpers read those
//! tokens, and write decimal ones, directly on byte slices without heap allocation.

/// Write a u8 as an unsigned decimal string.
///
/// Returns the number of bytes written (1-3 bytes).
///
/// # Panics
///
/// Panics if `buf.len() < 3` (max size: "255").
#[inline]
pub fn write_u8(buf: &mut [u8], value: u8) -> usize {
    debug_assert!(buf.len() >= 3, "buffer too small for u8");

    if value == 0 {
        buf[0] = b'0';
        return 1;
    }

    // Digits come out least significant first
    let mut temp = [0u8; 3];
    let mut n = value;
    let mut len = 0;
    while n > 0 {
        temp[len] = b'0' + (n % 10);
        n /= 10;
        len += 1;
    }

    for i in (0..len).rev() {
        buf[len - 1 - i] = temp[i];
    }

    len
}

/// Convert a hex character to its value.
#[inline]
pub fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// Parse a 2-character hex token as u8.
#[inline]
pub fn parse_hex_u8(s: &[u8]) -> Option<u8> {
    if s.len() != 2 {
        return None;
    }
    let high = hex_digit(s[0])?;
    let low = hex_digit(s[1])?;
    Some((high << 4) | low)
}

/// Parse an unsigned decimal token as u8 (1-3 digits).
#[inline]
pub fn parse_u8(s: &[u8]) -> Option<u8> {
    if s.is_empty() || s.len() > 3 {
        return None;
    }

    let mut value: u16 = 0;
    for &b in s {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (b - b'0') as u16;
    }

    u8::try_from(value).ok()
}

/// Parse an unsigned decimal token as u16 (1-5 digits).
#[inline]
pub fn parse_u16(s: &[u8]) -> Option<u16> {
    if s.is_empty() || s.len() > 5 {
        return None;
    }

    let mut value: u32 = 0;
    for &b in s {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (b - b'0') as u32;
    }

    u16::try_from(value).ok()
}

/// Trim ASCII spaces from both ends of a token.
#[inline]
pub fn trim_spaces(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&b| b != b' ').unwrap_or(s.len());
    let end = s.iter().rposition(|&b| b != b' ').map_or(start, |p| p + 1);
    &s[start..end]
}
