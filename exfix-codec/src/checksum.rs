/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX trailer checksum.
//!
//! The checksum (tag 10) is the sum of every byte in the message up to and
//! including the SOH that precedes the checksum field, modulo 256, written
//! as a 3-digit zero-padded decimal string.

/// Calculates the checksum for the given bytes.
///
/// # Arguments
/// * `data` - The message bytes up to the checksum field (excluding `10=XXX|`)
#[inline]
#[must_use]
pub fn checksum_of(data: &[u8]) -> u8 {
    let sum: u32 = data.iter().map(|&b| u32::from(b)).sum();
    (sum % 256) as u8
}

/// Formats a checksum as its fixed-width 3-digit wire representation.
#[inline]
#[must_use]
pub fn format_checksum(checksum: u8) -> [u8; 3] {
    [
        b'0' + checksum / 100,
        b'0' + (checksum / 10) % 10,
        b'0' + checksum % 10,
    ]
}

/// Parses a 3-digit checksum value, or `None` if not exactly three digits.
#[inline]
#[must_use]
pub fn parse_checksum(bytes: &[u8]) -> Option<u8> {
    if bytes.len() != 3 {
        return None;
    }

    let mut value: u16 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u16::from(b - b'0');
    }

    u8::try_from(value).ok()
}
