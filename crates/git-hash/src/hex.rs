//! Lowercase hex encoding for commit ids.

use crate::HashError;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Value of a single ASCII hex digit, or `None` for anything else.
fn nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Hex-encode `bytes` to a new lowercase `String`.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Decode `hex` into `buf`. The input must be exactly `buf.len() * 2` digits.
pub fn decode_into(hex: &str, buf: &mut [u8]) -> Result<(), HashError> {
    let digits = hex.as_bytes();
    if digits.len() != buf.len() * 2 {
        return Err(HashError::InvalidHexLength {
            actual: digits.len(),
        });
    }
    for (i, pair) in digits.chunks_exact(2).enumerate() {
        let hi = nibble(pair[0]).ok_or(HashError::InvalidHex {
            position: i * 2,
            character: pair[0] as char,
        })?;
        let lo = nibble(pair[1]).ok_or(HashError::InvalidHex {
            position: i * 2 + 1,
            character: pair[1] as char,
        })?;
        buf[i] = (hi << 4) | lo;
    }
    Ok(())
}
