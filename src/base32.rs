//! RFC4648 base32 conversion for shared secrets.
//!
//! Decoding accepts lowercase input, drops trailing `=` padding and discards the
//! bits of an incomplete final byte instead of rejecting them.

use std::sync::LazyLock;

use data_encoding::{Encoding, BASE32_NOPAD};

use crate::OtpError;

pub const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

static LENIENT: LazyLock<Encoding> = LazyLock::new(|| {
    let mut relaxed = BASE32_NOPAD.specification();
    relaxed.check_trailing_bits = false;
    relaxed
        .encoding()
        .expect("BASE32_NOPAD with relaxed trailing bits is a valid specification")
});

/// Decodes a base32 string into raw bytes.
///
/// Fails with [`OtpError::InvalidCharacter`] on the first symbol outside the
/// alphabet, counting positions after the trailing padding was stripped.
pub fn decode(text: &str) -> Result<Vec<u8>, OtpError> {
    let normalized = text.to_ascii_uppercase();
    let normalized = normalized.trim_end_matches('=');

    if let Some((position, character)) = normalized
        .char_indices()
        .find(|(_, c)| !ALPHABET.contains(*c))
    {
        return Err(OtpError::InvalidCharacter {
            character,
            position,
        });
    }

    // Only ASCII is left, so byte lengths equal symbol counts here.
    let usable = decodable_len(normalized.len());

    LENIENT
        .decode(normalized[..usable].as_bytes())
        .map_err(|e| OtpError::InvalidCharacter {
            character: normalized[e.position..].chars().next().unwrap_or('?'),
            position: e.position,
        })
}

/// Encodes raw bytes as canonical uppercase base32 without padding.
pub fn encode(bytes: &[u8]) -> String {
    BASE32_NOPAD.encode(bytes)
}

/// Unpadded base32 only accepts a tail of 0, 2, 4, 5 or 7 symbols per 8-symbol
/// block. A tail of 1, 3 or 6 symbols carries no bits beyond the next shorter
/// valid tail, so the extra symbol is dropped.
fn decodable_len(len: usize) -> usize {
    match len % 8 {
        1 | 3 | 6 => len - 1,
        _ => len,
    }
}
