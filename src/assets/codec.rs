//! Printable radix-85 text encoding for compressed payloads.
//!
//! Every 4-byte big-endian group becomes 5 characters of the Z85 alphabet. A
//! trailing group of `n` bytes (1..=3) is zero-padded and emitted as `n + 1`
//! characters, so arbitrary lengths round-trip without a length prefix. The
//! alphabet has no quotes, backslashes or whitespace and embeds verbatim in
//! JSON strings.

use crate::error::AssetError;

/// Encoding alphabet, one character per base-85 digit.
pub const ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

const INVALID: u8 = 0xFF;

const DECODE: [u8; 256] = build_decode_table();

const fn build_decode_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// Length of the encoded form of `len` input bytes.
pub fn encoded_len(len: usize) -> usize {
    let tail = len % 4;
    len / 4 * 5 + if tail == 0 { 0 } else { tail + 1 }
}

/// Encode bytes as radix-85 text.
pub fn encode(data: &[u8]) -> String {
    let mut out = Vec::with_capacity(encoded_len(data.len()));

    for chunk in data.chunks(4) {
        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(group);

        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = ALPHABET[(value % 85) as usize];
            value /= 85;
        }

        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }

    // Alphabet is pure ASCII.
    String::from_utf8(out).unwrap_or_default()
}

/// Decode radix-85 text back into the original bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, AssetError> {
    let input = text.as_bytes();
    let mut out = Vec::with_capacity(input.len() / 5 * 4 + 3);

    for (index, chunk) in input.chunks(5).enumerate() {
        let offset = index * 5;
        if chunk.len() == 1 {
            return Err(AssetError::InvalidEncoding {
                offset,
                reason: "dangling character",
            });
        }

        // Short groups are padded with the highest digit.
        let mut value: u64 = 0;
        for i in 0..5 {
            let digit = match chunk.get(i) {
                Some(&c) => {
                    let d = DECODE[c as usize];
                    if d == INVALID {
                        return Err(AssetError::InvalidEncoding {
                            offset: offset + i,
                            reason: "character outside alphabet",
                        });
                    }
                    d
                }
                None => 84,
            };
            value = value * 85 + u64::from(digit);
        }

        if value > u64::from(u32::MAX) {
            return Err(AssetError::InvalidEncoding {
                offset,
                reason: "group overflows 32 bits",
            });
        }

        let bytes = (value as u32).to_be_bytes();
        out.extend_from_slice(&bytes[..chunk.len() - 1]);
    }

    Ok(out)
}
