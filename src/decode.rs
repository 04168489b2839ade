//! Decoding of raw register words into typed reading values.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Word order used when combining two 16-bit registers into a 32-bit value.
///
/// Must match the producing device exactly; a mismatch yields a nonsense
/// magnitude, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordOrder {
    /// High word first (the reference controller's layout).
    #[default]
    Big,
    /// Low word first.
    Little,
}

/// Interpret a single register as an unsigned integer, no scaling.
pub fn word_u16(words: &[u16]) -> Result<u16, DecodeError> {
    match words.first() {
        Some(&word) => Ok(word),
        None => Err(DecodeError::Short { needed: 1, got: 0 }),
    }
}

/// Combine two registers into an IEEE-754 32-bit float.
pub fn word_f32(words: &[u16], order: WordOrder) -> Result<f32, DecodeError> {
    if words.len() < 2 {
        return Err(DecodeError::Short {
            needed: 2,
            got: words.len(),
        });
    }

    let bits = match order {
        WordOrder::Big => ((words[0] as u32) << 16) | (words[1] as u32),
        WordOrder::Little => ((words[1] as u32) << 16) | (words[0] as u32),
    };

    Ok(f32::from_bits(bits))
}

/// Encode a 32-bit float into two registers. Inverse of [`word_f32`].
pub fn f32_words(value: f32, order: WordOrder) -> [u16; 2] {
    let bits = value.to_bits();
    let hi = (bits >> 16) as u16;
    let lo = bits as u16;

    match order {
        WordOrder::Big => [hi, lo],
        WordOrder::Little => [lo, hi],
    }
}

/// Unpack registers into a string, truncated at the first NUL byte.
///
/// Each register holds two packed bytes, high byte first. Without a NUL
/// terminator within the word count the full decoded length is returned.
pub fn word_string(words: &[u16]) -> Result<String, DecodeError> {
    let mut bytes = Vec::with_capacity(words.len() * 2);
    for word in words {
        bytes.push((word >> 8) as u8);
        bytes.push(*word as u8);
    }

    if let Some(nul) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(nul);
    }

    String::from_utf8(bytes).map_err(|e| DecodeError::InvalidString(e.to_string()))
}

/// Pack a string into registers, NUL-padded to `count` words.
///
/// Inverse of [`word_string`], used to fabricate test payloads.
pub fn string_words(value: &str, count: usize) -> Vec<u16> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.resize(count * 2, 0);

    bytes
        .chunks(2)
        .map(|pair| ((pair[0] as u16) << 8) | (pair[1] as u16))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_u16() {
        assert_eq!(word_u16(&[27]).unwrap(), 27);
        assert_eq!(word_u16(&[27, 99]).unwrap(), 27);
        assert!(matches!(
            word_u16(&[]),
            Err(DecodeError::Short { needed: 1, got: 0 })
        ));
    }

    #[test]
    fn test_f32_known_bit_pattern() {
        // 123.456 in IEEE 754 = 0x42F6E979
        let value = word_f32(&[0x42F6, 0xE979], WordOrder::Big).unwrap();
        assert!((value - 123.456).abs() < 0.001);

        let value = word_f32(&[0xE979, 0x42F6], WordOrder::Little).unwrap();
        assert!((value - 123.456).abs() < 0.001);
    }

    #[test]
    fn test_f32_round_trip_both_orders() {
        for &value in &[12.97f32, 77.59, -40.0, 0.0, 1013.25] {
            for order in [WordOrder::Big, WordOrder::Little] {
                let words = f32_words(value, order);
                let decoded = word_f32(&words, order).unwrap();
                assert!((decoded - value).abs() < f32::EPSILON);
            }
        }
    }

    #[test]
    fn test_f32_wrong_order_is_nonsense_not_error() {
        let words = f32_words(12.97, WordOrder::Big);
        let garbled = word_f32(&words, WordOrder::Little).unwrap();
        assert!((garbled - 12.97).abs() > 1.0);
    }

    #[test]
    fn test_f32_short_input() {
        assert!(matches!(
            word_f32(&[0x42F6], WordOrder::Big),
            Err(DecodeError::Short { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn test_string_truncates_at_nul() {
        let words = string_words("SELECT", 8);
        assert_eq!(words.len(), 8);
        assert_eq!(word_string(&words).unwrap(), "SELECT");
    }

    #[test]
    fn test_string_without_terminator_keeps_full_length() {
        // Exactly fills the words, no room for a NUL.
        let words = string_words("UPDOWN", 3);
        assert_eq!(word_string(&words).unwrap(), "UPDOWN");
    }

    #[test]
    fn test_string_all_zero_is_empty() {
        assert_eq!(word_string(&[0, 0, 0, 0]).unwrap(), "");
    }

    #[test]
    fn test_string_invalid_utf8() {
        assert!(matches!(
            word_string(&[0xFFFE]),
            Err(DecodeError::InvalidString(_))
        ));
    }
}
