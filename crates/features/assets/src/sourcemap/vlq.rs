//! Base64 variable-length quantities as used by the `mappings` field.
//!
//! Each value is split into 5-bit groups, least significant first. Bit 6 of
//! a digit marks continuation; the lowest bit of the first group is the sign.

use crate::error::BuildError;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const SHIFT: u32 = 5;
const CONTINUATION: u8 = 1 << SHIFT;
const MASK: u8 = CONTINUATION - 1;

/// Appends the encoding of `value` to `out`.
pub fn encode(value: i64, out: &mut String) {
    let mut rest = if value < 0 {
        (value.unsigned_abs() << 1) | 1
    } else {
        value.unsigned_abs() << 1
    };

    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut digit = (rest & u64::from(MASK)) as u8;
        rest >>= SHIFT;
        if rest > 0 {
            digit |= CONTINUATION;
        }
        out.push(char::from(ALPHABET[usize::from(digit)]));
        if rest == 0 {
            break;
        }
    }
}

/// Decodes every value of one comma-free segment.
///
/// # Errors
/// Returns [`BuildError::SourceMap`] on a character outside the alphabet,
/// a truncated value, or a value that does not fit in 63 bits.
pub fn decode(segment: &str) -> Result<Vec<i64>, BuildError> {
    let mut values = Vec::with_capacity(5);
    let mut accumulator: u64 = 0;
    let mut shift: u32 = 0;

    for byte in segment.bytes() {
        let digit = digit_of(byte).ok_or_else(|| {
            BuildError::source_map(format!("invalid base64 digit '{}'", char::from(byte)))
        })?;

        // Only 4 bits are left above bit 60.
        if shift > 60 || (shift == 60 && digit & MASK > 0b1111) {
            return Err(BuildError::source_map(format!("VLQ value overflows in '{segment}'")));
        }
        accumulator |= u64::from(digit & MASK) << shift;

        if digit & CONTINUATION == 0 {
            let magnitude = i64::try_from(accumulator >> 1).map_err(|_| {
                BuildError::source_map(format!("VLQ value overflows in '{segment}'"))
            })?;
            values.push(if accumulator & 1 == 1 { -magnitude } else { magnitude });
            accumulator = 0;
            shift = 0;
        } else {
            shift += SHIFT;
        }
    }

    if shift != 0 {
        return Err(BuildError::source_map(format!("truncated VLQ value in '{segment}'")));
    }
    Ok(values)
}

const fn digit_of(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(value: i64) -> String {
        let mut out = String::new();
        encode(value, &mut out);
        out
    }

    #[test]
    fn known_values() {
        assert_eq!(encoded(0), "A");
        assert_eq!(encoded(1), "C");
        assert_eq!(encoded(-1), "D");
        assert_eq!(encoded(15), "e");
        assert_eq!(encoded(16), "gB");
        assert_eq!(encoded(-16), "hB");
        assert_eq!(decode("AAgBC").unwrap(), vec![0, 0, 16, 1]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode("A*").is_err());
        assert!(decode("g").is_err());
        assert!(decode("gggggggggggggggggB").is_err());
    }

    #[test]
    fn thirteenth_digit_may_only_carry_four_bits() {
        assert_eq!(decode("ggggggggggggP").unwrap(), vec![15_i64 << 59]);
        assert!(decode("ggggggggggggQ").is_err());
    }

    proptest! {
        #[test]
        fn lossless(values in proptest::collection::vec(-(1_i64 << 40)..(1_i64 << 40), 1..6)) {
            let mut out = String::new();
            for value in &values {
                encode(*value, &mut out);
            }
            prop_assert_eq!(decode(&out).unwrap(), values);
        }

        #[test]
        fn lossless_at_the_edges(value in (i64::MIN + 1)..=i64::MAX) {
            prop_assert_eq!(decode(&encoded(value)).unwrap(), vec![value]);
        }
    }
}
