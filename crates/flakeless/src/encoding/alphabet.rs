use crate::{Error, OutputFormat, Result};
use core::cmp::Ordering;

/// Symbols for [`OutputFormat::Hex`], indexed by nibble value.
pub const HEX_ALPHABET: &[u8; 16] = b"0123456789ABCDEF";

/// Symbols for [`OutputFormat::Base64Custom`], indexed by 6-bit value.
///
/// Digits, then lower case, then upper case, then `-` and `_`. This is not
/// ASCII order (`'A' < 'z'` and `'-' < '0'` as bytes), so plain `str`
/// comparison does not follow numeric order. Compare encoded IDs by symbol
/// rank with [`compare_encoded`] instead.
pub const BASE64_ALPHABET: &[u8; 64] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_";

const NO_VALUE: u8 = 255;

const HEX_LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    while i < 16 {
        let c = HEX_ALPHABET[i as usize];
        lut[c as usize] = i;
        // accept lower-case on the way in
        if c.is_ascii_uppercase() {
            lut[(c + 32) as usize] = i;
        }
        i += 1;
    }
    lut
};

const BASE64_LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    while i < 64 {
        lut[BASE64_ALPHABET[i as usize] as usize] = i;
        i += 1;
    }
    lut
};

const fn mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Encodes the low `bits` bits of `value`.
///
/// The value is left-padded with zero bits up to the next multiple of the
/// format's group size, then each group is mapped through the alphabet,
/// most significant group first. `bits` is clamped to 64.
///
/// ```
/// use flakeless::{OutputFormat, encode_bits};
///
/// assert_eq!(encode_bits(0xABC, 12, OutputFormat::Hex), "ABC");
/// assert_eq!(encode_bits(63, 8, OutputFormat::Base64Custom), "0_");
/// ```
pub fn encode_bits(value: u64, bits: u32, format: OutputFormat) -> String {
    let bits = bits.min(u64::BITS);
    let value = value & mask(bits);
    let (alphabet, bpc): (&[u8], u32) = match format {
        OutputFormat::Decimal => return value.to_string(),
        OutputFormat::Hex => (HEX_ALPHABET, 4),
        OutputFormat::Base64Custom => (BASE64_ALPHABET, 6),
    };
    let group = mask(bpc);
    let chars = bits.div_ceil(bpc) as usize;

    let mut out = vec![0_u8; chars];
    let mut rest = value;
    for slot in out.iter_mut().rev() {
        *slot = alphabet[(rest & group) as usize];
        rest >>= bpc;
    }
    out.into_iter().map(char::from).collect()
}

/// Decodes `text` into a value of at most `bits` bits.
///
/// Hex input is accepted in either case. Decimal input must be a non-empty
/// run of ASCII digits.
///
/// # Errors
///
/// - [`Error::DecodeInvalidLen`] if a fixed-width format has the wrong
///   number of characters, or decimal input is empty.
/// - [`Error::DecodeInvalidChar`] if a symbol is outside the alphabet.
/// - [`Error::DecodeOverflow`] if the value needs more than `bits` bits.
pub fn decode_bits(text: &str, bits: u32, format: OutputFormat) -> Result<u64> {
    let bits = bits.min(u64::BITS);
    let limit = u128::from(mask(bits));

    let (lookup, radix): (&[u8; 256], u128) = match format {
        OutputFormat::Decimal if text.is_empty() => {
            return Err(Error::DecodeInvalidLen {
                len: 0,
                expected: 1,
            });
        }
        OutputFormat::Decimal => (&[NO_VALUE; 256], 10),
        OutputFormat::Hex => (&HEX_LOOKUP, 16),
        OutputFormat::Base64Custom => (&BASE64_LOOKUP, 64),
    };

    if let Some(expected) = format.width_for(bits) {
        if text.len() != expected {
            return Err(Error::DecodeInvalidLen {
                len: text.len(),
                expected,
            });
        }
    }

    let mut acc = 0_u128;
    for (index, ch) in text.chars().enumerate() {
        let digit = match format {
            OutputFormat::Decimal if ch.is_ascii_digit() => ch.to_digit(10),
            OutputFormat::Decimal => None,
            _ if ch.is_ascii() => Some(lookup[ch as usize]).filter(|&v| v != NO_VALUE).map(u32::from),
            _ => None,
        };
        let Some(digit) = digit else {
            return Err(Error::DecodeInvalidChar { ch, index });
        };
        acc = acc * radix + u128::from(digit);
        if acc > limit {
            return Err(Error::DecodeOverflow { bits });
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    Ok(acc as u64)
}

/// Orders two encoded values the way their integers are ordered.
///
/// Hex and base-64 strings are compared symbol by symbol using each symbol's
/// position in the alphabet, so `"0000000000z" < "0000000000A"` for
/// [`OutputFormat::Base64Custom`]. Hex is compared case-insensitively.
/// Decimal strings compare by length first, then digit by digit. Both inputs
/// are expected to be canonical output of [`encode_bits`] at the same width;
/// symbols outside the alphabet rank after every valid one.
///
/// ```
/// use core::cmp::Ordering;
/// use flakeless::{OutputFormat, compare_encoded, encode};
///
/// let a = encode(35, OutputFormat::Base64Custom);
/// let b = encode(36, OutputFormat::Base64Custom);
/// assert_eq!(compare_encoded(&a, &b, OutputFormat::Base64Custom), Ordering::Less);
/// ```
pub fn compare_encoded(a: &str, b: &str, format: OutputFormat) -> Ordering {
    let lookup: &[u8; 256] = match format {
        OutputFormat::Decimal => {
            return a.len().cmp(&b.len()).then_with(|| a.cmp(b));
        }
        OutputFormat::Hex => &HEX_LOOKUP,
        OutputFormat::Base64Custom => &BASE64_LOOKUP,
    };
    let rank = |byte: &u8| lookup[usize::from(*byte)];
    a.len()
        .cmp(&b.len())
        .then_with(|| a.as_bytes().iter().map(rank).cmp(b.as_bytes().iter().map(rank)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlakeId, decode, encode};

    const MAX_ID: u64 = (1 << 63) - 1;

    #[test]
    fn known_vectors() {
        assert_eq!(encode(0, OutputFormat::Hex), "0000000000000000");
        assert_eq!(encode(0, OutputFormat::Base64Custom), "00000000000");
        assert_eq!(encode(0, OutputFormat::Decimal), "0");

        assert_eq!(encode(MAX_ID, OutputFormat::Hex), "7FFFFFFFFFFFFFFF");
        assert_eq!(encode(MAX_ID, OutputFormat::Base64Custom), "7__________");
        assert_eq!(
            encode(MAX_ID, OutputFormat::Decimal),
            "9223372036854775807"
        );

        let worker_34 = FlakeId::from_components(0, 34, 0).to_raw();
        assert_eq!(encode(worker_34, OutputFormat::Base64Custom), "00000000y00");
    }

    #[test]
    fn hex_worker_nibble_sits_at_index_12() {
        for worker in 0..16 {
            let id = FlakeId::from_components(987_654, worker, 77).to_raw();
            let hex = encode(id, OutputFormat::Hex);
            let nibble = hex.as_bytes()[12];
            assert_eq!(nibble, HEX_ALPHABET[worker as usize], "worker {worker}");
        }
    }

    #[test]
    fn rank_order_matches_numeric_order() {
        let values = [
            0_u64,
            1,
            9,
            10,
            35,
            36,
            61,
            62,
            63,
            64,
            4095,
            4096,
            1 << 22,
            (1 << 22) + 1,
            123_456_789_012,
            MAX_ID - 1,
            MAX_ID,
        ];
        for format in [
            OutputFormat::Decimal,
            OutputFormat::Hex,
            OutputFormat::Base64Custom,
        ] {
            for pair in values.windows(2) {
                let a = encode(pair[0], format);
                let b = encode(pair[1], format);
                assert_eq!(
                    compare_encoded(&a, &b, format),
                    Ordering::Less,
                    "{format}: {a} !< {b}"
                );
                assert_eq!(compare_encoded(&b, &a, format), Ordering::Greater);
                assert_eq!(compare_encoded(&a, &a, format), Ordering::Equal);
            }
        }
    }

    #[test]
    fn base64_class_boundaries_need_rank_comparison() {
        let fmt = OutputFormat::Base64Custom;
        // 35 -> 36 crosses from 'z' to 'A', 61 -> 62 from 'Z' to '-'
        for (low, high, low_text, high_text) in [
            (35, 36, "0000000000z", "0000000000A"),
            (61, 62, "0000000000Z", "0000000000-"),
            (62, 63, "0000000000-", "0000000000_"),
        ] {
            let a = encode(low, fmt);
            let b = encode(high, fmt);
            assert_eq!((a.as_str(), b.as_str()), (low_text, high_text));
            assert_eq!(compare_encoded(&a, &b, fmt), Ordering::Less, "{a} vs {b}");
        }
        // byte order disagrees at both boundaries
        assert!("0000000000A" < "0000000000z");
        assert!("0000000000-" < "0000000000Z");
    }

    #[test]
    fn hex_rank_comparison_ignores_case() {
        assert_eq!(
            compare_encoded("00000000000000ff", "00000000000000FF", OutputFormat::Hex),
            Ordering::Equal
        );
        assert_eq!(
            compare_encoded("000000000000000a", "000000000000000B", OutputFormat::Hex),
            Ordering::Less
        );
    }

    #[test]
    fn decode_inverts_encode() {
        for value in [0, 1, 4096, 34 << 12, 0x1234_5678_9ABC, MAX_ID] {
            for format in [
                OutputFormat::Decimal,
                OutputFormat::Hex,
                OutputFormat::Base64Custom,
            ] {
                let text = encode(value, format);
                assert_eq!(decode(&text, format), Ok(value), "{format} {text}");
            }
        }
    }

    #[test]
    fn hex_decode_accepts_lowercase() {
        assert_eq!(decode("7fffffffffffffff", OutputFormat::Hex), Ok(MAX_ID));
    }

    #[test]
    fn decode_rejects_wrong_width() {
        assert_eq!(
            decode("123", OutputFormat::Hex),
            Err(Error::DecodeInvalidLen {
                len: 3,
                expected: 16
            })
        );
        assert_eq!(
            decode("", OutputFormat::Decimal),
            Err(Error::DecodeInvalidLen {
                len: 0,
                expected: 1
            })
        );
    }

    #[test]
    fn decode_rejects_foreign_symbols() {
        assert_eq!(
            decode("0000000000+", OutputFormat::Base64Custom),
            Err(Error::DecodeInvalidChar { ch: '+', index: 10 })
        );
        assert_eq!(
            decode("000000000000000G", OutputFormat::Hex),
            Err(Error::DecodeInvalidChar { ch: 'G', index: 15 })
        );
        assert_eq!(
            decode("12a", OutputFormat::Decimal),
            Err(Error::DecodeInvalidChar { ch: 'a', index: 2 })
        );
    }

    #[test]
    fn decode_rejects_reserved_bits() {
        // top nibble 8 sets bit 63
        assert_eq!(
            decode("8000000000000000", OutputFormat::Hex),
            Err(Error::DecodeOverflow { bits: 63 })
        );
        assert_eq!(
            decode("80000000000", OutputFormat::Base64Custom),
            Err(Error::DecodeOverflow { bits: 63 })
        );
        assert_eq!(
            decode("9223372036854775808", OutputFormat::Decimal),
            Err(Error::DecodeOverflow { bits: 63 })
        );
    }

    #[test]
    fn arbitrary_widths_pad_on_the_left() {
        assert_eq!(encode_bits(1, 1, OutputFormat::Hex), "1");
        assert_eq!(encode_bits(1, 7, OutputFormat::Base64Custom), "01");
        assert_eq!(encode_bits(u64::MAX, 64, OutputFormat::Hex), "FFFFFFFFFFFFFFFF");
        assert_eq!(encode_bits(u64::MAX, 64, OutputFormat::Base64Custom), "f__________");
        assert_eq!(decode_bits("f__________", 64, OutputFormat::Base64Custom), Ok(u64::MAX));
        // bits above the width are dropped
        assert_eq!(encode_bits(0x1FF, 8, OutputFormat::Hex), "FF");
    }
}
