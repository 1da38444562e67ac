mod alphabet;
mod format;

pub use alphabet::*;
pub use format::*;

use crate::{ID_BITS, Result};

/// Encodes a 63-bit ID value in `format`.
///
/// Hex output is always 16 characters and base-64 output is always 11; both
/// are zero-padded on the most significant side. Compared symbol by symbol
/// with [`compare_encoded`], strings of one format sort exactly like the
/// integers they hold.
///
/// ```
/// use flakeless::{OutputFormat, encode};
///
/// assert_eq!(encode(34 << 12, OutputFormat::Base64Custom), "00000000y00");
/// assert_eq!(encode(255, OutputFormat::Hex), "00000000000000FF");
/// assert_eq!(encode(255, OutputFormat::Decimal), "255");
/// ```
pub fn encode(value: u64, format: OutputFormat) -> String {
    encode_bits(value, ID_BITS, format)
}

/// Decodes a string produced by [`encode`] back into the 63-bit value.
///
/// # Errors
///
/// See [`decode_bits`].
pub fn decode(text: &str, format: OutputFormat) -> Result<u64> {
    decode_bits(text, ID_BITS, format)
}
