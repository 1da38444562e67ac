use crate::{OutputFormat, Result, encoding};
use core::fmt;

/// Width of the timestamp field (milliseconds since `epoch_start`).
pub const TIMESTAMP_BITS: u32 = 41;
/// Width of the worker id field.
pub const WORKER_ID_BITS: u32 = 10;
/// Width of the per-millisecond sequence field.
pub const SEQUENCE_BITS: u32 = 12;
/// Total significant bits in a [`FlakeId`]. The top bit of the `u64` is
/// always zero.
pub const ID_BITS: u32 = TIMESTAMP_BITS + WORKER_ID_BITS + SEQUENCE_BITS;

const TIMESTAMP_SHIFT: u32 = WORKER_ID_BITS + SEQUENCE_BITS;
const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;

const TIMESTAMP_MASK: u64 = (1 << TIMESTAMP_BITS) - 1;
const WORKER_ID_MASK: u64 = (1 << WORKER_ID_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const ID_MASK: u64 = (1 << ID_BITS) - 1;

/// A packed 63-bit identifier.
///
/// ```text
///  Bit Index:  63     62            22 21          12 11             0
///              +------+----------------+--------------+---------------+
///  Field:      | zero | timestamp (41) | worker (10)  | sequence (12) |
///              +------+----------------+--------------+---------------+
/// ```
///
/// Ordering is plain unsigned integer ordering, so IDs minted sequentially by
/// one generator compare as non-decreasing.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlakeId(u64);

impl FlakeId {
    /// Packs the three components, wrapping each modulo its field width.
    ///
    /// The timestamp silently wraps after 2^41 ms (~69 years past the epoch
    /// anchor); worker ids above 1023 alias onto lower ones.
    pub const fn from_components(timestamp: u64, worker_id: u64, sequence: u64) -> Self {
        Self(
            ((timestamp & TIMESTAMP_MASK) << TIMESTAMP_SHIFT)
                | ((worker_id & WORKER_ID_MASK) << WORKER_ID_SHIFT)
                | (sequence & SEQUENCE_MASK),
        )
    }

    /// Wraps a raw integer, clearing the reserved top bit.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw & ID_MASK)
    }

    /// Returns the packed integer.
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Milliseconds since the generator's epoch anchor, modulo 2^41.
    pub const fn timestamp(self) -> u64 {
        (self.0 >> TIMESTAMP_SHIFT) & TIMESTAMP_MASK
    }

    /// The worker id, modulo 2^10.
    pub const fn worker_id(self) -> u64 {
        (self.0 >> WORKER_ID_SHIFT) & WORKER_ID_MASK
    }

    /// The per-millisecond sequence number.
    pub const fn sequence(self) -> u64 {
        self.0 & SEQUENCE_MASK
    }

    pub const fn max_timestamp() -> u64 {
        TIMESTAMP_MASK
    }

    pub const fn max_worker_id() -> u64 {
        WORKER_ID_MASK
    }

    pub const fn max_sequence() -> u64 {
        SEQUENCE_MASK
    }

    /// Renders this ID in the given format.
    pub fn encode(self, format: OutputFormat) -> String {
        encoding::encode(self.0, format)
    }

    /// Parses an ID previously produced by [`Self::encode`].
    ///
    /// # Errors
    ///
    /// Fails if the text has the wrong width, contains foreign symbols, or
    /// sets the reserved top bit.
    pub fn decode(text: &str, format: OutputFormat) -> Result<Self> {
        encoding::decode(text, format).map(Self)
    }
}

impl fmt::Display for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlakeId")
            .field("timestamp", &self.timestamp())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}
