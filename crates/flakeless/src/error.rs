/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors `flakeless` can produce.
///
/// Sequence exhaustion is not an error; it is reported as
/// [`crate::Poll::Exhausted`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Persisted generator state did not match
    /// `workerID-epochStart-epochLast-counter`.
    #[error("malformed generator state: {input:?}")]
    StateFormat {
        /// The rejected input.
        input: String,
    },

    /// An output format name was not recognized.
    #[error("unsupported output format: {format:?}")]
    UnsupportedFormat {
        /// The rejected format name.
        format: String,
    },

    /// An encoded ID had the wrong number of characters.
    #[error("invalid encoded length {len}, expected {expected}")]
    DecodeInvalidLen {
        /// Observed length in bytes.
        len: usize,
        /// Required length.
        expected: usize,
    },

    /// An encoded ID contained a symbol outside the format's alphabet.
    #[error("invalid character {ch:?} at index {index}")]
    DecodeInvalidChar {
        /// The offending character.
        ch: char,
        /// Its character position.
        index: usize,
    },

    /// The decoded value does not fit in the requested bit width.
    #[error("decoded value does not fit in {bits} bits")]
    DecodeOverflow {
        /// The requested width.
        bits: u32,
    },
}
