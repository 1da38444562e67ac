/// The outcome of one generator step.
///
/// - [`Poll::Ready`] carries a freshly minted ID.
/// - [`Poll::Exhausted`] means all 4096 sequence values of the current
///   millisecond were used. The generator never sleeps or retries on its own;
///   the caller decides whether to wait for the next millisecond, requeue, or
///   route the request to another worker.
///
/// # Example
///
/// ```
/// use flakeless::{Flakeless, GeneratorConfig, Poll, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         42
///     }
/// }
///
/// let mut generator = Flakeless::with_time(GeneratorConfig::new(), FixedTime).unwrap();
/// match generator.poll_id() {
///     Poll::Ready { id } => println!("minted {id}"),
///     Poll::Exhausted => println!("back off until the next millisecond"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// A unique ID was generated.
    Ready {
        /// The generated ID.
        id: T,
    },
    /// The per-millisecond sequence is used up.
    Exhausted,
}

impl<T> Poll<T> {
    /// Maps a ready value, leaving exhaustion untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Poll<U> {
        match self {
            Self::Ready { id } => Poll::Ready { id: f(id) },
            Self::Exhausted => Poll::Exhausted,
        }
    }

    /// Returns the ID if one was generated.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready { id } => Some(id),
            Self::Exhausted => None,
        }
    }

    /// Returns `true` when the sequence was exhausted.
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}
