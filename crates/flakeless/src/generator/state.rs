use crate::{Error, FlakeId, Poll};
use core::{fmt, str::FromStr};

/// The complete mutable state of one generator.
///
/// The text form is `workerID-epochStart-epochLast-counter`, four unsigned
/// decimal integers joined by `-`:
///
/// ```
/// use flakeless::GeneratorState;
///
/// let state: GeneratorState = "3-1000-42-7".parse().unwrap();
/// assert_eq!(state.worker_id, 3);
/// assert_eq!(state.epoch_last, 42);
/// assert_eq!(state.to_string(), "3-1000-42-7");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GeneratorState {
    /// Stamped into bits 12..22 of every ID, modulo 1024.
    pub worker_id: u64,
    /// Unix millisecond subtracted from clock readings.
    pub epoch_start: u64,
    /// Time delta of the most recent transition.
    pub epoch_last: u64,
    /// Calls seen within `epoch_last`. Saturates instead of wrapping.
    pub counter: u64,
}

impl GeneratorState {
    /// A fresh state: no millisecond observed yet.
    pub const fn new(worker_id: u64, epoch_start: u64) -> Self {
        Self {
            worker_id,
            epoch_start,
            epoch_last: 0,
            counter: 0,
        }
    }

    /// Computes one generator step at wall-clock millisecond `now`.
    ///
    /// Returns the successor state together with the outcome. The successor
    /// must be kept even when the outcome is [`Poll::Exhausted`]: later calls
    /// in the same millisecond keep counting and stay exhausted.
    #[must_use]
    pub const fn advance(self, now: u64) -> (Self, Poll<FlakeId>) {
        let time_delta = now.wrapping_sub(self.epoch_start);
        let (epoch_last, counter) = if time_delta == self.epoch_last {
            (self.epoch_last, self.counter.saturating_add(1))
        } else {
            (time_delta, 0)
        };

        let next = Self {
            epoch_last,
            counter,
            ..self
        };
        let poll = if counter > FlakeId::max_sequence() {
            Poll::Exhausted
        } else {
            Poll::Ready {
                id: FlakeId::from_components(time_delta, self.worker_id, counter),
            }
        };
        (next, poll)
    }
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.worker_id, self.epoch_start, self.epoch_last, self.counter
        )
    }
}

impl FromStr for GeneratorState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::StateFormat {
            input: s.to_owned(),
        };
        let field = |part: &str| -> Result<u64, Error> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse().map_err(|_| malformed())
        };

        let mut parts = s.split('-');
        let mut next = || parts.next().ok_or_else(malformed).and_then(field);
        let state = Self {
            worker_id: next()?,
            epoch_start: next()?,
            epoch_last: next()?,
            counter: next()?,
        };
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats() {
        let state = GeneratorState {
            worker_id: 1023,
            epoch_start: 1_577_836_800_000,
            epoch_last: 99,
            counter: 4096,
        };
        let text = state.to_string();
        assert_eq!(text, "1023-1577836800000-99-4096");
        assert_eq!(text.parse(), Ok(state));
    }

    #[test]
    fn rejects_malformed_text() {
        for input in [
            "",
            "1-2-3",
            "1-2-3-4-5",
            "a-b-c-d",
            "1--3-4",
            "-1-2-3-4",
            "1-2-3-+4",
            "1 -2-3-4",
            "1-2-3-18446744073709551616",
        ] {
            assert_eq!(
                input.parse::<GeneratorState>(),
                Err(Error::StateFormat {
                    input: input.to_owned()
                }),
                "{input:?}"
            );
        }
    }

    #[test]
    fn first_call_in_new_millisecond_starts_at_zero() {
        let state = GeneratorState::new(5, 1_000);
        let (state, poll) = state.advance(1_010);
        let id = poll.ready().unwrap();
        assert_eq!(id.timestamp(), 10);
        assert_eq!(id.worker_id(), 5);
        assert_eq!(id.sequence(), 0);
        assert_eq!(state.epoch_last, 10);
        assert_eq!(state.counter, 0);
    }

    #[test]
    fn same_millisecond_increments() {
        let state = GeneratorState::new(0, 0);
        let (state, _) = state.advance(7);
        let (state, poll) = state.advance(7);
        assert_eq!(poll.ready().map(FlakeId::sequence), Some(1));
        assert_eq!(state.counter, 1);
    }

    #[test]
    fn exhausts_past_max_sequence() {
        let state = GeneratorState {
            worker_id: 0,
            epoch_start: 0,
            epoch_last: 7,
            counter: FlakeId::max_sequence() - 1,
        };
        let (state, poll) = state.advance(7);
        assert_eq!(poll.ready().map(FlakeId::sequence), Some(4095));
        let (state, poll) = state.advance(7);
        assert!(poll.is_exhausted());
        assert_eq!(state.counter, 4096);
        let (_, poll) = state.advance(8);
        assert_eq!(poll.ready().map(FlakeId::sequence), Some(0));
    }

    #[test]
    fn saturated_counter_stays_exhausted() {
        let state = GeneratorState {
            worker_id: 0,
            epoch_start: 0,
            epoch_last: 7,
            counter: u64::MAX,
        };
        let (state, poll) = state.advance(7);
        assert!(poll.is_exhausted());
        assert_eq!(state.counter, u64::MAX);
    }

    #[test]
    fn clock_before_epoch_wraps_instead_of_failing() {
        let state = GeneratorState::new(0, 1_000);
        let (_, poll) = state.advance(999);
        let id = poll.ready().unwrap();
        assert_eq!(id.timestamp(), FlakeId::max_timestamp());
    }
}
