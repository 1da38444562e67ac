use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A source of wall-clock milliseconds since the Unix epoch.
///
/// Generators subtract their configured `epoch_start` from this reading, so
/// implementations never need to know about the ID layout. Plug in a fixed or
/// stepped clock to drive a generator deterministically in tests.
///
/// # Example
///
/// ```
/// use flakeless::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since 1970-01-01 UTC.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// Reads `SystemTime::now()` on every call.
///
/// Follows wall-clock adjustments, including backwards steps. A clock that
/// moves back into an already used millisecond makes the generator restart
/// its sequence there, which can repeat IDs. Prefer [`MonotonicClock`]
/// unless that trade-off is understood.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        unix_millis()
    }
}

/// Wall-clock time sampled once, then advanced by [`Instant`].
///
/// Never goes backwards within a process, even if the system clock is
/// adjusted.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    offset: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: unix_millis(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        let elapsed = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.offset.saturating_add(elapsed)
    }
}

// A clock set before 1970 reads as 0.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let mut last = clock.current_millis();
        for _ in 0..10_000 {
            let now = clock.current_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn monotonic_clock_tracks_wall_clock() {
        let clock = MonotonicClock::default();
        let wall = SystemClock.current_millis();
        let mono = clock.current_millis();
        assert!(mono.abs_diff(wall) < 1_000, "mono={mono} wall={wall}");
    }

    #[test]
    fn references_are_time_sources() {
        fn read(source: impl TimeSource) -> u64 {
            source.current_millis()
        }
        let clock = SystemClock;
        assert!(read(&clock) > 0);
    }
}
