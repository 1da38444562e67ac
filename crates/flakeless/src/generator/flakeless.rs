use crate::{
    FlakeId, GeneratorConfig, GeneratorState, MonotonicClock, OutputFormat, Poll, Result,
    SaveState, TimeSource,
};
use core::fmt;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A single-owner Snowflake-style ID generator.
///
/// Each call to [`Self::poll_id`] or [`Self::next`] performs one
/// [`GeneratorState::advance`] against the configured [`TimeSource`]. The
/// generator never blocks: when the 4096 sequence values of a millisecond are
/// used up it returns [`Poll::Exhausted`] until the clock moves on.
///
/// All stepping methods take `&mut self`, so one instance cannot be driven
/// from two threads at once. Use one generator per worker id, and wrap it in
/// a lock or a dedicated task if it must be shared.
///
/// # Example
///
/// ```
/// use flakeless::{Flakeless, GeneratorConfig, OutputFormat, SystemClock};
///
/// let config = GeneratorConfig::new().with_output_format(OutputFormat::Hex);
/// let mut generator = Flakeless::with_time(config, SystemClock).unwrap();
/// let id = generator.next().ready().unwrap();
/// assert_eq!(id.len(), 16);
/// ```
pub struct Flakeless<T: TimeSource = MonotonicClock> {
    state: GeneratorState,
    output_format: OutputFormat,
    save_state: Option<SaveState>,
    time: T,
}

impl Flakeless<MonotonicClock> {
    /// Builds a generator on a fresh [`MonotonicClock`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StateFormat`] if `load_state` yields a string
    /// that is not a valid state.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Self::with_time(config, MonotonicClock::new())
    }
}

impl<T: TimeSource> Flakeless<T> {
    /// Builds a generator reading time from `time`.
    ///
    /// When `load_state` is configured it is called once, here, and its
    /// result replaces all four state fields. The configured
    /// `output_format` always applies.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StateFormat`] if the loaded state is malformed.
    pub fn with_time(config: GeneratorConfig, time: T) -> Result<Self> {
        let GeneratorConfig {
            worker_id,
            epoch_start,
            output_format,
            load_state,
            save_state,
        } = config;

        let state = match load_state {
            Some(mut load) => load().parse()?,
            None => GeneratorState::new(worker_id, epoch_start),
        };

        Ok(Self {
            state,
            output_format,
            save_state,
            time,
        })
    }

    /// Performs one step and returns the packed ID, if any.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_id(&mut self) -> Poll<FlakeId> {
        let now = self.time.current_millis();
        let (state, poll) = self.state.advance(now);
        self.state = state;
        self.persist();
        poll
    }

    /// Performs one step and renders the ID in the configured format.
    ///
    /// Named after the step it performs; this is not an [`Iterator`], since
    /// exhaustion is not the end of the sequence.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Poll<String> {
        let format = self.output_format;
        self.poll_id().map(|id| id.encode(format))
    }

    /// Returns the state as `workerID-epochStart-epochLast-counter`.
    pub fn serialize(&self) -> String {
        self.state.to_string()
    }

    /// Replaces all four state fields from `text`, or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StateFormat`] if `text` is malformed.
    pub fn deserialize(&mut self, text: &str) -> Result<()> {
        self.state = text.parse()?;
        Ok(())
    }

    pub const fn state(&self) -> GeneratorState {
        self.state
    }

    pub const fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub const fn worker_id(&self) -> u64 {
        self.state.worker_id
    }

    fn persist(&mut self) {
        if let Some(save) = self.save_state.as_mut() {
            save(&self.state.to_string());
        }
    }
}

impl<T: TimeSource> fmt::Debug for Flakeless<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flakeless")
            .field("state", &self.state)
            .field("output_format", &self.output_format)
            .field("save_state", &self.save_state.is_some())
            .finish_non_exhaustive()
    }
}
