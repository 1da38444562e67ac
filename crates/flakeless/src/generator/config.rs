use crate::OutputFormat;
use core::fmt;

/// Supplies a previously saved state string at construction time.
pub type LoadState = Box<dyn FnMut() -> String + Send>;

/// Receives the serialized state after every generator step.
pub type SaveState = Box<dyn FnMut(&str) + Send>;

/// Construction parameters for a [`crate::Flakeless`] generator.
///
/// Every field is optional:
///
/// | field           | default          |
/// |-----------------|------------------|
/// | `worker_id`     | `0`              |
/// | `epoch_start`   | `1` (Unix ms)    |
/// | `output_format` | `Base64Custom`   |
/// | `load_state`    | none             |
/// | `save_state`    | none             |
///
/// ```
/// use flakeless::{GeneratorConfig, OutputFormat};
///
/// let config = GeneratorConfig::new()
///     .with_worker_id(7)
///     .with_epoch_start(1_577_836_800_000)
///     .with_output_format(OutputFormat::Decimal);
/// assert_eq!(config.worker_id, 7);
/// ```
pub struct GeneratorConfig {
    pub worker_id: u64,
    pub epoch_start: u64,
    pub output_format: OutputFormat,
    pub load_state: Option<LoadState>,
    pub save_state: Option<SaveState>,
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_worker_id(mut self, worker_id: u64) -> Self {
        self.worker_id = worker_id;
        self
    }

    #[must_use]
    pub fn with_epoch_start(mut self, epoch_start: u64) -> Self {
        self.epoch_start = epoch_start;
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    /// Restores state from `load` when the generator is built.
    #[must_use]
    pub fn with_load_state(mut self, load: impl FnMut() -> String + Send + 'static) -> Self {
        self.load_state = Some(Box::new(load));
        self
    }

    /// Hands every successor state to `save`, synchronously.
    #[must_use]
    pub fn with_save_state(mut self, save: impl FnMut(&str) + Send + 'static) -> Self {
        self.save_state = Some(Box::new(save));
        self
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            epoch_start: 1,
            output_format: OutputFormat::default(),
            load_state: None,
            save_state: None,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("worker_id", &self.worker_id)
            .field("epoch_start", &self.epoch_start)
            .field("output_format", &self.output_format)
            .field("load_state", &self.load_state.is_some())
            .field("save_state", &self.save_state.is_some())
            .finish()
    }
}
