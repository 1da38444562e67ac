//! File-backed state hooks for channel generators.
//!
//! Each channel gets one `<channel>.state` file holding the generator state
//! in its text form. The save hook only records the newest snapshot in
//! memory; [`StateFile::flush`] writes it out, so generating IDs never waits
//! on the filesystem. Writes go to a temporary file that is renamed over the
//! old one.

use flakeless::GeneratorConfig;
use parking_lot::Mutex;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Clone, Debug)]
pub struct StateFile {
    path: PathBuf,
    latest: Arc<Mutex<Option<String>>>,
    written: Arc<Mutex<Option<String>>>,
}

impl StateFile {
    /// The state file for `channel` inside `dir`.
    ///
    /// `/orders` maps to `orders.state`, `/a/b` to `a_b.state` and the root
    /// namespace to `root.state`.
    pub fn for_channel(dir: &Path, channel: &str) -> Self {
        let stem = channel.trim_matches('/').replace('/', "_");
        let stem = if stem.is_empty() { "root".to_owned() } else { stem };
        Self {
            path: dir.join(format!("{stem}.state")),
            latest: Arc::default(),
            written: Arc::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored state, `None` if the file does not exist yet.
    pub fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text.trim().to_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Wires this file into `config`: a stored state becomes the load hook
    /// and every new state is recorded for the next [`Self::flush`].
    pub fn attach(&self, config: GeneratorConfig) -> io::Result<GeneratorConfig> {
        let config = match self.load()? {
            Some(stored) => {
                tracing::info!(path = %self.path.display(), state = %stored, "resuming generator state");
                *self.written.lock() = Some(stored.clone());
                config.with_load_state(move || stored.clone())
            }
            None => config,
        };

        let latest = Arc::clone(&self.latest);
        Ok(config.with_save_state(move |state| {
            *latest.lock() = Some(state.to_owned());
        }))
    }

    /// Writes the newest recorded state if it changed since the last write.
    /// Returns whether anything was written.
    pub fn flush(&self) -> io::Result<bool> {
        let Some(latest) = self.latest.lock().clone() else {
            return Ok(false);
        };
        let mut written = self.written.lock();
        if written.as_deref() == Some(latest.as_str()) {
            return Ok(false);
        }

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("state.tmp");
        fs::write(&tmp, latest.as_bytes())?;
        fs::rename(&tmp, &self.path)?;

        *written = Some(latest);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flakeless::{Flakeless, TimeSource};
    use std::time::{SystemTime, UNIX_EPOCH};

    struct FixedTime(u64);

    impl TimeSource for FixedTime {
        fn current_millis(&self) -> u64 {
            self.0
        }
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("flakeless-{tag}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn file_names_follow_the_channel() {
        let dir = Path::new("/var/lib/flakeless");
        assert_eq!(
            StateFile::for_channel(dir, "/orders").path(),
            dir.join("orders.state")
        );
        assert_eq!(
            StateFile::for_channel(dir, "/a/b").path(),
            dir.join("a_b.state")
        );
        assert_eq!(StateFile::for_channel(dir, "/").path(), dir.join("root.state"));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let file = StateFile::for_channel(&scratch_dir("missing"), "/a");
        assert_eq!(file.load().unwrap(), None);
        assert!(!file.flush().unwrap());
    }

    #[test]
    fn generator_resumes_from_flushed_state() {
        let dir = scratch_dir("resume");
        let file = StateFile::for_channel(&dir, "/a");

        let config = file
            .attach(GeneratorConfig::new().with_worker_id(3).with_epoch_start(0))
            .unwrap();
        let mut g = Flakeless::with_time(config, FixedTime(500)).unwrap();
        g.next();
        g.next();
        assert!(file.flush().unwrap());
        assert!(!file.flush().unwrap());
        assert_eq!(file.load().unwrap().as_deref(), Some("3-0-500-1"));

        // a fresh process at the same millisecond continues the counter
        let reopened = StateFile::for_channel(&dir, "/a");
        let config = reopened.attach(GeneratorConfig::new()).unwrap();
        let mut resumed = Flakeless::with_time(config, FixedTime(500)).unwrap();
        let id = resumed.poll_id().ready().unwrap();
        assert_eq!(id.worker_id(), 3);
        assert_eq!(id.sequence(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }
}
