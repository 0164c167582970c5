//! Directory-backed filter backend
//!
//! Each filter owns one directory under the data dir, named
//! `bloomd.<filter_name>`, holding a single bincode-encoded state file.
//! The file is written atomically (temp file, sync, rename) so a crash
//! mid-flush leaves the previous state intact.
//!
//! The payload has three internal states:
//!
//! - *proxied*: directory exists, bits not resident. The discovery path
//!   opens filters this way; the first probe or insert faults the bits in.
//! - *mapped*: bits resident in memory.
//! - *deleted*: backing erased, every operation fails.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::debug;

use crate::domain::bloom::BloomFilter;
use crate::domain::config::FilterConfig;
use crate::error::BackendError;
use crate::ports::outbound::FilterBackend;
use crate::FILTER_DIR_PREFIX;

/// Name of the state file inside a filter directory
const STATE_FILE: &str = "filter.snap";

/// Longest accepted filter name, in bytes
const MAX_NAME_LEN: usize = 255;

enum State {
    Proxied,
    Mapped(BloomFilter),
    Deleted,
}

/// Filter payload persisted under `data_dir/bloomd.<name>`
pub struct PersistentFilter {
    name: String,
    dir: PathBuf,
    capacity: u64,
    false_positive_rate: f64,
    state: Mutex<State>,
}

impl PersistentFilter {
    /// Open or create the filter directory. With `warm` the bits are
    /// loaded immediately; otherwise the filter starts proxied.
    pub fn open(config: &FilterConfig, name: &str, warm: bool) -> Result<Self, BackendError> {
        validate_name(name)?;

        let dir = config
            .data_dir
            .join(format!("{}{}", FILTER_DIR_PREFIX, name));
        fs::create_dir_all(&dir)?;

        let filter = Self {
            name: name.to_string(),
            dir,
            capacity: config.initial_capacity,
            false_positive_rate: config.false_positive_rate,
            state: Mutex::new(State::Proxied),
        };

        if warm {
            let mut state = filter.state.lock();
            *state = State::Mapped(filter.load()?);
        }

        Ok(filter)
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Read the state file, or start fresh if none was ever flushed.
    fn load(&self) -> Result<BloomFilter, BackendError> {
        let path = self.state_path();
        if path.exists() {
            let bytes = fs::read(&path)?;
            let filter: BloomFilter =
                bincode::deserialize(&bytes).map_err(|e| BackendError::Corrupt(e.to_string()))?;
            debug!("faulted in filter '{}' ({} keys)", self.name, filter.len());
            Ok(filter)
        } else {
            Ok(BloomFilter::with_capacity(
                self.capacity,
                self.false_positive_rate,
            ))
        }
    }

    /// Write the state file atomically via a temp file.
    fn store(&self, filter: &BloomFilter) -> Result<(), BackendError> {
        let bytes =
            bincode::serialize(filter).map_err(|e| BackendError::Serialization(e.to_string()))?;

        let temp_path = self.dir.join(format!("{}.tmp", STATE_FILE));
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, self.state_path())?;
        Ok(())
    }

    /// Fault the bits in if necessary, failing once deleted.
    fn ensure_mapped<'a>(&self, state: &'a mut State) -> Result<&'a mut BloomFilter, BackendError> {
        if matches!(state, State::Deleted) {
            return Err(BackendError::Closed);
        }
        if matches!(state, State::Proxied) {
            *state = State::Mapped(self.load()?);
        }
        match state {
            State::Mapped(filter) => Ok(filter),
            _ => Err(BackendError::Closed),
        }
    }
}

impl FilterBackend for PersistentFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, key: &[u8]) -> Result<bool, BackendError> {
        let mut state = self.state.lock();
        let filter = self.ensure_mapped(&mut state)?;
        Ok(filter.contains(key))
    }

    fn add(&self, key: &[u8]) -> Result<bool, BackendError> {
        let mut state = self.state.lock();
        let filter = self.ensure_mapped(&mut state)?;
        Ok(filter.insert(key))
    }

    fn flush(&self) -> Result<(), BackendError> {
        let state = self.state.lock();
        match &*state {
            State::Mapped(filter) => self.store(filter),
            State::Proxied => Ok(()),
            State::Deleted => Err(BackendError::Closed),
        }
    }

    fn close(&self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        match &*state {
            State::Mapped(filter) => {
                self.store(filter)?;
                *state = State::Proxied;
                Ok(())
            }
            State::Proxied => Ok(()),
            State::Deleted => Err(BackendError::Closed),
        }
    }

    fn delete(&self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        *state = State::Deleted;
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn is_proxied(&self) -> bool {
        matches!(*self.state.lock(), State::Proxied)
    }

    fn in_memory_only(&self) -> bool {
        false
    }
}

/// The filter name becomes a directory name; keep it safe for that.
fn validate_name(name: &str) -> Result<(), BackendError> {
    if name.is_empty() {
        return Err(BackendError::InvalidName {
            name: name.to_string(),
            reason: "empty",
        });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(BackendError::InvalidName {
            name: name.to_string(),
            reason: "longer than 255 bytes",
        });
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(BackendError::InvalidName {
            name: name.to_string(),
            reason: "contains a path separator or NUL",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> FilterConfig {
        FilterConfig {
            data_dir: dir.path().to_path_buf(),
            initial_capacity: 1000,
            false_positive_rate: 0.001,
            ..Default::default()
        }
    }

    #[test]
    fn test_warm_open_is_mapped() {
        let dir = TempDir::new().unwrap();
        let f = PersistentFilter::open(&config(&dir), "warm", true).unwrap();
        assert!(!f.is_proxied());
        assert!(dir.path().join("bloomd.warm").is_dir());
    }

    #[test]
    fn test_cold_open_faults_in_on_probe() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);

        {
            let f = PersistentFilter::open(&cfg, "cold", true).unwrap();
            assert!(f.add(b"kept").unwrap());
            f.close().unwrap();
            assert!(f.is_proxied());
        }

        let reopened = PersistentFilter::open(&cfg, "cold", false).unwrap();
        assert!(reopened.is_proxied());
        assert!(reopened.contains(b"kept").unwrap());
        assert!(!reopened.is_proxied(), "probe should fault the bits in");
        assert!(!reopened.contains(b"never").unwrap());
    }

    #[test]
    fn test_flush_then_reload() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);

        let f = PersistentFilter::open(&cfg, "flushed", true).unwrap();
        f.add(b"one").unwrap();
        f.flush().unwrap();

        let twin = PersistentFilter::open(&cfg, "flushed", false).unwrap();
        assert!(twin.contains(b"one").unwrap());
    }

    #[test]
    fn test_delete_removes_directory() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);

        let f = PersistentFilter::open(&cfg, "doomed", true).unwrap();
        f.delete().unwrap();

        assert!(!dir.path().join("bloomd.doomed").exists());
        assert!(matches!(f.contains(b"k"), Err(BackendError::Closed)));
        assert!(matches!(f.close(), Err(BackendError::Closed)));
    }

    #[test]
    fn test_bad_names_rejected() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);

        for bad in ["", "a/b", "a\\b", "nul\0byte"] {
            assert!(
                PersistentFilter::open(&cfg, bad, true).is_err(),
                "name {:?} should be rejected",
                bad
            );
        }
        assert!(PersistentFilter::open(&cfg, &"x".repeat(256), true).is_err());
    }

    #[test]
    fn test_corrupt_state_surfaces() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);

        let filter_dir = dir.path().join("bloomd.bad");
        fs::create_dir_all(&filter_dir).unwrap();
        fs::write(filter_dir.join(STATE_FILE), b"not bincode").unwrap();

        let f = PersistentFilter::open(&cfg, "bad", false).unwrap();
        assert!(matches!(f.contains(b"k"), Err(BackendError::Corrupt(_))));
    }
}
