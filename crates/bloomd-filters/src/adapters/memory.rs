//! In-memory filter backend
//!
//! No persistent backing: closing discards the bits, deleting is closing.
//! Used by unit tests and by configurations with `in_memory` set.

use parking_lot::Mutex;

use crate::domain::bloom::BloomFilter;
use crate::domain::config::FilterConfig;
use crate::error::BackendError;
use crate::ports::outbound::FilterBackend;

/// Filter payload held entirely in memory
pub struct MemoryFilter {
    name: String,
    bits: Mutex<Option<BloomFilter>>,
}

impl MemoryFilter {
    pub fn new(config: &FilterConfig, name: &str) -> Self {
        Self {
            name: name.to_string(),
            bits: Mutex::new(Some(BloomFilter::with_capacity(
                config.initial_capacity,
                config.false_positive_rate,
            ))),
        }
    }
}

impl FilterBackend for MemoryFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, key: &[u8]) -> Result<bool, BackendError> {
        let guard = self.bits.lock();
        let filter = guard.as_ref().ok_or(BackendError::Closed)?;
        Ok(filter.contains(key))
    }

    fn add(&self, key: &[u8]) -> Result<bool, BackendError> {
        let mut guard = self.bits.lock();
        let filter = guard.as_mut().ok_or(BackendError::Closed)?;
        Ok(filter.insert(key))
    }

    fn flush(&self) -> Result<(), BackendError> {
        // Nothing to persist
        Ok(())
    }

    fn close(&self) -> Result<(), BackendError> {
        self.bits.lock().take();
        Ok(())
    }

    fn delete(&self) -> Result<(), BackendError> {
        self.close()
    }

    fn is_proxied(&self) -> bool {
        false
    }

    fn in_memory_only(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> MemoryFilter {
        let config = FilterConfig {
            in_memory: true,
            ..Default::default()
        };
        MemoryFilter::new(&config, "mem")
    }

    #[test]
    fn test_add_then_contains() {
        let f = filter();
        assert!(f.add(b"k").unwrap());
        assert!(!f.add(b"k").unwrap());
        assert!(f.contains(b"k").unwrap());
        assert!(!f.contains(b"absent").unwrap());
    }

    #[test]
    fn test_closed_filter_errors() {
        let f = filter();
        f.close().unwrap();
        assert!(matches!(f.contains(b"k"), Err(BackendError::Closed)));
        assert!(matches!(f.add(b"k"), Err(BackendError::Closed)));
    }

    #[test]
    fn test_never_proxied() {
        let f = filter();
        assert!(!f.is_proxied());
        assert!(f.in_memory_only());
    }
}
