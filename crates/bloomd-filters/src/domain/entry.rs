//! Per-filter entry
//!
//! Wraps a filter payload so that a single writer accesses it at a time.
//! The entry carries the lifecycle flags the manager and the vacuum agree
//! on:
//!
//! - `is_active`: once flipped to `false` it never returns to `true`;
//!   lookups treat an inactive entry as absent.
//! - `is_hot`: set by any read or write, cleared by the cold-list scan.
//!   A hint only; relaxed ordering is enough.
//! - `should_delete`: decides whether disposal erases the backing store
//!   or merely closes the payload.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::domain::config::FilterConfig;
use crate::error::BackendError;
use crate::ports::outbound::FilterBackend;

/// A filter payload plus its access lock and lifecycle flags
pub struct FilterEntry {
    backend: Arc<dyn FilterBackend>,
    /// Ordering lock around payload access. Readers share it for probes,
    /// writers take it exclusively for inserts and for closing the
    /// payload under a caller's feet. Never held across a call back into
    /// the manager.
    access: RwLock<()>,
    is_active: AtomicBool,
    is_hot: AtomicBool,
    should_delete: AtomicBool,
    custom_config: Option<FilterConfig>,
}

impl FilterEntry {
    pub(crate) fn new(
        backend: Arc<dyn FilterBackend>,
        custom_config: Option<FilterConfig>,
        hot: bool,
    ) -> Self {
        Self {
            backend,
            access: RwLock::new(()),
            is_active: AtomicBool::new(true),
            is_hot: AtomicBool::new(hot),
            should_delete: AtomicBool::new(false),
            custom_config,
        }
    }

    /// The payload, without any locking. Callers must not mutate filter
    /// state through this reference.
    pub fn backend(&self) -> &dyn FilterBackend {
        &*self.backend
    }

    /// Configuration overriding the manager default, if any
    pub fn custom_config(&self) -> Option<&FilterConfig> {
        self.custom_config.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }

    pub fn is_hot(&self) -> bool {
        self.is_hot.load(Ordering::Relaxed)
    }

    /// Retire the entry. Called under the manager write lock before the
    /// entry moves to a retired snapshot slot; never reversed.
    pub(crate) fn deactivate(&self, delete_backing: bool) {
        self.is_active.store(false, Ordering::Release);
        self.should_delete.store(delete_backing, Ordering::Release);
    }

    /// Clear the hot flag, returning whether it was set
    pub(crate) fn clear_hot(&self) -> bool {
        self.is_hot.swap(false, Ordering::Relaxed)
    }

    /// Probe `keys` under the shared lock, writing one result per key.
    ///
    /// Halts at the first failing probe; earlier results stay written.
    /// The entry is marked hot either way.
    pub(crate) fn check_keys<K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        results: &mut [bool],
    ) -> Result<(), BackendError> {
        let _shared = self.access.read();

        let mut failure = None;
        for (i, key) in keys.iter().enumerate() {
            match self.backend.contains(key.as_ref()) {
                Ok(present) => results[i] = present,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        self.is_hot.store(true, Ordering::Relaxed);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Insert `keys` under the exclusive lock, writing `true` per key that
    /// was newly added.
    ///
    /// Same halting and hotness behavior as [`Self::check_keys`].
    pub(crate) fn set_keys<K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        results: &mut [bool],
    ) -> Result<(), BackendError> {
        let _exclusive = self.access.write();

        let mut failure = None;
        for (i, key) in keys.iter().enumerate() {
            match self.backend.add(key.as_ref()) {
                Ok(newly_added) => results[i] = newly_added,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        self.is_hot.store(true, Ordering::Relaxed);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Close the payload under the exclusive lock, releasing its memory
    /// while keeping the entry registered.
    pub(crate) fn unmap(&self) -> Result<(), BackendError> {
        let _exclusive = self.access.write();
        self.backend.close()
    }

    /// Dispose the payload per the `should_delete` flag. Errors are logged
    /// and swallowed; disposal runs on reclamation paths that cannot
    /// surface them.
    pub(crate) fn dispose(&self) {
        let name = self.backend.name().to_string();
        let result = if self.should_delete.load(Ordering::Acquire) {
            self.backend.delete()
        } else {
            self.backend.close()
        };
        if let Err(err) = result {
            warn!("failed to dispose filter '{}': {}", name, err);
        }
    }

    /// Dispose closing the payload regardless of the delete flag. Used at
    /// teardown, which never erases backing stores.
    pub(crate) fn dispose_closing(&self) {
        self.should_delete.store(false, Ordering::Release);
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryFilter;

    fn entry(hot: bool) -> FilterEntry {
        let config = FilterConfig {
            in_memory: true,
            ..Default::default()
        };
        let backend = Arc::new(MemoryFilter::new(&config, "test"));
        FilterEntry::new(backend, None, hot)
    }

    #[test]
    fn test_new_entry_is_active() {
        let e = entry(true);
        assert!(e.is_active());
        assert!(e.is_hot());
    }

    #[test]
    fn test_deactivate_is_permanent() {
        let e = entry(true);
        e.deactivate(true);
        assert!(!e.is_active());
    }

    #[test]
    fn test_set_then_check_marks_hot() {
        let e = entry(false);
        assert!(!e.is_hot());

        let mut results = [false; 2];
        e.set_keys(&["a", "b"], &mut results).unwrap();
        assert_eq!(results, [true, true]);
        assert!(e.is_hot());

        assert!(e.clear_hot());
        assert!(!e.clear_hot());

        let mut results = [false; 3];
        e.check_keys(&["a", "b", "c"], &mut results).unwrap();
        assert_eq!(results, [true, true, false]);
        assert!(e.is_hot());
    }

    #[test]
    fn test_check_halts_on_closed_backend() {
        let e = entry(false);
        e.backend().close().unwrap();

        let mut results = [true; 1];
        assert!(e.check_keys(&["a"], &mut results).is_err());
        // failure still marks the entry hot, matching the read attempt
        assert!(e.is_hot());
    }
}
