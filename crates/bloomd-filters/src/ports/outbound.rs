//! Driven ports
//!
//! Traits for the collaborators the filter manager consumes: the filter
//! payload itself, and the factory that opens payloads. The manager never
//! looks inside a payload; everything it needs is on `FilterBackend`.

use std::sync::Arc;

use crate::domain::config::FilterConfig;
use crate::error::BackendError;

/// A single filter payload (Driven Port)
///
/// Implementations must be internally thread safe: the manager wraps calls
/// in a per-filter reader/writer lock for ordering, but `flush` and the
/// metrics accessors are invoked without it.
pub trait FilterBackend: Send + Sync {
    /// The name this payload was opened with, verbatim
    fn name(&self) -> &str;

    /// Probe a key. `Ok(true)` means possibly present, `Ok(false)` means
    /// definitely absent.
    fn contains(&self, key: &[u8]) -> Result<bool, BackendError>;

    /// Insert a key. `Ok(true)` iff the key was newly added.
    fn add(&self, key: &[u8]) -> Result<bool, BackendError>;

    /// Persist in-memory state to the backing store
    fn flush(&self) -> Result<(), BackendError>;

    /// Release in-memory state, keeping the backing store
    fn close(&self) -> Result<(), BackendError>;

    /// Erase the backing store entirely
    fn delete(&self) -> Result<(), BackendError>;

    /// True when the payload is not resident in memory
    fn is_proxied(&self) -> bool;

    /// True when the payload has no persistent backing at all
    fn in_memory_only(&self) -> bool;
}

/// Factory for filter payloads (Driven Port)
pub trait FilterProvider: Send + Sync {
    /// Open the payload for `name` under the given configuration.
    ///
    /// With `warm` set the payload is faulted into memory immediately
    /// (creation path); without it the payload may open proxied
    /// (startup discovery path).
    fn open(
        &self,
        config: &FilterConfig,
        name: &str,
        warm: bool,
    ) -> Result<Arc<dyn FilterBackend>, BackendError>;
}
