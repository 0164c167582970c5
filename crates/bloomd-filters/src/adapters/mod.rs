//! Filter backend adapters

pub mod memory;
pub mod persistent;

use std::sync::Arc;

use crate::domain::config::FilterConfig;
use crate::error::BackendError;
use crate::ports::outbound::{FilterBackend, FilterProvider};

pub use memory::MemoryFilter;
pub use persistent::PersistentFilter;

/// Default provider: in-memory or directory-backed payloads, chosen per
/// filter from the effective configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardProvider;

impl FilterProvider for StandardProvider {
    fn open(
        &self,
        config: &FilterConfig,
        name: &str,
        warm: bool,
    ) -> Result<Arc<dyn FilterBackend>, BackendError> {
        if config.in_memory {
            Ok(Arc::new(MemoryFilter::new(config, name)))
        } else {
            Ok(Arc::new(PersistentFilter::open(config, name, warm)?))
        }
    }
}
