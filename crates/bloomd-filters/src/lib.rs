//! # bloomd-filters
//!
//! Concurrent registry of named, persistent bloom filters.
//!
//! The manager owns a collection of filters and mediates every operation
//! against them: create, probe, insert, flush, unmap, clear, drop, list.
//! Lookups on the namespace proceed without blocking writers through a
//! chain of versioned snapshots; a background vacuum reclaims retired
//! versions using client-reported checkpoints as its watermark.
//!
//! ## Architecture
//!
//! Hexagonal layout (ports and adapters):
//!
//! - **Domain** (`domain/`): pure logic, no I/O
//!   - `BloomFilter`: the probabilistic payload (bit array, murmur3)
//!   - `FilterConfig`: configuration with validation and builder
//!   - `FilterEntry`: a payload plus its access lock and lifecycle flags
//!   - `NameMap` / `NameSpaceSnapshot`: the versioned namespace
//! - **Ports** (`ports/`): trait seams
//!   - `FilterBackend`: operations the manager invokes on a payload
//!   - `FilterProvider`: payload factory
//! - **Service** (`service/`): orchestration
//!   - `FilterManager`: the public API, mutator serialization, snapshot
//!     publication, client registry, background vacuum, startup discovery
//! - **Adapters** (`adapters/`): concrete backends
//!   - `MemoryFilter`: in-memory payload
//!   - `PersistentFilter`: directory-backed payload with proxying
//!   - `StandardProvider`: picks a backend from the configuration
//!
//! ## Usage
//!
//! ```ignore
//! use bloomd_filters::{FilterConfigBuilder, FilterManager, StandardProvider};
//!
//! let config = FilterConfigBuilder::new()
//!     .data_dir("/var/lib/bloomd")
//!     .initial_capacity(1_000_000)
//!     .false_positive_rate(0.0001)
//!     .build()?;
//!
//! let manager = FilterManager::open(config, StandardProvider)?;
//! manager.create_filter("sessions", None)?;
//!
//! let mut results = [false; 2];
//! manager.set_keys("sessions", &["alice", "bob"], &mut results)?;
//! manager.check_keys("sessions", &["alice", "carol"], &mut results)?;
//!
//! manager.shutdown();
//! ```
//!
//! Worker threads serving traffic should call `client_checkpoint`
//! periodically and `client_leave` when done, so the vacuum can reclaim
//! retired namespace versions behind them.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

/// Directory name prefix for per-filter storage under the data dir:
/// one `bloomd.<filter_name>` subdirectory per filter.
pub const FILTER_DIR_PREFIX: &str = "bloomd.";

pub use adapters::{MemoryFilter, PersistentFilter, StandardProvider};
pub use domain::bloom::BloomFilter;
pub use domain::config::{FilterConfig, FilterConfigBuilder};
pub use domain::entry::FilterEntry;
pub use domain::snapshot::NameSpaceSnapshot;
pub use error::{BackendError, FilterError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::outbound::{FilterBackend, FilterProvider};
pub use service::FilterManager;
