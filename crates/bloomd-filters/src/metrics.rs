//! Operation counters for the filter manager
//!
//! Thread-safe counters covering the manager's lifecycle operations and the
//! background reclaimer. Purely observational; nothing in the manager reads
//! these back to make decisions.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector owned by the filter manager
#[derive(Debug, Default)]
pub struct Metrics {
    /// Filters created through the public API
    pub filters_created: AtomicU64,
    /// Filters discovered on disk at startup
    pub filters_discovered: AtomicU64,
    /// Filters dropped (backing erased on reclamation)
    pub filters_dropped: AtomicU64,
    /// Filters cleared (backing kept on reclamation)
    pub filters_cleared: AtomicU64,
    /// Keys probed across all filters
    pub keys_checked: AtomicU64,
    /// Keys inserted across all filters
    pub keys_set: AtomicU64,
    /// Client checkpoint calls
    pub checkpoints: AtomicU64,
    /// Completed vacuum passes
    pub vacuum_passes: AtomicU64,
    /// Snapshots destroyed by the vacuum
    pub snapshots_reclaimed: AtomicU64,
    /// Retired entries disposed by the vacuum
    pub entries_reclaimed: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_filter_created(&self) {
        self.filters_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filters_discovered(&self, count: u64) {
        self.filters_discovered.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_filter_dropped(&self) {
        self.filters_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filter_cleared(&self) {
        self.filters_cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_keys_checked(&self, count: u64) {
        self.keys_checked.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_keys_set(&self, count: u64) {
        self.keys_set.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_checkpoint(&self) {
        self.checkpoints.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_vacuum_pass(&self, snapshots: u64, entries: u64) {
        self.vacuum_passes.fetch_add(1, Ordering::Relaxed);
        self.snapshots_reclaimed.fetch_add(snapshots, Ordering::Relaxed);
        self.entries_reclaimed.fetch_add(entries, Ordering::Relaxed);
    }

    /// Take a consistent-enough point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            filters_created: self.filters_created.load(Ordering::Relaxed),
            filters_discovered: self.filters_discovered.load(Ordering::Relaxed),
            filters_dropped: self.filters_dropped.load(Ordering::Relaxed),
            filters_cleared: self.filters_cleared.load(Ordering::Relaxed),
            keys_checked: self.keys_checked.load(Ordering::Relaxed),
            keys_set: self.keys_set.load(Ordering::Relaxed),
            checkpoints: self.checkpoints.load(Ordering::Relaxed),
            vacuum_passes: self.vacuum_passes.load(Ordering::Relaxed),
            snapshots_reclaimed: self.snapshots_reclaimed.load(Ordering::Relaxed),
            entries_reclaimed: self.entries_reclaimed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the manager counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub filters_created: u64,
    pub filters_discovered: u64,
    pub filters_dropped: u64,
    pub filters_cleared: u64,
    pub keys_checked: u64,
    pub keys_set: u64,
    pub checkpoints: u64,
    pub vacuum_passes: u64,
    pub snapshots_reclaimed: u64,
    pub entries_reclaimed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_filter_created();
        metrics.record_filter_created();
        metrics.record_keys_set(3);
        metrics.record_vacuum_pass(2, 1);

        let snap = metrics.snapshot();
        assert_eq!(snap.filters_created, 2);
        assert_eq!(snap.keys_set, 3);
        assert_eq!(snap.vacuum_passes, 1);
        assert_eq!(snap.snapshots_reclaimed, 2);
        assert_eq!(snap.entries_reclaimed, 1);
    }
}
