//! Versioned namespace snapshots
//!
//! A linked chain of name maps forms a simple multi-version concurrency
//! control scheme. The newest snapshot is the head; older versions stay
//! reachable through `predecessor` back-pointers until the vacuum reclaims
//! them. Reads against the head never block mutators.
//!
//! A snapshot's map is immutable once the snapshot is published. The two
//! interiorly-mutable slots are written under well-defined locks: `deleted`
//! once under the manager write lock at the moment the snapshot is
//! superseded by a removal, and `predecessor` cleared by the vacuum when
//! the tail of the chain is detached.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::entry::FilterEntry;
use crate::domain::name_map::NameMap;

/// One version of the name to filter mapping
pub struct NameSpaceSnapshot {
    version: u64,
    map: NameMap,
    /// The entry removed by the mutator that superseded this snapshot,
    /// if that mutator was a removal. Holds the last reference keeping
    /// the retired entry alive for readers still on this version.
    deleted: Mutex<Option<Arc<FilterEntry>>>,
    /// The snapshot this one replaced; empty for genesis, and cleared
    /// by the vacuum once the predecessor is reclaimed.
    predecessor: Mutex<Option<Arc<NameSpaceSnapshot>>>,
}

impl NameSpaceSnapshot {
    /// The initial snapshot, version 0
    pub(crate) fn genesis(map: NameMap) -> Arc<Self> {
        Arc::new(Self {
            version: 0,
            map,
            deleted: Mutex::new(None),
            predecessor: Mutex::new(None),
        })
    }

    /// The snapshot replacing `prev`, carrying the mutated map copy
    pub(crate) fn successor(prev: &Arc<Self>, map: NameMap) -> Arc<Self> {
        Arc::new(Self {
            version: prev.version + 1,
            map,
            deleted: Mutex::new(None),
            predecessor: Mutex::new(Some(Arc::clone(prev))),
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn map(&self) -> &NameMap {
        &self.map
    }

    /// Look up an entry, treating inactive entries as absent
    pub(crate) fn lookup_active(&self, name: &str) -> Option<Arc<FilterEntry>> {
        self.map
            .get(name)
            .filter(|entry| entry.is_active())
            .cloned()
    }

    /// Park a removed entry on this snapshot. Called on the superseded
    /// head, under the manager write lock; at most once per snapshot.
    pub(crate) fn retire(&self, entry: Arc<FilterEntry>) {
        let mut slot = self.deleted.lock();
        debug_assert!(slot.is_none(), "snapshot already carries a retired entry");
        *slot = Some(entry);
    }

    /// True if this snapshot's retired entry has the given stored name
    pub(crate) fn retired_name_is(&self, name: &str) -> bool {
        self.deleted
            .lock()
            .as_ref()
            .is_some_and(|entry| entry.backend().name() == name)
    }

    /// Take the retired entry out for disposal
    pub(crate) fn take_retired(&self) -> Option<Arc<FilterEntry>> {
        self.deleted.lock().take()
    }

    pub(crate) fn predecessor(&self) -> Option<Arc<NameSpaceSnapshot>> {
        self.predecessor.lock().clone()
    }

    /// Detach this snapshot from its predecessor, returning it
    pub(crate) fn take_predecessor(&self) -> Option<Arc<NameSpaceSnapshot>> {
        self.predecessor.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryFilter;
    use crate::domain::config::FilterConfig;

    fn entry(name: &str) -> Arc<FilterEntry> {
        let config = FilterConfig {
            in_memory: true,
            ..Default::default()
        };
        Arc::new(FilterEntry::new(
            Arc::new(MemoryFilter::new(&config, name)),
            None,
            false,
        ))
    }

    #[test]
    fn test_versions_are_contiguous() {
        let genesis = NameSpaceSnapshot::genesis(NameMap::new());
        assert_eq!(genesis.version(), 0);

        let v1 = NameSpaceSnapshot::successor(&genesis, NameMap::new());
        let v2 = NameSpaceSnapshot::successor(&v1, NameMap::new());
        assert_eq!(v1.version(), 1);
        assert_eq!(v2.version(), 2);

        assert_eq!(v2.predecessor().unwrap().version(), 1);
        assert_eq!(v1.predecessor().unwrap().version(), 0);
        assert!(genesis.predecessor().is_none());
    }

    #[test]
    fn test_lookup_skips_inactive() {
        let mut map = NameMap::new();
        let e = entry("ghost");
        map.insert("ghost".to_string(), Arc::clone(&e));
        let snapshot = NameSpaceSnapshot::genesis(map);

        assert!(snapshot.lookup_active("ghost").is_some());
        e.deactivate(true);
        assert!(snapshot.lookup_active("ghost").is_none());
    }

    #[test]
    fn test_retired_entry_round_trip() {
        let snapshot = NameSpaceSnapshot::genesis(NameMap::new());
        assert!(!snapshot.retired_name_is("gone"));

        snapshot.retire(entry("gone"));
        assert!(snapshot.retired_name_is("gone"));
        assert!(!snapshot.retired_name_is("other"));

        assert!(snapshot.take_retired().is_some());
        assert!(snapshot.take_retired().is_none());
    }

    #[test]
    fn test_detach_predecessor() {
        let genesis = NameSpaceSnapshot::genesis(NameMap::new());
        let head = NameSpaceSnapshot::successor(&genesis, NameMap::new());

        let detached = head.take_predecessor().unwrap();
        assert_eq!(detached.version(), 0);
        assert!(head.predecessor().is_none());
    }
}
