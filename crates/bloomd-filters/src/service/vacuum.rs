//! Background reclamation
//!
//! Old namespace versions pile up behind the head until every registered
//! client has checkpointed past them. The vacuum computes that watermark
//! each tick and detaches the reclaimable tail of the snapshot chain,
//! disposing any retired entries it carried.

use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::domain::snapshot::NameSpaceSnapshot;
use crate::ports::outbound::FilterProvider;
use crate::service::manager::FilterManager;

/// Outstanding unreclaimable versions above this draw a warning
pub(crate) const WARN_THRESHOLD: u64 = 32;

/// Reclaim every snapshot with a version strictly below `min_version`.
///
/// Must run under the vacuum-exclusion lock. Versions are contiguous, so
/// the reclaimable snapshots form one suffix of the chain: the walk finds
/// the oldest surviving snapshot, detaches its predecessor link, then
/// unlinks the tail one node at a time (which also keeps deep chains from
/// unwinding recursively when the handles drop). Returns the number of
/// snapshots destroyed and retired entries disposed.
pub(crate) fn reclaim_older_than(
    head: &Arc<NameSpaceSnapshot>,
    min_version: u64,
) -> (u64, u64) {
    let mut boundary = Arc::clone(head);
    loop {
        let Some(predecessor) = boundary.predecessor() else {
            return (0, 0);
        };
        if predecessor.version() >= min_version {
            boundary = predecessor;
            continue;
        }

        let mut cursor = boundary.take_predecessor();
        let mut snapshots = 0;
        let mut entries = 0;
        while let Some(snapshot) = cursor {
            if let Some(entry) = snapshot.take_retired() {
                entry.dispose();
                entries += 1;
            }
            debug!("destroying namespace version {}", snapshot.version());
            cursor = snapshot.take_predecessor();
            snapshots += 1;
        }
        return (snapshots, entries);
    }
}

/// Body of the vacuum thread: one pass per tick until the manager stops
/// or is dropped.
pub(crate) fn run_loop<P>(manager: Weak<FilterManager<P>>, interval: Duration)
where
    P: FilterProvider + 'static,
{
    loop {
        thread::sleep(interval);
        let Some(manager) = manager.upgrade() else {
            break;
        };
        if !manager.is_running() {
            break;
        }
        manager.vacuum_pass();
    }
    debug!("vacuum task exiting");
}
