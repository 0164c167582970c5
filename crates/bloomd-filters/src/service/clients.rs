//! Client registry
//!
//! Tracks every worker thread that has checkpointed, together with the
//! newest snapshot version it has observed. The vacuum folds these into
//! its reclamation watermark. The set is small (one record per worker
//! thread) and churn is low, so a plain vector behind a short lock is
//! enough; lookups are O(n).

use std::thread::ThreadId;

use parking_lot::Mutex;

struct ClientRecord {
    id: ThreadId,
    last_seen: u64,
}

/// Set of active workers and their observed versions
#[derive(Default)]
pub(crate) struct ClientRegistry {
    records: Mutex<Vec<ClientRecord>>,
}

impl ClientRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record that `id` has observed `version`, registering it if new.
    /// Idempotent: a thread holds at most one record.
    pub(crate) fn checkpoint(&self, id: ThreadId, version: u64) {
        let mut records = self.records.lock();
        for record in records.iter_mut() {
            if record.id == id {
                record.last_seen = version;
                return;
            }
        }
        records.push(ClientRecord {
            id,
            last_seen: version,
        });
    }

    /// Drop the record for `id`, if present
    pub(crate) fn leave(&self, id: ThreadId) {
        self.records.lock().retain(|record| record.id != id);
    }

    /// The smallest observed version, bounded above by `ceiling`
    pub(crate) fn min_version(&self, ceiling: u64) -> u64 {
        self.records
            .lock()
            .iter()
            .map(|record| record.last_seen)
            .fold(ceiling, u64::min)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.records.lock().clear();
    }
}
