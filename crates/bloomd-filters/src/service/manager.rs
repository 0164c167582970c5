//! The filter manager
//!
//! Owns the namespace of live filters and mediates every operation against
//! them. Three pieces interlock:
//!
//! - **Versioned snapshots.** The head snapshot is replaced, never edited.
//!   A mutator copies the head's map under the write-serialization lock,
//!   edits the copy, and installs it as the new head. Readers that loaded
//!   the old head keep a fully intact namespace; an entry removed by a
//!   mutator is parked on the superseded snapshot until reclamation.
//! - **Two lock levels.** One process-wide mutex totally orders mutators;
//!   each entry carries its own reader/writer lock around payload access.
//!   Queries never touch the write lock, and entry locks are never held
//!   across a call back into the manager.
//! - **Cooperative reclamation.** Worker threads checkpoint the head
//!   version they have observed; the vacuum destroys snapshots older than
//!   every checkpoint. `create_filter` takes the same exclusion lock when
//!   it scans retired slots, in write-then-vacuum order only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::config::FilterConfig;
use crate::domain::entry::FilterEntry;
use crate::domain::snapshot::NameSpaceSnapshot;
use crate::error::FilterError;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ports::outbound::{FilterBackend, FilterProvider};
use crate::service::{clients::ClientRegistry, discovery, vacuum};

/// Concurrent registry of named bloom filters
pub struct FilterManager<P: FilterProvider> {
    config: FilterConfig,
    provider: P,
    /// Head snapshot pointer. Swapped only under `write_lock`; readers
    /// clone the handle out under a momentary read lock that is never
    /// held across payload work.
    head: RwLock<Arc<NameSpaceSnapshot>>,
    /// Serializes namespace mutators
    write_lock: Mutex<()>,
    /// Excludes reclamation against the pending-delete scan in
    /// `create_filter`. Acquired only while already holding `write_lock`,
    /// or alone by the vacuum.
    vacuum_lock: Mutex<()>,
    clients: ClientRegistry,
    metrics: Metrics,
    should_run: AtomicBool,
    vacuum_thread: Mutex<Option<JoinHandle<()>>>,
    torn_down: AtomicBool,
}

impl<P: FilterProvider> FilterManager<P> {
    /// Build a manager, materializing the genesis namespace from the data
    /// directory. The vacuum task is not started; see [`Self::open`] or
    /// [`Self::spawn_vacuum`].
    pub fn new(config: FilterConfig, provider: P) -> Result<Self, FilterError> {
        config.validate()?;

        let mut map = crate::domain::name_map::NameMap::new();
        let found = discovery::discover_existing(&config, &provider, &mut map)?;

        let manager = Self {
            config,
            provider,
            head: RwLock::new(NameSpaceSnapshot::genesis(map)),
            write_lock: Mutex::new(()),
            vacuum_lock: Mutex::new(()),
            clients: ClientRegistry::new(),
            metrics: Metrics::new(),
            should_run: AtomicBool::new(true),
            vacuum_thread: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        };
        manager.metrics.record_filters_discovered(found as u64);
        Ok(manager)
    }

    /// The head snapshot
    pub(crate) fn current(&self) -> Arc<NameSpaceSnapshot> {
        self.head.read().clone()
    }

    /// Version of the head snapshot
    pub fn current_version(&self) -> u64 {
        self.current().version()
    }

    /// The manager-wide default configuration
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Point-in-time operation counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of registered client threads
    pub fn registered_clients(&self) -> usize {
        self.clients.len()
    }

    /// Record that the calling thread has observed the current head
    /// version, registering it as a client if new. Workers should call
    /// this periodically so the vacuum can advance its watermark.
    /// Idempotent; O(n) in the registry size.
    pub fn client_checkpoint(&self) {
        let version = self.current().version();
        self.clients.checkpoint(thread::current().id(), version);
        self.metrics.record_checkpoint();
    }

    /// Deregister the calling thread. Idempotent.
    pub fn client_leave(&self) {
        self.clients.leave(thread::current().id());
    }

    /// Probe `keys` against the named filter, writing present/absent into
    /// `results` (which must be at least as long as `keys`). Takes the
    /// filter's lock in shared mode and marks the filter hot. Halts at the
    /// first failing probe; earlier results stay written.
    pub fn check_keys<K: AsRef<[u8]>>(
        &self,
        name: &str,
        keys: &[K],
        results: &mut [bool],
    ) -> Result<(), FilterError> {
        let entry = self.lookup(name)?;
        entry.check_keys(keys, results)?;
        self.metrics.record_keys_checked(keys.len() as u64);
        Ok(())
    }

    /// Insert `keys` into the named filter, writing newly-added/already-set
    /// into `results`. Takes the filter's lock in exclusive mode; otherwise
    /// shaped like [`Self::check_keys`].
    pub fn set_keys<K: AsRef<[u8]>>(
        &self,
        name: &str,
        keys: &[K],
        results: &mut [bool],
    ) -> Result<(), FilterError> {
        let entry = self.lookup(name)?;
        entry.set_keys(keys, results)?;
        self.metrics.record_keys_set(keys.len() as u64);
        Ok(())
    }

    /// Flush the named filter's in-memory state to its backing store.
    /// The payload flush is internally synchronized; no entry lock is
    /// taken.
    pub fn flush_filter(&self, name: &str) -> Result<(), FilterError> {
        let entry = self.lookup(name)?;
        entry.backend().flush()?;
        Ok(())
    }

    /// Create a new filter, optionally with a configuration overriding the
    /// manager default. The custom config is owned by the created entry.
    pub fn create_filter(
        &self,
        name: &str,
        custom_config: Option<FilterConfig>,
    ) -> Result<(), FilterError> {
        if let Some(config) = &custom_config {
            config.validate()?;
        }

        let _mutator = self.write_lock.lock();

        let head = self.current();
        if head.map().contains(name) {
            return Err(FilterError::AlreadyExists(name.to_string()));
        }

        // Refuse a name still held by a retired snapshot. The exclusion
        // lock keeps the vacuum from freeing slots under this scan.
        {
            let _exclusion = self.vacuum_lock.lock();
            let mut cursor = head.predecessor();
            while let Some(snapshot) = cursor {
                if snapshot.retired_name_is(name) {
                    warn!("tried to create filter '{}' with a delete pending", name);
                    return Err(FilterError::PendingDelete(name.to_string()));
                }
                cursor = snapshot.predecessor();
            }
        }

        let effective = custom_config.as_ref().unwrap_or(&self.config);
        let backend = self.provider.open(effective, name, true)?;
        let entry = Arc::new(FilterEntry::new(backend, custom_config, true));

        let mut map = head.map().clone();
        map.insert(name.to_string(), entry);
        self.publish(NameSpaceSnapshot::successor(&head, map));

        self.metrics.record_filter_created();
        info!("created filter '{}'", name);
        Ok(())
    }

    /// Remove the named filter and erase its backing store once reclaimed.
    /// Permanent.
    pub fn drop_filter(&self, name: &str) -> Result<(), FilterError> {
        let _mutator = self.write_lock.lock();

        let head = self.current();
        let entry = head
            .lookup_active(name)
            .ok_or_else(|| FilterError::NotFound(name.to_string()))?;

        // Visible immediately to readers still on this head
        entry.deactivate(true);

        let mut map = head.map().clone();
        map.remove(name);
        head.retire(entry);
        self.publish(NameSpaceSnapshot::successor(&head, map));

        self.metrics.record_filter_dropped();
        info!("dropped filter '{}'", name);
        Ok(())
    }

    /// Remove the named filter from the namespace, keeping its backing
    /// store; reclamation closes the payload instead of deleting it.
    /// Only permitted while the payload is proxied.
    pub fn clear_filter(&self, name: &str) -> Result<(), FilterError> {
        let _mutator = self.write_lock.lock();

        let head = self.current();
        let entry = head
            .lookup_active(name)
            .ok_or_else(|| FilterError::NotFound(name.to_string()))?;

        if !entry.backend().is_proxied() {
            return Err(FilterError::NotProxied(name.to_string()));
        }

        entry.deactivate(false);

        let mut map = head.map().clone();
        map.remove(name);
        head.retire(entry);
        self.publish(NameSpaceSnapshot::successor(&head, map));

        self.metrics.record_filter_cleared();
        info!("cleared filter '{}'", name);
        Ok(())
    }

    /// Release the named filter's memory while keeping it registered and
    /// its on-disk image intact. A later access faults it back in. Skipped
    /// for purely in-memory filters.
    pub fn unmap_filter(&self, name: &str) -> Result<(), FilterError> {
        let entry = self.lookup(name)?;
        if !entry.backend().in_memory_only() {
            entry.unmap()?;
        }
        Ok(())
    }

    /// Names of all active filters, optionally restricted to a prefix,
    /// in name order. Consistent with concurrent mutators: the list
    /// reflects exactly one namespace version.
    pub fn list_filters(&self, prefix: Option<&str>) -> Vec<String> {
        let head = self.current();
        let mut names = Vec::new();
        match prefix {
            Some(prefix) => {
                for (name, entry) in head.map().iter_prefix(prefix) {
                    if entry.is_active() {
                        names.push(name.to_string());
                    }
                }
            }
            None => {
                for (name, entry) in head.map().iter() {
                    if entry.is_active() {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names
    }

    /// Names of the cold filters: not accessed since the previous scan and
    /// not proxied. Clears the hot flag of every hot filter it examines.
    pub fn list_cold_filters(&self) -> Vec<String> {
        let head = self.current();
        let mut names = Vec::new();
        for (name, entry) in head.map().iter() {
            if entry.clear_hot() {
                continue;
            }
            if entry.backend().is_proxied() {
                continue;
            }
            names.push(name.to_string());
        }
        names
    }

    /// Run `f` with the named filter's payload, for out-of-band reads such
    /// as metrics. The entry cannot be reclaimed while the callback runs,
    /// but no lock is taken: the callback must not mutate filter state.
    pub fn with_filter<R>(
        &self,
        name: &str,
        f: impl FnOnce(&str, &dyn FilterBackend) -> R,
    ) -> Result<R, FilterError> {
        let entry = self.lookup(name)?;
        Ok(f(name, entry.backend()))
    }

    /// Force reclamation of every version behind the current head.
    ///
    /// Bypasses the checkpoint watermark, so it must not be called while
    /// worker threads are live; intended for embedded and test use.
    pub fn vacuum_now(&self) {
        let head = self.current();
        let _exclusion = self.vacuum_lock.lock();
        let (snapshots, entries) = vacuum::reclaim_older_than(&head, head.version());
        self.metrics.record_vacuum_pass(snapshots, entries);
    }

    /// One cadence tick of the background reclaimer
    pub(crate) fn vacuum_pass(&self) {
        let head = self.current();
        if head.predecessor().is_none() {
            return;
        }

        let min_version = self.clients.min_version(head.version());
        if head.version() - min_version > vacuum::WARN_THRESHOLD {
            warn!(
                "{} namespace versions awaiting reclamation (head {}, minimum observed {}); \
                 slow operations or missing checkpoints",
                head.version() - min_version,
                head.version(),
                min_version
            );
        }

        let _exclusion = self.vacuum_lock.lock();
        let (snapshots, entries) = vacuum::reclaim_older_than(&head, min_version);
        self.metrics.record_vacuum_pass(snapshots, entries);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.should_run.load(Ordering::SeqCst)
    }

    /// Stop the vacuum task and release every filter: live payloads are
    /// closed (never deleted), retired entries disposed per their flag,
    /// and the client registry cleared. Also runs on drop.
    pub fn shutdown(&self) {
        self.should_run.store(false, Ordering::SeqCst);
        if let Some(handle) = self.vacuum_thread.lock().take() {
            // Drop can fire on the vacuum thread itself when it holds the
            // last handle; joining there would wait on ourselves.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        self.teardown();
    }

    fn lookup(&self, name: &str) -> Result<Arc<FilterEntry>, FilterError> {
        self.current()
            .lookup_active(name)
            .ok_or_else(|| FilterError::NotFound(name.to_string()))
    }

    /// Install a new head. Caller holds the write-serialization lock.
    fn publish(&self, snapshot: Arc<NameSpaceSnapshot>) {
        debug!("installed namespace version {}", snapshot.version());
        *self.head.write() = snapshot;
    }

    /// Close every live payload, dispose retired entries per their delete
    /// flag, and clear the client registry. Runs once.
    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let head = self.current();
        for (_, entry) in head.map().iter() {
            entry.dispose_closing();
        }

        let mut cursor = Some(head);
        while let Some(snapshot) = cursor {
            if let Some(entry) = snapshot.take_retired() {
                entry.dispose();
            }
            cursor = snapshot.take_predecessor();
        }

        self.clients.clear();
    }
}

impl<P: FilterProvider + 'static> FilterManager<P> {
    /// Build a manager and start its vacuum task
    pub fn open(config: FilterConfig, provider: P) -> Result<Arc<Self>, FilterError> {
        let manager = Arc::new(Self::new(config, provider)?);
        manager.spawn_vacuum()?;
        Ok(manager)
    }

    /// Start the background vacuum task, if not already running. The task
    /// holds only a weak handle, so dropping the manager stops it too.
    pub fn spawn_vacuum(self: &Arc<Self>) -> Result<(), FilterError> {
        let mut slot = self.vacuum_thread.lock();
        if slot.is_some() {
            return Ok(());
        }

        let weak = Arc::downgrade(self);
        let interval = self.config.vacuum_interval();
        let handle = thread::Builder::new()
            .name("filtmgr-vacuum".to_string())
            .spawn(move || vacuum::run_loop(weak, interval))
            .map_err(crate::error::BackendError::from)?;
        *slot = Some(handle);
        Ok(())
    }
}

impl<P: FilterProvider> Drop for FilterManager<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
