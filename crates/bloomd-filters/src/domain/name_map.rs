//! Ordered name to entry map
//!
//! The container behind every namespace snapshot. `Clone` is the snapshot
//! copy operation: an independent map sharing the same entry handles, after
//! which the copy and the original mutate independently.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use crate::domain::entry::FilterEntry;

/// Ordered mapping from filter name to entry
#[derive(Clone, Default)]
pub struct NameMap {
    entries: BTreeMap<String, Arc<FilterEntry>>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point lookup, exact name match
    pub fn get(&self, name: &str) -> Option<&Arc<FilterEntry>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn insert(&mut self, name: String, entry: Arc<FilterEntry>) -> Option<Arc<FilterEntry>> {
        self.entries.insert(name, entry)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<FilterEntry>> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate all entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<FilterEntry>)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Iterate the entries whose name starts with `prefix`, in name order
    pub fn iter_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Arc<FilterEntry>)> + 'a {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(name, _)| name.starts_with(prefix))
            .map(|(name, entry)| (name.as_str(), entry))
    }
}
