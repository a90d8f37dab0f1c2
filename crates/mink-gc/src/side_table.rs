//! Identity-keyed auxiliary storage.
//!
//! A `SideTable` associates values with objects by handle identity without
//! adding property slots to the objects themselves. Keys are held weakly: an
//! entry whose object has been dropped reads as absent, and `compact` reclaims
//! the storage. Address reuse is safe because a live upgrade proves the
//! original key still owns its address.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::handle::{GcRef, WeakRef};

struct Entry<T, V> {
    key: WeakRef<T>,
    value: V,
}

/// Weak, identity-keyed map from object handles to values.
pub struct SideTable<T, V> {
    entries: RwLock<FxHashMap<usize, Entry<T, V>>>,
}

impl<T, V> SideTable<T, V> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Associate `value` with `key`, returning the previous value if the same
    /// live object already had one.
    pub fn insert(&self, key: &GcRef<T>, value: V) -> Option<V> {
        let mut entries = self.entries.write();
        let previous = entries.insert(
            key.as_ptr() as usize,
            Entry {
                key: key.downgrade(),
                value,
            },
        );
        previous.and_then(|entry| {
            // A stale entry under a reused address is not a real replacement.
            entry.key.upgrade().map(|_| entry.value)
        })
    }

    /// Look up the value for `key`.
    pub fn get(&self, key: &GcRef<T>) -> Option<V>
    where
        V: Clone,
    {
        let entries = self.entries.read();
        let entry = entries.get(&(key.as_ptr() as usize))?;
        match entry.key.upgrade() {
            Some(live) if live.ptr_eq(key) => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Whether `key` has an associated value.
    pub fn contains(&self, key: &GcRef<T>) -> bool {
        let entries = self.entries.read();
        match entries.get(&(key.as_ptr() as usize)) {
            Some(entry) => matches!(entry.key.upgrade(), Some(live) if live.ptr_eq(key)),
            None => false,
        }
    }

    /// Remove and return the value for `key`.
    pub fn remove(&self, key: &GcRef<T>) -> Option<V> {
        let mut entries = self.entries.write();
        let entry = entries.remove(&(key.as_ptr() as usize))?;
        match entry.key.upgrade() {
            Some(live) if live.ptr_eq(key) => Some(entry.value),
            _ => None,
        }
    }

    /// Number of entries whose object is still alive.
    pub fn len(&self) -> usize {
        let entries = self.entries.read();
        entries
            .values()
            .filter(|entry| entry.key.upgrade().is_some())
            .count()
    }

    /// Whether no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose object has been collected, returning how many were
    /// reclaimed.
    pub fn compact(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.key.upgrade().is_some());
        before - entries.len()
    }
}

impl<T, V> Default for SideTable<T, V> {
    fn default() -> Self {
        Self::new()
    }
}
