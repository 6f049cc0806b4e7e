//! Substitution Registry
//!
//! Pending substitutions keyed by the canonical path of the dependency they
//! replace. An entry fires at most once, and only for the module that owns it.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::modules::CanonicalPath;
use crate::value::Value;

/// A pending replacement for one dependency of one module.
#[derive(Debug, Clone)]
pub struct SubstitutionEntry {
    /// The specifier as the test wrote it, for diagnostics.
    pub specifier: String,
    /// What the owner receives instead of the real module.
    pub replacement: Value,
    /// The only requester this entry applies to.
    pub owner: CanonicalPath,
}

#[derive(Debug)]
struct Pending {
    entry: SubstitutionEntry,
    /// Registration order, so diagnostics list specifiers as written.
    seq: u64,
}

#[derive(Debug, Default)]
struct Entries {
    by_path: HashMap<CanonicalPath, Pending>,
    next_seq: u64,
}

/// Canonical path → pending substitution.
#[derive(Debug, Default)]
pub struct SubstitutionRegistry {
    entries: Mutex<Entries>,
}

impl SubstitutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any unconsumed entry for the same path.
    /// Returns the replaced entry.
    pub fn register(&self, path: CanonicalPath, entry: SubstitutionEntry) -> Option<SubstitutionEntry> {
        let mut entries = self.entries.lock();
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries
            .by_path
            .insert(path, Pending { entry, seq })
            .map(|previous| previous.entry)
    }

    /// Take the replacement for `path` if `requester` owns it.
    ///
    /// Any other requester gets `None` and the entry stays pending for its
    /// owner.
    pub fn try_consume(&self, path: &CanonicalPath, requester: &CanonicalPath) -> Option<Value> {
        let mut entries = self.entries.lock();
        let owned = entries
            .by_path
            .get(path)
            .is_some_and(|pending| pending.entry.owner == *requester);
        if !owned {
            return None;
        }
        entries
            .by_path
            .remove(path)
            .map(|pending| pending.entry.replacement)
    }

    /// Owner of the pending entry at `path`, if any.
    pub fn owner_of(&self, path: &CanonicalPath) -> Option<CanonicalPath> {
        self.entries
            .lock()
            .by_path
            .get(path)
            .map(|pending| pending.entry.owner.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().by_path.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().by_path.len()
    }

    /// Specifiers of every pending entry, in registration order.
    pub fn pending_specifiers(&self) -> Vec<String> {
        let entries = self.entries.lock();
        let mut pending: Vec<&Pending> = entries.by_path.values().collect();
        pending.sort_by_key(|p| p.seq);
        pending.iter().map(|p| p.entry.specifier.clone()).collect()
    }

    /// Remove every pending entry owned by `owner`, in registration order.
    pub fn withdraw_owned_by(&self, owner: &CanonicalPath) -> Vec<SubstitutionEntry> {
        let mut entries = self.entries.lock();
        let paths: Vec<CanonicalPath> = entries
            .by_path
            .iter()
            .filter(|(_, pending)| pending.entry.owner == *owner)
            .map(|(path, _)| path.clone())
            .collect();

        let mut withdrawn: Vec<Pending> = paths
            .iter()
            .filter_map(|path| entries.by_path.remove(path))
            .collect();
        withdrawn.sort_by_key(|p| p.seq);
        withdrawn.into_iter().map(|p| p.entry).collect()
    }

    /// Drop every pending entry.
    pub fn clear(&self) {
        self.entries.lock().by_path.clear();
    }
}
