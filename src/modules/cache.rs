//! Loader Cache
//!
//! Memoizes module instances by canonical path so that every requester of a
//! module shares one instance until the entry is evicted.
//!
//! Each stored instance is stamped with a load generation. Generations only
//! grow, so a fresh load of the same path is always distinguishable from the
//! instance it replaced.

use std::collections::HashMap;

use super::path::CanonicalPath;
use crate::value::Value;

/// A memoized module instance.
#[derive(Clone, Debug)]
pub struct CachedModule {
    /// The module's exports.
    exports: Value,

    /// Load generation this instance was created in.
    generation: u64,
}

impl CachedModule {
    pub fn exports(&self) -> &Value {
        &self.exports
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Canonical path → module instance.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: HashMap<CanonicalPath, CachedModule>,

    /// Generation handed to the next stored instance.
    next_generation: u64,

    /// Number of successful evictions, for diagnostics.
    evictions: u64,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly loaded instance, returning its generation.
    pub fn insert(&mut self, path: CanonicalPath, exports: Value) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.entries.insert(path, CachedModule { exports, generation });
        generation
    }

    pub fn get(&self, path: &CanonicalPath) -> Option<&CachedModule> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &CanonicalPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Drop the instance at `path`. Returns whether one was present.
    pub fn evict(&mut self, path: &CanonicalPath) -> bool {
        let removed = self.entries.remove(path).is_some();
        if removed {
            self.evictions += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.evictions += self.entries.len() as u64;
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}
