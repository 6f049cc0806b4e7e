//! Module Graph
//!
//! The set of module definitions a host can load, keyed by canonical path.
//! A definition is either a factory (a module body that runs on every fresh
//! load and may `require` its own dependencies) or a fixed data value.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::loader::{LoadResult, ModuleScope};
use super::path::{join_paths, CanonicalPath};
use crate::value::Value;

/// Signature of a module body.
///
/// The factory receives the module's scope (its own identity and the
/// `require` entry point) and returns the module's exports.
pub type ModuleFactory = dyn Fn(&mut ModuleScope<'_>) -> LoadResult<Value> + Send + Sync;

/// How a module produces its exports.
#[derive(Clone)]
pub enum ModuleSource {
    /// Runs the body on each fresh (uncached) load.
    Factory(Arc<ModuleFactory>),
    /// Exports a fixed value.
    Data(Value),
}

impl fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::Factory(_) => write!(f, "Factory"),
            ModuleSource::Data(v) => write!(f, "Data({})", v),
        }
    }
}

/// Error returned when a data module's TOML source does not parse.
#[derive(Debug, Clone)]
pub struct DefinitionError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid module definition '{}': {}", self.path, self.message)
    }
}

impl std::error::Error for DefinitionError {}

/// Module definitions by canonical path.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    root: String,
    modules: BTreeMap<CanonicalPath, ModuleSource>,
}

impl ModuleGraph {
    /// Create an empty graph. Relative definition paths are anchored at `root`.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            modules: BTreeMap::new(),
        }
    }

    /// Canonical identity a definition path maps to.
    pub fn canonical(&self, path: &str) -> CanonicalPath {
        CanonicalPath::new(&join_paths(&self.root, path))
    }

    /// Define a module whose body runs on every fresh load.
    pub fn define<F>(&mut self, path: &str, factory: F) -> CanonicalPath
    where
        F: Fn(&mut ModuleScope<'_>) -> LoadResult<Value> + Send + Sync + 'static,
    {
        let canonical = self.canonical(path);
        self.modules
            .insert(canonical.clone(), ModuleSource::Factory(Arc::new(factory)));
        canonical
    }

    /// Define a module that exports a fixed value.
    pub fn define_value(&mut self, path: &str, exports: Value) -> CanonicalPath {
        let canonical = self.canonical(path);
        self.modules
            .insert(canonical.clone(), ModuleSource::Data(exports));
        canonical
    }

    /// Define a data module from TOML text; its exports are the parsed table.
    pub fn define_toml(&mut self, path: &str, source: &str) -> Result<CanonicalPath, DefinitionError> {
        let table: toml::Value = toml::from_str(source).map_err(|e| DefinitionError {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(self.define_value(path, Value::from(table)))
    }

    /// Define a built-in module, reachable by its bare name from anywhere.
    pub fn define_builtin<F>(&mut self, name: &str, factory: F) -> CanonicalPath
    where
        F: Fn(&mut ModuleScope<'_>) -> LoadResult<Value> + Send + Sync + 'static,
    {
        let canonical = CanonicalPath::builtin(name);
        self.modules
            .insert(canonical.clone(), ModuleSource::Factory(Arc::new(factory)));
        canonical
    }

    /// Remove a definition. Cached instances are not affected.
    pub fn undefine(&mut self, path: &CanonicalPath) -> bool {
        self.modules.remove(path).is_some()
    }

    pub fn contains(&self, path: &CanonicalPath) -> bool {
        self.modules.contains_key(path)
    }

    /// True when a module exists at this exact (already normalized) path.
    pub fn contains_str(&self, path: &str) -> bool {
        self.modules.contains_key(&CanonicalPath::new(path))
    }

    pub fn contains_builtin(&self, name: &str) -> bool {
        self.modules.contains_key(&CanonicalPath::builtin(name))
    }

    pub fn get(&self, path: &CanonicalPath) -> Option<&ModuleSource> {
        self.modules.get(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &CanonicalPath> {
        self.modules.keys()
    }
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new("/")
    }
}
