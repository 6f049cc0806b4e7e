//! Module Loader
//!
//! `Runtime` is the module host. It owns:
//! - The module graph (what can be loaded)
//! - The loader cache (what has been loaded)
//! - One loading stack per thread (cycle detection)
//! - One load-hook slot
//!
//! # Load Entry Point
//!
//! Every load, whether a top-level `load` or a `require` made from inside a
//! module body, goes through `require_from`:
//!
//! 1. Resolve the specifier relative to the requester
//! 2. Offer the request to the installed hook; a value it returns is the
//!    result, and neither the cache nor the module body is touched
//! 3. Otherwise return the cached instance, or run the module body and cache
//!    its exports
//!
//! Locks are released before a module body runs, so bodies may `require`
//! freely.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::cache::ModuleCache;
use super::graph::{ModuleGraph, ModuleSource};
use super::path::CanonicalPath;
use super::resolver::{ResolutionError, Resolver};
use crate::config::HostConfig;
use crate::stub::CallError;
use crate::value::Value;

/// Result type for module loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors that can occur during module loading.
#[derive(Debug, Clone)]
pub enum LoadError {
    /// A specifier did not name any module.
    Resolution(ResolutionError),
    /// A module required itself, directly or through its dependencies,
    /// before its body finished.
    CircularImport(Vec<CanonicalPath>),
    /// The path resolved but its definition was removed before loading.
    Missing(CanonicalPath),
    /// A module body reported a failure.
    Factory { path: CanonicalPath, message: String },
    /// A function called while a module body ran raised an error.
    Call(CallError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Resolution(err) => write!(f, "{}", err),
            LoadError::CircularImport(chain) => {
                let rendered: Vec<&str> = chain.iter().map(|p| p.as_str()).collect();
                write!(f, "Circular import detected: {}", rendered.join(" -> "))
            }
            LoadError::Missing(path) => write!(f, "Module '{}' is no longer defined", path),
            LoadError::Factory { path, message } => {
                write!(f, "Failed to load '{}': {}", path, message)
            }
            LoadError::Call(err) => write!(f, "Module body raised: {}", err),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<ResolutionError> for LoadError {
    fn from(err: ResolutionError) -> Self {
        LoadError::Resolution(err)
    }
}

impl From<CallError> for LoadError {
    fn from(err: CallError) -> Self {
        LoadError::Call(err)
    }
}

/// A single load request as seen by a hook.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// The specifier as written by the requester.
    pub specifier: &'a str,
    /// Canonical identity the specifier resolved to.
    pub resolved: &'a CanonicalPath,
    /// The module making the request; `None` for top-level loads.
    pub requester: Option<&'a CanonicalPath>,
}

/// A process-wide interception point wrapped around the load entry point.
pub trait LoadHook: Send + Sync {
    /// Return `Some(value)` to answer the request without loading, or `None`
    /// to let the real loader handle it unchanged.
    fn intercept(&self, request: &LoadRequest<'_>) -> Option<Value>;
}

/// The scope a module body runs in.
pub struct ModuleScope<'r> {
    runtime: &'r Runtime,
    path: CanonicalPath,
}

impl<'r> ModuleScope<'r> {
    fn new(runtime: &'r Runtime, path: CanonicalPath) -> Self {
        Self { runtime, path }
    }

    /// Load a dependency of this module.
    pub fn require(&mut self, specifier: &str) -> LoadResult<Value> {
        self.runtime.require_from(specifier, Some(&self.path))
    }

    /// This module's canonical identity.
    pub fn filename(&self) -> &CanonicalPath {
        &self.path
    }

    /// Directory containing this module.
    pub fn dirname(&self) -> String {
        self.path.dirname()
    }

    /// Report a module body failure.
    pub fn fail(&self, message: impl Into<String>) -> LoadError {
        LoadError::Factory {
            path: self.path.clone(),
            message: message.into(),
        }
    }
}

/// The module host.
pub struct Runtime {
    config: HostConfig,
    graph: RwLock<ModuleGraph>,
    cache: Mutex<ModuleCache>,
    /// Modules whose bodies are running, per loading thread. Another
    /// thread loading the same module is not a cycle.
    loading: Mutex<HashMap<ThreadId, Vec<CanonicalPath>>>,
    hook: OnceLock<Arc<dyn LoadHook>>,
}

impl Runtime {
    pub fn new(config: HostConfig) -> Self {
        let graph = ModuleGraph::new(config.root.clone());
        Self {
            config,
            graph: RwLock::new(graph),
            cache: Mutex::new(ModuleCache::new()),
            loading: Mutex::new(HashMap::new()),
            hook: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Edit the module graph.
    pub fn define_modules<R>(&self, edit: impl FnOnce(&mut ModuleGraph) -> R) -> R {
        edit(&mut self.graph.write())
    }

    /// Define a module whose body runs on every fresh load.
    pub fn define<F>(&self, path: &str, factory: F) -> CanonicalPath
    where
        F: Fn(&mut ModuleScope<'_>) -> LoadResult<Value> + Send + Sync + 'static,
    {
        self.graph.write().define(path, factory)
    }

    /// Define a module that exports a fixed value.
    pub fn define_value(&self, path: &str, exports: Value) -> CanonicalPath {
        self.graph.write().define_value(path, exports)
    }

    /// Install the load hook. The first install wins; later calls are no-ops
    /// and return `false`.
    pub fn install_hook(&self, hook: Arc<dyn LoadHook>) -> bool {
        self.hook.set(hook).is_ok()
    }

    pub fn has_hook(&self) -> bool {
        self.hook.get().is_some()
    }

    /// Resolve with an explicit base directory and requester context.
    pub fn resolve(
        &self,
        specifier: &str,
        base_dir: &str,
        requester: Option<&CanonicalPath>,
    ) -> Result<CanonicalPath, ResolutionError> {
        let graph = self.graph.read();
        Resolver::new(&graph, &self.config).resolve(specifier, base_dir, requester)
    }

    /// Resolve as a load request from `requester` would.
    pub fn resolve_from(
        &self,
        specifier: &str,
        requester: Option<&CanonicalPath>,
    ) -> Result<CanonicalPath, ResolutionError> {
        let graph = self.graph.read();
        Resolver::new(&graph, &self.config).resolve_from(specifier, requester)
    }

    /// The load entry point: resolve, offer to the hook, then load.
    pub fn require_from(
        &self,
        specifier: &str,
        requester: Option<&CanonicalPath>,
    ) -> LoadResult<Value> {
        let resolved = self.resolve_from(specifier, requester)?;
        self.dispatch(LoadRequest {
            specifier,
            resolved: &resolved,
            requester,
        })
    }

    /// Top-level load of an already canonical path.
    pub fn load(&self, path: &CanonicalPath) -> LoadResult<Value> {
        self.dispatch(LoadRequest {
            specifier: path.as_str(),
            resolved: path,
            requester: None,
        })
    }

    fn dispatch(&self, request: LoadRequest<'_>) -> LoadResult<Value> {
        if let Some(hook) = self.hook.get() {
            if let Some(value) = hook.intercept(&request) {
                return Ok(value);
            }
        }
        self.load_resolved(request.resolved)
    }

    fn load_resolved(&self, path: &CanonicalPath) -> LoadResult<Value> {
        if let Some(cached) = self.cache.lock().get(path) {
            trace!(target: "mocktron::loader", path = %path, generation = cached.generation(), "Cache hit");
            return Ok(cached.exports().clone());
        }

        {
            let mut loading = self.loading.lock();
            let stack = loading.entry(thread::current().id()).or_default();
            if let Some(start) = stack.iter().position(|p| p == path) {
                let mut chain = stack[start..].to_vec();
                chain.push(path.clone());
                return Err(LoadError::CircularImport(chain));
            }
            stack.push(path.clone());
        }

        let source = self.graph.read().get(path).cloned();
        let result = match source {
            Some(ModuleSource::Factory(factory)) => {
                let mut scope = ModuleScope::new(self, path.clone());
                factory(&mut scope)
            }
            Some(ModuleSource::Data(exports)) => Ok(exports),
            None => Err(LoadError::Missing(path.clone())),
        };

        self.unwind(path);

        let exports = result?;
        let generation = self.cache.lock().insert(path.clone(), exports.clone());
        trace!(target: "mocktron::loader", path = %path, generation, "Loaded module");
        Ok(exports)
    }

    fn unwind(&self, path: &CanonicalPath) {
        let mut loading = self.loading.lock();
        let id = thread::current().id();
        if let Some(stack) = loading.get_mut(&id) {
            stack.retain(|p| p != path);
            if stack.is_empty() {
                loading.remove(&id);
            }
        }
    }

    /// Drop the cached instance at `path`, forcing the next load to run the
    /// module body again.
    pub fn evict(&self, path: &CanonicalPath) -> bool {
        self.cache.lock().evict(path)
    }

    /// Drop every cached instance.
    pub fn clear_cache(&self) {
        self.cache.lock().clear()
    }

    pub fn is_cached(&self, path: &CanonicalPath) -> bool {
        self.cache.lock().contains(path)
    }

    /// Load generation of the cached instance at `path`.
    pub fn generation(&self, path: &CanonicalPath) -> Option<u64> {
        self.cache.lock().get(path).map(|m| m.generation())
    }

    pub fn cached_count(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn eviction_count(&self) -> u64 {
        self.cache.lock().evictions()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("root", &self.config.root)
            .field("module_count", &self.graph.read().len())
            .field("cached_count", &self.cache.lock().len())
            .field("hooked", &self.has_hook())
            .finish()
    }
}
