//! Module Host Infrastructure
//!
//! This module provides the lazily-loaded module graph that substitution
//! operates on:
//! - `CanonicalPath` - Resolved module identity
//! - `ModuleGraph` - Module definitions (factories and data)
//! - `Resolver` - Specifier resolution (relative, absolute, built-in, packages)
//! - `ModuleCache` - Memoized instances with load generations
//! - `Runtime` - The host: load entry point, cache control, load-hook slot

mod cache;
mod graph;
mod loader;
mod path;
mod resolver;

pub use cache::{CachedModule, ModuleCache};
pub use graph::{DefinitionError, ModuleFactory, ModuleGraph, ModuleSource};
pub use loader::{LoadError, LoadHook, LoadRequest, LoadResult, ModuleScope, Runtime};
pub use path::{
    ancestor_directories, is_absolute_specifier, is_relative_specifier, join_paths,
    normalize_absolute_path, parent_directory, CanonicalPath, BUILTIN_PREFIX,
};
pub use resolver::{ResolutionError, Resolver};
