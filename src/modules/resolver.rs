//! Specifier Resolution
//!
//! Maps a specifier written by a module to the canonical identity of the
//! module it names. Lookup rules:
//!
//! 1. **Relative** (`./x`, `../x`, `.`, `..`): joined onto the base directory
//! 2. **Absolute** (`/x`): used as-is
//! 3. **Bare** (`name`, `name/sub`): a built-in of that name, otherwise
//!    `<ancestor>/<package_dir>/<name>` for each ancestor directory of the
//!    requester, nearest first
//!
//! Every absolute base found this way is expanded into candidates: the exact
//! path, then `<path><ext>` for each configured extension, then
//! `<path>/<index_name><ext>`. The first candidate defined in the graph wins.

use std::collections::BTreeSet;
use std::fmt;

use super::graph::ModuleGraph;
use super::path::{
    ancestor_directories, is_absolute_specifier, is_relative_specifier, join_paths,
    normalize_absolute_path, CanonicalPath,
};
use crate::config::HostConfig;

/// A specifier that does not name any module in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    /// The specifier as written.
    pub specifier: String,
    /// Directory the lookup was anchored at.
    pub base: String,
    /// Every candidate path that was checked, in order.
    pub tried: Vec<String>,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot find module '{}' from '{}'",
            self.specifier, self.base
        )?;
        if !self.tried.is_empty() {
            write!(f, " (tried: {})", self.tried.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionError {}

/// Stateless view combining a graph with the lookup settings.
pub struct Resolver<'a> {
    graph: &'a ModuleGraph,
    config: &'a HostConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(graph: &'a ModuleGraph, config: &'a HostConfig) -> Self {
        Self { graph, config }
    }

    /// Resolve `specifier` with an explicit base directory and requester.
    ///
    /// Relative specifiers are anchored at `base_dir`; bare specifiers search
    /// package directories above the requester (or above the root when there
    /// is no requester).
    pub fn resolve(
        &self,
        specifier: &str,
        base_dir: &str,
        requester: Option<&CanonicalPath>,
    ) -> Result<CanonicalPath, ResolutionError> {
        let mut tried = Vec::new();
        let directory_only = names_directory(specifier);

        if is_relative_specifier(specifier) {
            let base = normalize_absolute_path(&join_paths(base_dir, specifier));
            if let Some(found) = self.lookup(&base, directory_only, &mut tried) {
                return Ok(found);
            }
            return Err(self.not_found(specifier, base_dir, tried));
        }

        if is_absolute_specifier(specifier) {
            let base = normalize_absolute_path(specifier);
            if let Some(found) = self.lookup(&base, directory_only, &mut tried) {
                return Ok(found);
            }
            return Err(self.not_found(specifier, "/", tried));
        }

        if specifier.trim().is_empty() {
            return Err(self.not_found(specifier, base_dir, tried));
        }

        if self.graph.contains_builtin(specifier) {
            return Ok(CanonicalPath::builtin(specifier));
        }

        let anchor = match requester {
            Some(path) => path.dirname(),
            None => normalize_absolute_path(&self.config.root),
        };
        for dir in ancestor_directories(&anchor) {
            let packages = join_paths(&dir, &self.config.package_dir);
            let base = normalize_absolute_path(&join_paths(&packages, specifier));
            if let Some(found) = self.lookup(&base, directory_only, &mut tried) {
                return Ok(found);
            }
        }

        Err(self.not_found(specifier, &anchor, tried))
    }

    /// Resolve a specifier the way a load request from `requester` would:
    /// its own directory is both the base and the search anchor.
    pub fn resolve_from(
        &self,
        specifier: &str,
        requester: Option<&CanonicalPath>,
    ) -> Result<CanonicalPath, ResolutionError> {
        let base_dir = match requester {
            Some(path) => path.dirname(),
            None => normalize_absolute_path(&self.config.root),
        };
        self.resolve(specifier, &base_dir, requester)
    }

    fn lookup(
        &self,
        base: &str,
        directory_only: bool,
        tried: &mut Vec<String>,
    ) -> Option<CanonicalPath> {
        for candidate in self.candidate_paths(base, directory_only) {
            if self.graph.contains_str(&candidate) {
                return Some(CanonicalPath::new(&candidate));
            }
            tried.push(candidate);
        }
        None
    }

    /// Files first (exact, then each extension), then the directory index.
    /// A directory-only specifier skips the file candidates.
    fn candidate_paths(&self, base: &str, directory_only: bool) -> Vec<String> {
        let mut candidates = Vec::new();
        let mut seen = BTreeSet::new();

        let mut push = |candidate: String| {
            if seen.insert(candidate.clone()) {
                candidates.push(candidate);
            }
        };

        if !directory_only {
            push(base.to_string());
            for ext in &self.config.extensions {
                push(format!("{base}{ext}"));
            }
        }
        let index = join_paths(base, &self.config.index_name);
        for ext in &self.config.extensions {
            push(format!("{index}{ext}"));
        }

        candidates
    }

    fn not_found(&self, specifier: &str, base: &str, tried: Vec<String>) -> ResolutionError {
        ResolutionError {
            specifier: specifier.to_string(),
            base: base.to_string(),
            tried,
        }
    }
}

/// True for specifiers that can only name a directory: a trailing `/`, or a
/// final `.`/`..` segment.
fn names_directory(specifier: &str) -> bool {
    specifier.ends_with('/')
        || matches!(specifier.rsplit('/').next(), Some(".") | Some(".."))
}
