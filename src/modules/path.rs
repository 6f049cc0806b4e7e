//! Module Path Utilities
//!
//! Module identities are plain `/`-separated absolute paths, independent of
//! the host filesystem. Supported specifier notations:
//! - `./child`, `../sibling`, `.`, `..` - Relative to the requesting module's directory
//! - `/absolute/path` - Absolute within the module graph
//! - `bare-name` or `bare-name/sub` - Built-in or package lookup

use std::fmt;

/// Prefix used for built-in module identities.
pub const BUILTIN_PREFIX: &str = "builtin:";

/// The resolved, canonical identity of a module.
///
/// Two specifiers that reach the same module always produce equal
/// `CanonicalPath`s, so this is the key for caching and substitution.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// Build a canonical path from an absolute path, normalizing `.`/`..`
    /// segments and duplicate separators.
    pub fn new(path: &str) -> Self {
        Self(normalize_absolute_path(path))
    }

    /// Identity of a built-in module.
    pub fn builtin(name: &str) -> Self {
        Self(format!("{}{}", BUILTIN_PREFIX, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_builtin(&self) -> bool {
        self.0.starts_with(BUILTIN_PREFIX)
    }

    /// Directory containing this module. Built-ins live at the root.
    pub fn dirname(&self) -> String {
        if self.is_builtin() {
            return "/".to_string();
        }
        parent_directory(&self.0)
    }

    /// Last path segment (file name) of the module.
    pub fn file_name(&self) -> &str {
        if let Some(name) = self.0.strip_prefix(BUILTIN_PREFIX) {
            return name;
        }
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// True for specifiers that resolve against the requester's directory.
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// True for specifiers anchored at the graph root.
pub fn is_absolute_specifier(specifier: &str) -> bool {
    specifier.starts_with('/')
}

/// Collapse `.`, `..` and empty segments. The result always starts with `/`
/// and never ends with one (except the root itself).
pub fn normalize_absolute_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            value => stack.push(value),
        }
    }

    if stack.is_empty() {
        return "/".to_string();
    }

    format!("/{}", stack.join("/"))
}

/// Join `child` onto `base`. An absolute child replaces the base.
pub fn join_paths(base: &str, child: &str) -> String {
    if child.starts_with('/') {
        return child.to_string();
    }

    if base.ends_with('/') {
        format!("{base}{child}")
    } else {
        format!("{base}/{child}")
    }
}

/// Parent directory of a normalized absolute path.
pub fn parent_directory(path: &str) -> String {
    let normalized = normalize_absolute_path(path);
    if normalized == "/" {
        return normalized;
    }

    match normalized.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => normalized[..index].to_string(),
    }
}

/// All ancestors of `dir`, nearest first, ending with `/`.
///
/// # Examples
/// - `"/a/b"` -> `["/a/b", "/a", "/"]`
pub fn ancestor_directories(dir: &str) -> Vec<String> {
    let mut current = normalize_absolute_path(dir);
    let mut ancestors = vec![current.clone()];
    while current != "/" {
        current = parent_directory(&current);
        ancestors.push(current.clone());
    }
    ancestors
}
