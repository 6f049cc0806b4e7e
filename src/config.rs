//! Host Configuration
//!
//! Controls how specifiers are resolved and whether the debug trace is on.
//!
//! ## File Format (`mocktron.toml`)
//!
//! ```toml
//! root = "/"
//! extensions = [".mod", ".data"]
//! index_name = "index"
//! package_dir = "packages"
//! debug = false
//! color = true
//! ```
//!
//! Lookup order for `HostConfig::load(dir)`:
//! 1. `<dir>/mocktron.toml`
//! 2. `<user config dir>/mocktron/config.toml`
//! 3. Built-in defaults
//!
//! Environment overrides are applied last: `MOCKTRON_DEBUG` turns the trace
//! on, `NO_COLOR` turns decorations off. A host built from a config with
//! `debug` on installs the stderr subscriber (see `debug::init`).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// Environment variable that enables the load/substitution trace.
pub const DEBUG_ENV: &str = "MOCKTRON_DEBUG";

/// Environment variable that disables text decorations.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "mocktron.toml";

/// Resolution and diagnostics settings for a module host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory that anchors non-absolute definitions and caller locations.
    pub root: String,

    /// Extensions tried, in order, after the exact path.
    pub extensions: Vec<String>,

    /// File stem of a directory's entry module (`<dir>/<index_name><ext>`).
    pub index_name: String,

    /// Directory searched in every ancestor for bare specifiers.
    pub package_dir: String,

    /// Emit the load/substitution trace.
    pub debug: bool,

    /// Decorate trace text with terminal colors.
    pub color: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            root: "/".to_string(),
            extensions: vec![".mod".to_string(), ".data".to_string()],
            index_name: "index".to_string(),
            package_dir: "packages".to_string(),
            debug: false,
            color: true,
        }
    }
}

impl HostConfig {
    /// Parse a configuration from TOML text.
    pub fn parse(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Load configuration for a project directory, falling back to the user
    /// configuration file and then to defaults. Environment overrides apply
    /// in every case.
    pub fn load(project_dir: &Path) -> Self {
        let candidates = [
            Some(project_dir.join(CONFIG_FILE_NAME)),
            user_config_path(),
        ];

        let mut config = candidates
            .into_iter()
            .flatten()
            .find_map(|path| read_config_file(&path))
            .unwrap_or_default();
        config.apply_env();
        config
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply `MOCKTRON_DEBUG` and `NO_COLOR`.
    pub fn apply_env(&mut self) {
        if env_flag(DEBUG_ENV) {
            self.debug = true;
        }
        if std::env::var_os(NO_COLOR_ENV).is_some() {
            self.color = false;
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// True when the variable is set to anything except empty, `0` or `false`.
pub fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(v) => !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false")),
        Err(_) => false,
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mocktron").join("config.toml"))
}

fn read_config_file(path: &Path) -> Option<HostConfig> {
    let source = std::fs::read_to_string(path).ok()?;
    match HostConfig::parse(&source) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(
                target: "mocktron::config",
                path = %path.display(),
                error = %e,
                "Ignoring malformed configuration file"
            );
            None
        }
    }
}
