//! Diagnostic Output
//!
//! The load/substitution trace is ordinary `tracing` output. `init` installs
//! a stderr subscriber when the host configuration has `debug` on, whether it
//! came from `mocktron.toml` or `MOCKTRON_DEBUG`, unless the embedding test
//! binary already installed one.
//!
//! `Style` decorates trace text. Decorations carry no meaning: with colors
//! off every helper returns its input unchanged.

use tracing::Level;

use crate::config::HostConfig;

const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const GRAY: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Install the stderr debug subscriber if `config.debug` is on.
///
/// Returns `true` only when this call installed it; a process keeps the first
/// global subscriber it gets.
pub fn init(config: &HostConfig) -> bool {
    if !config.debug {
        return false;
    }
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Text decoration helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    enabled: bool,
}

impl Style {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn bold(&self, text: &str) -> String {
        self.wrap(BOLD, text)
    }

    pub fn green(&self, text: &str) -> String {
        self.wrap(GREEN, text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.wrap(YELLOW, text)
    }

    pub fn gray(&self, text: &str) -> String {
        self.wrap(GRAY, text)
    }

    fn wrap(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}
