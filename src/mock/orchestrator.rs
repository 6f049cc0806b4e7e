//! Mock Orchestration
//!
//! `Mocker` loads a module under test with some of its direct dependencies
//! replaced:
//!
//! 1. Resolve the target relative to the caller
//! 2. Resolve each replacement specifier as the target would, and register it
//!    with the target as owner
//! 3. Evict the target so its body runs again under the substitutions
//! 4. Load the target; each of its own `require`s passes the interceptor
//! 5. Fail if any replacement was never requested
//! 6. Evict the target again so no later load sees the mocked instance
//!
//! # Usage Constraints
//!
//! The registry and the installed hook are process-wide state. Orchestrations
//! are synchronous and must not overlap on the same dependency paths; tests
//! that share the global mocker should not run concurrently.

use std::fmt;
use std::panic::Location;
use std::sync::{Arc, OnceLock};

use itertools::Itertools;
use tracing::debug;

use super::interceptor::LoadInterceptor;
use super::registry::{SubstitutionEntry, SubstitutionRegistry};
use crate::config::HostConfig;
use crate::debug::Style;
use crate::modules::{join_paths, CanonicalPath, LoadError, ResolutionError, Runtime};
use crate::value::Value;

/// Errors from `mock_load`.
#[derive(Debug, Clone)]
pub enum MockError {
    /// The target or a replacement specifier did not resolve.
    Resolution(ResolutionError),
    /// Loading the target failed.
    Load(LoadError),
    /// Replacements the target never requested.
    StaleMock {
        target: String,
        specifiers: Vec<String>,
    },
    /// The runtime already carries a hook from another interceptor.
    HookConflict,
}

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockError::Resolution(err) => write!(f, "{}", err),
            MockError::Load(err) => write!(f, "{}", err),
            MockError::StaleMock { target, specifiers } => write!(
                f,
                "The following imports were not found in {}: {}",
                target,
                specifiers.iter().join(", ")
            ),
            MockError::HookConflict => {
                write!(f, "Runtime already has a load hook installed by another interceptor")
            }
        }
    }
}

impl std::error::Error for MockError {}

impl From<ResolutionError> for MockError {
    fn from(err: ResolutionError) -> Self {
        MockError::Resolution(err)
    }
}

impl From<LoadError> for MockError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Resolution(err) => MockError::Resolution(err),
            other => MockError::Load(other),
        }
    }
}

/// The substitution service bound to one runtime.
pub struct Mocker {
    runtime: Arc<Runtime>,
    registry: Arc<SubstitutionRegistry>,
    interceptor: Arc<LoadInterceptor>,
    style: Style,
}

impl Mocker {
    /// Create a mocker and install its interceptor into `runtime`.
    pub fn new(runtime: Arc<Runtime>) -> Result<Self, MockError> {
        let mocker = Self::attach(runtime);
        if mocker.interceptor.is_installed() {
            Ok(mocker)
        } else {
            Err(MockError::HookConflict)
        }
    }

    /// The process-wide mocker, created on first use with configuration from
    /// the current directory and the environment.
    pub fn global() -> &'static Mocker {
        static GLOBAL: OnceLock<Mocker> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let project_dir = std::env::current_dir().unwrap_or_default();
            // A runtime created here has no hook yet, so attaching cannot conflict.
            Self::attach(Arc::new(Runtime::new(HostConfig::load(&project_dir))))
        })
    }

    fn attach(runtime: Arc<Runtime>) -> Self {
        crate::debug::init(runtime.config());
        let registry = Arc::new(SubstitutionRegistry::new());
        let interceptor = Arc::new(LoadInterceptor::new(registry.clone(), runtime.config()));
        interceptor.install(&runtime);
        let style = Style::new(runtime.config().color);
        Self {
            runtime,
            registry,
            interceptor,
            style,
        }
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn registry(&self) -> &SubstitutionRegistry {
        &self.registry
    }

    pub fn interceptor(&self) -> &Arc<LoadInterceptor> {
        &self.interceptor
    }

    /// Identity of the Rust source file calling into the mocker, anchored at
    /// the configured root.
    pub fn caller_identity(&self, location: &Location<'_>) -> CanonicalPath {
        let file = location.file().replace('\\', "/");
        CanonicalPath::new(&join_paths(&self.runtime.config().root, &file))
    }

    /// Load `target` with `replacements`, resolving `target` relative to the
    /// calling source file.
    #[track_caller]
    pub fn mock_load<S, I>(&self, target: &str, replacements: I) -> Result<Value, MockError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Value)>,
    {
        let caller = self.caller_identity(Location::caller());
        self.mock_load_from(&caller, target, replacements)
    }

    /// Load `target` with `replacements`, resolving `target` relative to
    /// `caller`.
    ///
    /// Replacement keys are specifiers as written inside the target. When two
    /// keys name the same module, the later one wins.
    pub fn mock_load_from<S, I>(
        &self,
        caller: &CanonicalPath,
        target: &str,
        replacements: I,
    ) -> Result<Value, MockError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Value)>,
    {
        let target_path = self
            .runtime
            .resolve(target, &caller.dirname(), Some(caller))?;
        if self.tracing() {
            debug!(
                target: "mocktron::mock",
                "mocking: {} [{}]",
                self.style.bold(target),
                target_path
            );
        }

        let target_dir = target_path.dirname();
        for (specifier, replacement) in replacements {
            let specifier: String = specifier.into();
            let dependency = match self
                .runtime
                .resolve(&specifier, &target_dir, Some(&target_path))
            {
                Ok(path) => path,
                Err(err) => {
                    self.abandon(&target_path);
                    return Err(err.into());
                }
            };
            if self.tracing() {
                debug!(
                    target: "mocktron::mock",
                    "will replace: {} [{}]",
                    self.style.bold(&specifier),
                    dependency
                );
            }
            self.registry.register(
                dependency,
                SubstitutionEntry {
                    specifier,
                    replacement,
                    owner: target_path.clone(),
                },
            );
        }

        self.runtime.evict(&target_path);

        let module = match self.runtime.load(&target_path) {
            Ok(module) => module,
            Err(err) => {
                self.abandon(&target_path);
                return Err(err.into());
            }
        };

        if !self.registry.is_empty() {
            let specifiers = self.registry.pending_specifiers();
            self.abandon(&target_path);
            return Err(MockError::StaleMock {
                target: target.to_string(),
                specifiers,
            });
        }

        self.runtime.evict(&target_path);
        Ok(module)
    }

    /// Drop every pending substitution, whoever registered it.
    pub fn reset(&self) {
        self.registry.clear();
    }

    /// Undo a failed orchestration: withdraw the target's own entries and
    /// forget any instance built under them.
    fn abandon(&self, target: &CanonicalPath) {
        let withdrawn = self.registry.withdraw_owned_by(target);
        self.runtime.evict(target);
        if self.tracing() && !withdrawn.is_empty() {
            debug!(
                target: "mocktron::mock",
                "withdrew {} pending substitution(s) for {}",
                withdrawn.len(),
                self.style.yellow(target.as_str())
            );
        }
    }

    fn tracing(&self) -> bool {
        self.runtime.config().debug
    }
}

impl fmt::Debug for Mocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mocker")
            .field("runtime", &self.runtime)
            .field("pending", &self.registry.len())
            .finish()
    }
}
