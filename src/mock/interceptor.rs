//! Load Interceptor
//!
//! The hook that makes substitution visible to module bodies. For every load
//! request it asks the registry whether the requester owns a pending
//! substitution for the resolved path. If so, the replacement is the result
//! and the real loader never runs; otherwise the request passes through
//! untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::registry::SubstitutionRegistry;
use crate::config::HostConfig;
use crate::debug::Style;
use crate::modules::{LoadHook, LoadRequest, Runtime};
use crate::value::Value;

pub struct LoadInterceptor {
    registry: Arc<SubstitutionRegistry>,
    trace: bool,
    style: Style,
    installed: AtomicBool,
}

impl LoadInterceptor {
    pub fn new(registry: Arc<SubstitutionRegistry>, config: &HostConfig) -> Self {
        Self {
            registry,
            trace: config.debug,
            style: Style::new(config.color),
            installed: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<SubstitutionRegistry> {
        &self.registry
    }

    /// Install into `runtime`. Installing the same interceptor again is a
    /// no-op that reports success; `false` means the runtime already carries
    /// a different hook.
    pub fn install(self: &Arc<Self>, runtime: &Runtime) -> bool {
        if self.installed.load(Ordering::SeqCst) {
            return true;
        }
        let hook: Arc<dyn LoadHook> = self.clone();
        if runtime.install_hook(hook) {
            self.installed.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }
}

impl LoadHook for LoadInterceptor {
    fn intercept(&self, request: &LoadRequest<'_>) -> Option<Value> {
        let Some(requester) = request.requester else {
            if self.trace {
                debug!(
                    target: "mocktron::intercept",
                    "load(): {} [{}]",
                    self.style.bold(request.specifier),
                    request.resolved
                );
            }
            return None;
        };

        match self.registry.try_consume(request.resolved, requester) {
            Some(replacement) => {
                if self.trace {
                    debug!(
                        target: "mocktron::intercept",
                        "require(): {} {} [{}] from {}",
                        self.style.green("REPLACING WITH MOCK"),
                        self.style.bold(request.specifier),
                        request.resolved,
                        self.style.gray(requester.as_str())
                    );
                }
                Some(replacement)
            }
            None => {
                if self.trace {
                    debug!(
                        target: "mocktron::intercept",
                        "require(): {} [{}] from {}",
                        self.style.bold(request.specifier),
                        request.resolved,
                        self.style.gray(requester.as_str())
                    );
                }
                None
            }
        }
    }
}

impl std::fmt::Debug for LoadInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadInterceptor")
            .field("pending", &self.registry.len())
            .field("installed", &self.is_installed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::registry::SubstitutionEntry;
    use crate::modules::CanonicalPath;

    fn setup() -> (Runtime, Arc<LoadInterceptor>) {
        let runtime = Runtime::default();
        runtime.define_value("/lib/b.mod", Value::from("real"));
        runtime.define("/lib/a.mod", |scope| scope.require("./b"));
        runtime.define("/lib/u.mod", |scope| scope.require("./b"));
        let registry = Arc::new(SubstitutionRegistry::new());
        let interceptor = Arc::new(LoadInterceptor::new(registry, runtime.config()));
        assert!(interceptor.install(&runtime));
        (runtime, interceptor)
    }

    fn register_for_a(interceptor: &LoadInterceptor) {
        interceptor.registry().register(
            CanonicalPath::new("/lib/b.mod"),
            SubstitutionEntry {
                specifier: "./b".to_string(),
                replacement: Value::from("fake"),
                owner: CanonicalPath::new("/lib/a.mod"),
            },
        );
    }

    #[test]
    fn test_owner_receives_replacement_once() {
        let (runtime, interceptor) = setup();
        register_for_a(&interceptor);

        let a = CanonicalPath::new("/lib/a.mod");
        assert_eq!(runtime.load(&a).unwrap(), Value::from("fake"));
        assert!(interceptor.registry().is_empty());

        runtime.evict(&a);
        assert_eq!(runtime.load(&a).unwrap(), Value::from("real"));
    }

    #[test]
    fn test_unrelated_requester_gets_real_module() {
        let (runtime, interceptor) = setup();
        register_for_a(&interceptor);

        let u = runtime.load(&CanonicalPath::new("/lib/u.mod")).unwrap();
        assert_eq!(u, Value::from("real"));
        assert_eq!(interceptor.registry().len(), 1);
    }

    #[test]
    fn test_top_level_load_is_never_substituted() {
        let (runtime, interceptor) = setup();
        register_for_a(&interceptor);

        let b = runtime.load(&CanonicalPath::new("/lib/b.mod")).unwrap();
        assert_eq!(b, Value::from("real"));
        assert_eq!(interceptor.registry().len(), 1);
    }

    #[test]
    fn test_reinstall_is_noop() {
        let (runtime, interceptor) = setup();
        assert!(interceptor.install(&runtime));
        assert!(interceptor.is_installed());

        let other = Arc::new(LoadInterceptor::new(
            Arc::new(SubstitutionRegistry::new()),
            runtime.config(),
        ));
        assert!(!other.install(&runtime));
    }
}
