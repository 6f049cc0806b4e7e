//! mocktron - Scoped Module Substitution and Recording Stubs
//!
//! This library provides test doubles for code organized as a graph of
//! lazily-loaded modules.
//!
//! # Architecture
//!
//! 1. **Module Host** (`modules` module)
//!    - Module graph of factories and data modules keyed by canonical path
//!    - Specifier resolution: relative, absolute, built-ins, package directories
//!    - Loader cache with explicit eviction
//!    - One process-wide load hook wrapped around the load entry point
//!
//! 2. **Substitution** (`mock` module)
//!    - Registry of pending replacements, keyed by canonical path
//!    - Interceptor that answers a load with a replacement only when the
//!      requester is the module that registered it, and only once
//!    - `Mocker::mock_load`, which loads a module under test with some of its
//!      direct dependencies replaced and rejects replacements it never used
//!
//! 3. **Stubs** (`stub` module)
//!    - Call recording, deep-equality argument expectations, scripted
//!      return and throw behavior
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mocktron::{Mocker, Runtime, Stub, Value};
//!
//! let runtime = Arc::new(Runtime::default());
//! runtime.define("/app/greeter.mod", |scope| {
//!     let names = scope.require("./names")?;
//!     Ok(Value::map([(
//!         "greet",
//!         Value::function(move |_| {
//!             let name = names.invoke("default", &[])?;
//!             Ok(Value::from(format!("hello {}", name.as_str().unwrap_or("?"))))
//!         }),
//!     )]))
//! });
//! runtime.define_value("/app/names.mod", Value::Null);
//!
//! let mocker = Mocker::new(runtime).unwrap();
//! let name = Stub::new();
//! name.returns(Value::from("ada"));
//!
//! let greeter = mocker
//!     .mock_load_from(
//!         &mocktron::CanonicalPath::new("/app/greeter_test.rs"),
//!         "./greeter",
//!         [("./names", Value::map([("default", name.to_value())]))],
//!     )
//!     .unwrap();
//!
//! assert_eq!(greeter.invoke("greet", &[]).unwrap(), Value::from("hello ada"));
//! assert_eq!(name.call_count(), 1);
//! ```
//!
//! # Debugging
//!
//! Set `MOCKTRON_DEBUG=1` (or `debug = true` in `mocktron.toml`) to trace
//! every intercepted load and every substitution decision. `NO_COLOR` turns
//! off decorations.

pub mod config;
pub mod debug;
pub mod mock;
pub mod modules;
pub mod stub;
pub mod value;

pub use config::HostConfig;
pub use mock::{LoadInterceptor, MockError, Mocker, SubstitutionEntry, SubstitutionRegistry};
pub use modules::{
    CanonicalPath, LoadError, LoadHook, LoadRequest, LoadResult, ModuleGraph, ModuleScope,
    ResolutionError, Runtime,
};
pub use stub::{CallError, Stub};
pub use value::{deep_equal, Callable, Value};

use std::panic::Location;
use std::sync::Arc;

/// Build an argument list of `Value`s.
///
/// ```rust
/// use mocktron::{args, Value};
/// assert_eq!(args!["x", 42], vec![Value::from("x"), Value::Long(42)]);
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::Value::from($arg)),*]
    };
}

/// The process-wide module host used by `mock`.
pub fn runtime() -> &'static Arc<Runtime> {
    Mocker::global().runtime()
}

/// Load `target` through the process-wide mocker, resolving it relative to
/// the calling source file.
#[track_caller]
pub fn mock<S, I>(target: &str, replacements: I) -> Result<Value, MockError>
where
    S: Into<String>,
    I: IntoIterator<Item = (S, Value)>,
{
    let mocker = Mocker::global();
    let caller = mocker.caller_identity(Location::caller());
    mocker.mock_load_from(&caller, target, replacements)
}

/// A fresh unnamed stub.
pub fn stub() -> Stub {
    Stub::new()
}
