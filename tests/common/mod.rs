//! Shared fixtures for mocktron integration tests
//!
//! Every test builds its own `Runtime` and `Mocker`, so tests never share
//! substitution state and can run in parallel.
//!
//! Fixture layout (root `/project`):
//! - `test/A.mod` - requires `./B`, exports `run()` returning `B.default()`
//! - `test/B.mod` - exports `default()` returning `"real"`
//! - `test/T.mod` - requires `./U` then `./B`, exports both
//! - `test/U.mod` - requires `./B`, exports it
//! - `test/counter.mod` - module-level counter, requires `./B`
//! - `test/uses_packages.mod` - requires `clock` (built-in) and `left-pad` (package)
//! - `packages/left-pad/index.mod` - a package
//! - `builtin:clock` - a built-in
//! - `test/settings.data` - a TOML data module

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use mocktron::{CanonicalPath, HostConfig, Mocker, Runtime, Value};

pub const ROOT: &str = "/project";

/// Identity used as the calling test file.
pub fn caller() -> CanonicalPath {
    CanonicalPath::new("/project/test/a_test.rs")
}

/// A module exporting `{ default: () => text }`.
pub fn default_export(text: &'static str) -> Value {
    Value::map([("default", Value::function(move |_| Ok(Value::from(text))))])
}

pub fn runtime() -> Arc<Runtime> {
    runtime_with(HostConfig::default().with_root(ROOT))
}

pub fn runtime_with(config: HostConfig) -> Arc<Runtime> {
    let runtime = Arc::new(Runtime::new(config));

    runtime.define_value("test/B.mod", default_export("real"));

    runtime.define("test/A.mod", |scope| {
        let b = scope.require("./B")?;
        Ok(Value::map([(
            "run",
            Value::function(move |_| b.invoke("default", &[])),
        )]))
    });

    runtime.define("test/U.mod", |scope| {
        let b = scope.require("./B")?;
        Ok(Value::map([("b", b)]))
    });

    runtime.define("test/T.mod", |scope| {
        let u = scope.require("./U")?;
        let b = scope.require("./B")?;
        Ok(Value::map([("u", u), ("b", b)]))
    });

    runtime.define("test/counter.mod", |scope| {
        let b = scope.require("./B")?;
        let count = Arc::new(AtomicI64::new(0));
        Ok(Value::map([
            ("b", b),
            (
                "increment",
                Value::function(move |_| Ok(Value::Long(count.fetch_add(1, Ordering::SeqCst) + 1))),
            ),
        ]))
    });

    runtime.define("test/uses_packages.mod", |scope| {
        let clock = scope.require("clock")?;
        let pad = scope.require("left-pad")?;
        Ok(Value::map([("clock", clock), ("pad", pad)]))
    });

    runtime.define_modules(|graph| {
        graph.define_value("packages/left-pad/index.mod", Value::from("real pad"));
        graph.define_builtin("clock", |_| Ok(Value::Long(1_700_000_000)));
        graph
            .define_toml("test/settings.data", "retries = 3")
            .expect("fixture TOML should parse");
    });

    runtime
}

pub fn mocker() -> Mocker {
    Mocker::new(runtime()).expect("fresh runtime has no hook")
}
