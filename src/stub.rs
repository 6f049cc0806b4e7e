//! Recording Stubs
//!
//! A `Stub` is a callable test double. Every call is recorded; an optional
//! argument expectation is checked with deep structural equality; the result
//! is scripted with `returns` or `throws`.
//!
//! ```rust
//! use mocktron::{args, Stub, Value};
//!
//! let fetch = Stub::named("fetch");
//! fetch.expects(args!["/users", 1]).returns(Value::from("ok"));
//!
//! assert_eq!(fetch.call(&args!["/users", 1]).unwrap(), Value::from("ok"));
//! assert!(fetch.call(&args!["/posts", 1]).is_err());
//! assert_eq!(fetch.call_count(), 2);
//! ```
//!
//! Stubs are handles: clones share one call record and configuration, and a
//! stub converts into a `Value::Function` so it can be exported from a
//! replacement module.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::value::{render_args, sequences_equal, Callable, Value};

/// Errors raised by calling a function value.
#[derive(Debug, Clone)]
pub enum CallError {
    /// A stub's arguments did not match its expectation.
    UnexpectedArguments {
        name: Option<String>,
        expected: Vec<Value>,
        received: Vec<Value>,
    },
    /// A deliberately raised error, propagated unchanged.
    Thrown(Value),
    /// Something that is not a function was called.
    NotCallable(String),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::UnexpectedArguments {
                name,
                expected,
                received,
            } => {
                match name {
                    Some(name) => write!(f, "Stub \"{}\" called with unexpected arguments.", name)?,
                    None => write!(f, "Stub called with unexpected arguments.")?,
                }
                write!(
                    f,
                    "\nExpected: {}\nReceived: {}",
                    render_args(expected),
                    render_args(received)
                )
            }
            CallError::Thrown(value) => write!(f, "Thrown: {}", value),
            CallError::NotCallable(msg) => write!(f, "Not callable: {}", msg),
        }
    }
}

impl std::error::Error for CallError {}

/// What a call produces once it passes the expectation check.
#[derive(Debug, Clone, Default)]
enum Behavior {
    #[default]
    Undefined,
    Returns(Value),
    Produces(Callable),
    Throws(Value),
}

#[derive(Debug, Default)]
struct StubState {
    name: Option<String>,
    calls: Vec<Vec<Value>>,
    expected: Option<Vec<Value>>,
    behavior: Behavior,
}

/// A recording, scriptable test double.
#[derive(Clone, Default)]
pub struct Stub {
    state: Arc<Mutex<StubState>>,
}

impl Stub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stub whose name appears in its error messages.
    pub fn named(name: impl Into<String>) -> Self {
        let stub = Self::new();
        stub.state.lock().name = Some(name.into());
        stub
    }

    pub fn name(&self) -> Option<String> {
        self.state.lock().name.clone()
    }

    /// Invoke the stub.
    ///
    /// The call is recorded first, even when it then fails the expectation.
    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        let behavior = {
            let mut state = self.state.lock();
            state.calls.push(args.to_vec());

            if let Some(expected) = &state.expected {
                if !sequences_equal(expected, args) {
                    return Err(CallError::UnexpectedArguments {
                        name: state.name.clone(),
                        expected: expected.clone(),
                        received: args.to_vec(),
                    });
                }
            }

            state.behavior.clone()
        };

        match behavior {
            Behavior::Undefined => Ok(Value::Undefined),
            Behavior::Returns(value) => Ok(value),
            Behavior::Produces(producer) => producer.call(args),
            Behavior::Throws(error) => Err(CallError::Thrown(error)),
        }
    }

    /// Recorded argument lists, oldest first.
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Forget recorded calls and drop the expectation and scripted behavior.
    pub fn clear(&self) -> &Self {
        let mut state = self.state.lock();
        state.calls.clear();
        state.expected = None;
        state.behavior = Behavior::Undefined;
        drop(state);
        self
    }

    /// Require every later call to receive exactly these arguments.
    pub fn expects(&self, args: Vec<Value>) -> &Self {
        self.state.lock().expected = Some(args);
        self
    }

    /// Return `value` from every later call. A function value is treated as
    /// a producer and called with each call's arguments instead.
    pub fn returns(&self, value: Value) -> &Self {
        self.state.lock().behavior = match value {
            Value::Function(producer) => Behavior::Produces(producer),
            value => Behavior::Returns(value),
        };
        self
    }

    /// Raise `error` from every later call.
    pub fn throws(&self, error: Value) -> &Self {
        self.state.lock().behavior = Behavior::Throws(error);
        self
    }

    /// True if both handles drive the same stub.
    pub fn same_as(&self, other: &Stub) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// A function value that forwards to this stub.
    pub fn to_value(&self) -> Value {
        let stub = self.clone();
        let label = self.name().unwrap_or_else(|| "stub".to_string());
        Value::Function(Callable::new(move |args| stub.call(args)).with_label(label))
    }
}

impl From<Stub> for Value {
    fn from(stub: Stub) -> Self {
        stub.to_value()
    }
}

impl From<&Stub> for Value {
    fn from(stub: &Stub) -> Self {
        stub.to_value()
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Stub")
            .field("name", &state.name)
            .field("calls", &state.calls.len())
            .field("expected", &state.expected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[test]
    fn test_records_calls_in_order() {
        let s = Stub::new();
        s.call(&args![1, 2, 3]).unwrap();
        s.call(&args![4, 5, 6]).unwrap();
        assert_eq!(s.calls(), vec![args![1, 2, 3], args![4, 5, 6]]);
    }

    #[test]
    fn test_unconfigured_returns_undefined() {
        let s = Stub::new();
        assert!(s.call(&[]).unwrap().is_undefined());
    }

    #[test]
    fn test_failed_expectation_is_still_recorded() {
        let s = Stub::new();
        s.expects(args!["x"]);
        assert!(s.call(&args!["y"]).is_err());
        assert_eq!(s.call_count(), 1);
    }

    #[test]
    fn test_expectation_blocks_return_value() {
        let s = Stub::new();
        s.expects(args![1]).returns(Value::from("ok"));
        match s.call(&args![2]) {
            Err(CallError::UnexpectedArguments { expected, received, .. }) => {
                assert_eq!(expected, args![1]);
                assert_eq!(received, args![2]);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_message_with_and_without_name() {
        let err = Stub::new().expects(args![1]).call(&[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Stub called with unexpected arguments.\nExpected: [1]\nReceived: []"
        );

        let err = Stub::named("db").expects(args!["q"]).call(&args!["r"]).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Stub \"db\" called with unexpected arguments."));
    }

    #[test]
    fn test_producer_may_reenter_stub() {
        let s = Stub::new();
        let inner = s.clone();
        s.returns(Value::function(move |_| Ok(Value::Long(inner.call_count() as i64))));
        assert_eq!(s.call(&[]).unwrap(), Value::Long(1));
        assert_eq!(s.call(&[]).unwrap(), Value::Long(2));
    }

    #[test]
    fn test_to_value_shares_state() {
        let s = Stub::named("cb");
        s.returns(Value::Long(7));
        let f = s.to_value();
        assert_eq!(f.call(&args!["a"]).unwrap(), Value::Long(7));
        assert_eq!(s.calls(), vec![args!["a"]]);
        assert_eq!(f.to_string(), "[function cb]");
    }

    #[test]
    fn test_clones_are_the_same_stub() {
        let s = Stub::new();
        let t = s.clone();
        assert!(s.same_as(&t));
        assert!(!s.same_as(&Stub::new()));
        assert!(s.clear().same_as(&t));
    }
}
