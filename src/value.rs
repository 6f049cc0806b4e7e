//! Dynamic Values
//!
//! `Value` is what modules export, what substitutions replace them with, and
//! what stubs receive and return. The shape set is closed so that equality
//! and rendering are fully under our control:
//! - Scalars: `Undefined`, `Null`, `Bool`, `Long`, `Float`, `String`
//! - Composites: `List` (ordered) and `Map` (string keys)
//! - `Function` - a shared native callable
//!
//! Values are trees. There is no shared mutable cell inside a `Value`, so a
//! cyclic value cannot be built and `deep_equal` always terminates.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::stub::CallError;

/// Signature of a native function stored inside a `Value`.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, CallError> + Send + Sync;

/// A shared, invocable function value.
///
/// Cloning a `Callable` clones the handle, not the function: two clones are
/// the same function for equality purposes.
#[derive(Clone)]
pub struct Callable {
    func: Arc<NativeFn>,
    label: Option<Arc<str>>,
}

impl Callable {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            label: None,
        }
    }

    /// Attach a label used only when rendering the function.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Arc::from(label.into()));
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        (self.func)(args)
    }

    /// Identity comparison: true only for handles to the same function.
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "Callable({})", label),
            None => write!(f, "Callable"),
        }
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent result (a call that returns nothing).
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Long(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Function(Callable),
}

impl Value {
    /// Wrap a closure as a function value.
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Value::Function(Callable::new(func))
    }

    /// Build a map value from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list value.
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Look up a key on a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Call the function stored under `key` of a map value.
    ///
    /// This is how test code reaches into a loaded module's exports,
    /// e.g. `module.invoke("default", &[])`.
    pub fn invoke(&self, key: &str, args: &[Value]) -> Result<Value, CallError> {
        match self.get(key) {
            Some(Value::Function(f)) => f.call(args),
            Some(other) => Err(CallError::NotCallable(format!(
                "export '{}' is {}, not a function",
                key,
                other.type_name()
            ))),
            None => Err(CallError::NotCallable(format!(
                "no export named '{}'",
                key
            ))),
        }
    }

    /// Call this value directly if it is a function.
    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        match self {
            Value::Function(f) => f.call(args),
            other => Err(CallError::NotCallable(format!(
                "{} is not a function",
                other.type_name()
            ))),
        }
    }

    /// Human-friendly name of the value's shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Long(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
        }
    }
}

/// Recursive structural equality over the closed value shape set.
///
/// Scalars compare by value and type (`Long(1)` is not `Float(1.0)`), lists
/// element-wise in order, maps by identical key sets and equal values, and
/// functions by identity.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Long(x), Value::Long(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::List(xs), Value::List(ys)) => sequences_equal(xs, ys),
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| deep_equal(x, y)))
        }
        (Value::Function(f), Value::Function(g)) => f.ptr_eq(g),
        _ => false,
    }
}

/// Deep equality of two argument lists.
pub fn sequences_equal(xs: &[Value], ys: &[Value]) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other)
    }
}

/// Render an argument list as `[a, b, c]`.
pub fn render_args(args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    format!("[{}]", rendered.join(", "))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Long(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => write!(f, "{}", render_args(items)),
            Value::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{:?}: {}", k, v))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Value::Function(c) => match c.label() {
                Some(label) => write!(f, "[function {}]", label),
                None => write!(f, "[function]"),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Long(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Function(c)
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(n) => Value::Long(n),
            toml::Value::Float(x) => Value::Float(x),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(d) => Value::String(d.to_string()),
            toml::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(table) => {
                Value::Map(table.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_compare_by_value_and_type() {
        assert!(deep_equal(&Value::Long(2), &Value::Long(2)));
        assert!(!deep_equal(&Value::Long(2), &Value::Long(3)));
        assert!(!deep_equal(&Value::Long(1), &Value::Float(1.0)));
        assert!(!deep_equal(&Value::Null, &Value::Undefined));
        assert!(deep_equal(&Value::from("x"), &Value::from("x")));
    }

    #[test]
    fn test_separately_built_maps_are_equal() {
        let a = Value::map([("a", Value::Long(1)), ("b", Value::list([Value::Null]))]);
        let b = Value::map([("b", Value::list([Value::Null])), ("a", Value::Long(1))]);
        assert!(deep_equal(&a, &b));
    }

    #[test]
    fn test_extra_map_key_is_not_equal() {
        let a = Value::map([("a", Value::Long(1))]);
        let b = Value::map([("a", Value::Long(1)), ("b", Value::Long(2))]);
        assert!(!deep_equal(&a, &b));
        assert!(!deep_equal(&b, &a));
    }

    #[test]
    fn test_list_order_matters() {
        let a = Value::list([Value::Long(1), Value::Long(2)]);
        let b = Value::list([Value::Long(2), Value::Long(1)]);
        assert!(!deep_equal(&a, &b));
    }

    #[test]
    fn test_functions_compare_by_identity() {
        let f = Callable::new(|_| Ok(Value::Undefined));
        let g = Callable::new(|_| Ok(Value::Undefined));
        assert!(deep_equal(&Value::Function(f.clone()), &Value::Function(f.clone())));
        assert!(!deep_equal(&Value::Function(f), &Value::Function(g)));
    }

    #[test]
    fn test_display_rendering() {
        let v = Value::map([
            ("name", Value::from("x")),
            ("n", Value::Long(42)),
            ("xs", Value::list([Value::Bool(true), Value::Null])),
        ]);
        assert_eq!(v.to_string(), r#"{"n": 42, "name": "x", "xs": [true, null]}"#);
        assert_eq!(render_args(&[]), "[]");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
    }

    #[test]
    fn test_invoke_export() {
        let module = Value::map([("default", Value::function(|_| Ok(Value::from("hi"))))]);
        assert_eq!(module.invoke("default", &[]).unwrap(), Value::from("hi"));
        assert!(matches!(
            module.invoke("missing", &[]),
            Err(CallError::NotCallable(_))
        ));
    }

    #[test]
    fn test_as_callable() {
        let f = Callable::new(|args| Ok(Value::Long(args.len() as i64))).with_label("len");
        let v = Value::Function(f.clone());

        let callable = v.as_callable().unwrap();
        assert!(callable.ptr_eq(&f));
        assert_eq!(callable.label(), Some("len"));
        assert_eq!(callable.call(&[Value::Null, Value::Null]).unwrap(), Value::Long(2));
        assert!(Value::from("not a function").as_callable().is_none());
    }

    #[test]
    fn test_from_toml() {
        let parsed: toml::Value = toml::from_str("a = 1\nb = [\"x\"]").unwrap();
        let v = Value::from(parsed);
        assert_eq!(v.get("a"), Some(&Value::Long(1)));
        assert_eq!(v.get("b"), Some(&Value::list([Value::from("x")])));
    }
}
