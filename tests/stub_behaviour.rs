//! Integration tests for recording stubs.
//!
//! Covers call recording, deep-equality expectations, scripted results and
//! the diagnostic text of a failed expectation.

use mocktron::{args, CallError, Stub, Value};
use regex::Regex;

// ============================================================
// Recording
// ============================================================

#[test]
fn test_records_every_call_in_order() {
    let stub = Stub::new();

    stub.call(&args![1, 2, 3]).unwrap();
    stub.call(&args![4, 5, 6]).unwrap();

    assert_eq!(stub.calls(), vec![args![1, 2, 3], args![4, 5, 6]]);
    assert_eq!(stub.call_count(), 2);
}

#[test]
fn test_unconfigured_stub_returns_undefined() {
    let stub = Stub::new();
    assert!(stub.call(&[]).unwrap().is_undefined());
    assert_eq!(stub.calls(), vec![args![]]);
}

#[test]
fn test_clones_share_one_record() {
    let stub = Stub::new();
    let handle = stub.clone();
    handle.call(&args!["via clone"]).unwrap();

    assert!(stub.same_as(&handle));
    assert_eq!(stub.calls(), vec![args!["via clone"]]);
    assert!(!stub.same_as(&Stub::new()));
}

#[test]
fn test_stub_as_function_value() {
    let stub = Stub::named("callback");
    stub.returns(Value::Long(7));

    let callback = Value::from(&stub);
    assert!(callback.is_function());
    assert_eq!(callback.call(&args!["x"]).unwrap(), Value::Long(7));
    assert_eq!(stub.calls(), vec![args!["x"]]);
}

// ============================================================
// Expectations
// ============================================================

#[test]
fn test_expectation_accepts_matching_arguments() {
    let stub = Stub::new();
    stub.expects(args!["x", 42]);

    assert!(stub.call(&args!["x", 42]).is_ok());
}

#[test]
fn test_expectation_rejects_mismatches() {
    let stub = Stub::new();
    stub.expects(args!["x", 42]);

    assert!(matches!(
        stub.call(&args!["y", 42]),
        Err(CallError::UnexpectedArguments { .. })
    ));
    assert!(matches!(
        stub.call(&[]),
        Err(CallError::UnexpectedArguments { .. })
    ));
    assert!(matches!(
        stub.call(&args!["x", 42, "extra"]),
        Err(CallError::UnexpectedArguments { .. })
    ));
    // Rejected calls are still recorded.
    assert_eq!(stub.call_count(), 3);
}

#[test]
fn test_expectation_compares_structurally() {
    let stub = Stub::new();
    stub.expects(vec![Value::map([("a", Value::Long(1))])]);

    let separately_built = Value::map([("a", Value::Long(1))]);
    assert!(stub.call(&[separately_built]).is_ok());

    let wider = Value::map([("a", Value::Long(1)), ("b", Value::Long(2))]);
    assert!(stub.call(&[wider]).is_err());
}

#[test]
fn test_expectation_compares_nested_lists() {
    let stub = Stub::new();
    stub.expects(vec![Value::list([Value::list([Value::from("deep")])])]);

    assert!(stub
        .call(&[Value::list([Value::list([Value::from("deep")])])])
        .is_ok());
    assert!(stub
        .call(&[Value::list([Value::list([Value::from("shallow")])])])
        .is_err());
}

#[test]
fn test_integer_and_float_are_distinct() {
    let stub = Stub::new();
    stub.expects(args![1]);
    assert!(stub.call(&args![1.0]).is_err());
}

#[test]
fn test_named_stub_error_message() {
    let stub = Stub::named("my-awesome-stub");
    stub.expects(args!["x", 42]);

    let err = stub.call(&args!["y", 42]).unwrap_err();
    let message = err.to_string();

    let header = Regex::new(r#"^Stub "my-awesome-stub" called with unexpected arguments\."#).unwrap();
    assert!(header.is_match(&message), "message was: {message}");
    assert!(message.contains(r#"Expected: ["x", 42]"#), "message was: {message}");
    assert!(message.contains(r#"Received: ["y", 42]"#), "message was: {message}");
}

#[test]
fn test_unnamed_stub_error_message() {
    let stub = Stub::new();
    stub.expects(args![]);

    let err = stub.call(&args![1]).unwrap_err();
    let header = Regex::new(r"^Stub called with unexpected arguments\.").unwrap();
    assert!(header.is_match(&err.to_string()));
}

// ============================================================
// Scripted results
// ============================================================

#[test]
fn test_returns_fixed_value() {
    let stub = Stub::new();
    stub.returns(Value::from("fixed"));

    assert_eq!(stub.call(&[]).unwrap(), Value::from("fixed"));
    assert_eq!(stub.call(&args![1]).unwrap(), Value::from("fixed"));
}

#[test]
fn test_returns_function_acts_as_producer() {
    let stub = Stub::new();
    stub.returns(Value::function(|args| {
        let total: i64 = args.iter().filter_map(Value::as_long).sum();
        Ok(Value::Long(total))
    }));

    assert_eq!(stub.call(&args![1, 2, 3]).unwrap(), Value::Long(6));
    assert_eq!(stub.call(&args![10]).unwrap(), Value::Long(10));
}

#[test]
fn test_producer_may_call_the_stub_again() {
    let stub = Stub::new();
    let inner = stub.clone();
    stub.returns(Value::function(move |_| Ok(Value::from(inner.call_count() as i64))));

    assert_eq!(stub.call(&[]).unwrap(), Value::Long(1));
    assert_eq!(stub.call(&[]).unwrap(), Value::Long(2));
}

#[test]
fn test_throws_propagates_value_unchanged() {
    let stub = Stub::new();
    let error = Value::map([("code", Value::from("E_FAIL"))]);
    stub.throws(error.clone());

    match stub.call(&[]) {
        Err(CallError::Thrown(thrown)) => assert_eq!(thrown, error),
        other => panic!("expected thrown error, got {other:?}"),
    }
    assert_eq!(stub.call_count(), 1);
}

#[test]
fn test_last_behavior_wins() {
    let stub = Stub::new();
    stub.throws(Value::from("boom"));
    stub.returns(Value::Bool(true));

    assert_eq!(stub.call(&[]).unwrap(), Value::Bool(true));
}

#[test]
fn test_expectation_checked_before_behavior() {
    let stub = Stub::new();
    stub.expects(args!["ok"]).throws(Value::from("boom"));

    assert!(matches!(
        stub.call(&args!["nope"]),
        Err(CallError::UnexpectedArguments { .. })
    ));
    assert!(matches!(stub.call(&args!["ok"]), Err(CallError::Thrown(_))));
}

// ============================================================
// Reset
// ============================================================

#[test]
fn test_clear_resets_everything_and_chains() {
    let stub = Stub::named("reset-me");
    stub.expects(args![1]).returns(Value::from("scripted"));
    stub.call(&args![1]).unwrap();

    let same = stub.clear();
    assert!(same.same_as(&stub));
    assert!(stub.calls().is_empty());

    // No expectation and no scripted result after clearing.
    assert!(stub.call(&args!["anything"]).unwrap().is_undefined());
    assert_eq!(stub.name().as_deref(), Some("reset-me"));
}
