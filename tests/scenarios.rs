//! Integration tests for the conformance scenarios named in the spec: each
//! one compiles a small policy, evaluates a query against an input document,
//! and checks the expected trivalent result or error.

use indexmap::IndexMap;
use rego_ast::value::Value;
use rego_lang::{ErrorMode, Policy};

fn input_from(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = IndexMap::new();
    for (k, v) in pairs {
        map.insert(Value::string(k), v);
    }
    Value::object(map)
}

fn query(source: &str, query: &str, input: Value) -> Option<Value> {
    let policy = Policy::compile(source).expect("policy should compile");
    policy.query(query, Value::object(IndexMap::new()), input, ErrorMode::Lenient).expect("query should evaluate")
}

#[test]
fn s1_default_allow() {
    let source = "package ex\ndefault allow := false\nallow { input.user == \"admin\" }\n";
    let admin = input_from(vec![("user", Value::string("admin"))]);
    assert_eq!(query(source, "data.ex.allow", admin), Some(Value::boolean(true)));

    let bob = input_from(vec![("user", Value::string("bob"))]);
    assert_eq!(query(source, "data.ex.allow", bob), Some(Value::boolean(false)));
}

#[test]
fn s2_partial_set_deny() {
    let source = "package v\ndeny[m] { input.enabled == false; m := \"disabled\" }\ndeny[m] { input.timeout < 30; m := \"timeout too low\" }\n";

    let broken = input_from(vec![("enabled", Value::boolean(false)), ("timeout", Value::int(10))]);
    let result = query(source, "data.v.deny", broken).unwrap();
    let Value::Set(set) = result else { panic!("expected a set") };
    assert!(set.contains(&Value::string("disabled")));
    assert!(set.contains(&Value::string("timeout too low")));
    assert_eq!(set.len(), 2);

    let healthy = input_from(vec![("enabled", Value::boolean(true)), ("timeout", Value::int(30))]);
    let result = query(source, "data.v.deny", healthy).unwrap();
    let Value::Set(set) = result else { panic!("expected a set") };
    assert!(set.is_empty());
}

#[test]
fn s3_comprehension() {
    let source = "package f\nevens := [n | some n in input.numbers; n % 2 == 0]\n";
    let input = input_from(vec![("numbers", Value::array(vec![Value::int(1), Value::int(2), Value::int(3), Value::int(4)]))]);
    let result = query(source, "data.f.evens", input).unwrap();
    assert_eq!(result, Value::array(vec![Value::int(2), Value::int(4)]));
}

#[test]
fn s4_with_override_replaces_builtin() {
    let source = "package w\nallow if count(input.values) == 6 with count as sum\n";
    let input = input_from(vec![("values", Value::array(vec![Value::int(1), Value::int(2), Value::int(3)]))]);
    assert_eq!(query(source, "data.w.allow", input), Some(Value::boolean(true)));
}

#[test]
fn s5_nested_rule_head() {
    let source = "package h\nfruit[input.color].shade := \"bright\" if input.color\nfruit[input.color].size := input.size if input.color\n";
    let input = input_from(vec![("color", Value::string("red")), ("size", Value::int(3))]);
    let result = query(source, "data.h.fruit", input).unwrap();

    let mut shade_and_size = IndexMap::new();
    shade_and_size.insert(Value::string("shade"), Value::string("bright"));
    shade_and_size.insert(Value::string("size"), Value::int(3));
    let mut expected = IndexMap::new();
    expected.insert(Value::string("red"), Value::object(shade_and_size));
    assert_eq!(result, Value::object(expected));
}

#[test]
fn s6_conflict_detection() {
    let source = "package c\nobj[\"a\"] := {\"x\":1}\nobj[\"a\"] := {\"y\":2}\n";
    let policy = Policy::compile(source).expect("policy should compile");
    let err = policy.query("data.c.obj", Value::object(IndexMap::new()), Value::Null, ErrorMode::Lenient).unwrap_err();
    assert!(format!("{err}").to_lowercase().contains("conflict"));
}

#[test]
fn s7_unsafe_rule_rejected_at_compile_time() {
    let source = "package u\nallow { x > 0 }\n";
    let err = Policy::compile(source).unwrap_err();
    assert!(format!("{err}").contains('x'));
}

#[test]
fn s8_every_over_empty_domain() {
    let source = "package e\nok if every x in input.xs { x > 0 }\n";

    let empty = input_from(vec![("xs", Value::array(vec![]))]);
    assert_eq!(query(source, "data.e.ok", empty), Some(Value::boolean(true)));

    let mixed = input_from(vec![("xs", Value::array(vec![Value::int(1), Value::int(-1)]))]);
    assert_eq!(query(source, "data.e.ok", mixed), None);
}
