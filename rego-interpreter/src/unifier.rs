//! Structural unification: matches a pattern expression (the left- or
//! right-hand side of `:=`/`=`, the target of a `some k, v in xs`) against a
//! concrete value, binding any free variables it contains.
//!
//! Unification doesn't evaluate — for any sub-expression that isn't itself a
//! binding site (a plain reference, an arithmetic expression), it defers to
//! the caller-supplied `eval` callback and compares the result for equality.
//! This keeps the module free of a dependency on the evaluator, which in
//! turn needs to call back into unification for destructuring assignment.

use indexmap::IndexMap;
use rego_ast::ast::Expr;
use rego_ast::value::Value;
use std::sync::Arc;

pub type Bindings = IndexMap<Arc<str>, Value>;

pub fn is_wildcard(name: &str) -> bool {
    name == "_"
}

/// Attempts to unify `pattern` with `value`, mutating `bindings` in place.
/// Returns false (leaving `bindings` partially updated by design — callers
/// always discard the whole binding set on failure) if the shapes or
/// already-bound values don't match.
pub fn unify(pattern: &Expr, value: &Value, bindings: &mut Bindings, eval: &dyn Fn(&Expr, &Bindings) -> Option<Value>) -> bool {
    match pattern {
        Expr::Var(name, _) => {
            if is_wildcard(name) {
                return true;
            }
            if let Some(existing) = bindings.get(name) {
                return existing == value;
            }
            bindings.insert(name.clone(), value.clone());
            true
        }
        Expr::Literal(lit, _) => lit == value,
        Expr::Array(items, _) => match value {
            Value::Array(arr) if arr.len() == items.len() => {
                items.iter().zip(arr.iter()).all(|(p, v)| unify(p, v, bindings, eval))
            }
            _ => false,
        },
        Expr::Object(pairs, _) => match value {
            Value::Object(obj) if pairs.len() == obj.len() => pairs.iter().all(|(k_expr, v_expr)| {
                let Some(key) = eval(k_expr, bindings) else { return false };
                let Some(found) = obj.get(&key) else { return false };
                unify(v_expr, found, bindings, eval)
            }),
            _ => false,
        },
        other => eval(other, bindings).as_ref() == Some(value),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rego_span::Location;

    fn noop_eval(_: &Expr, _: &Bindings) -> Option<Value> {
        None
    }

    #[test]
    fn binds_a_bare_variable() {
        let mut bindings = Bindings::new();
        let pattern = Expr::Var(Arc::from("x"), Location::dummy());
        assert!(unify(&pattern, &Value::int(1), &mut bindings, &noop_eval));
        assert_eq!(bindings.get("x"), Some(&Value::int(1)));
    }

    #[test]
    fn destructures_an_array_pattern() {
        let mut bindings = Bindings::new();
        let pattern = Expr::Array(
            vec![Expr::Var(Arc::from("a"), Location::dummy()), Expr::Var(Arc::from("b"), Location::dummy())],
            Location::dummy(),
        );
        let value = Value::array(vec![Value::int(1), Value::int(2)]);
        assert!(unify(&pattern, &value, &mut bindings, &noop_eval));
        assert_eq!(bindings.get("a"), Some(&Value::int(1)));
        assert_eq!(bindings.get("b"), Some(&Value::int(2)));
    }

    #[test]
    fn rejects_conflicting_rebinding() {
        let mut bindings = Bindings::new();
        bindings.insert(Arc::from("x"), Value::int(1));
        let pattern = Expr::Var(Arc::from("x"), Location::dummy());
        assert!(!unify(&pattern, &Value::int(2), &mut bindings, &noop_eval));
    }

    #[test]
    fn wildcard_always_matches() {
        let mut bindings = Bindings::new();
        let pattern = Expr::Var(Arc::from("_"), Location::dummy());
        assert!(unify(&pattern, &Value::int(99), &mut bindings, &noop_eval));
        assert!(bindings.is_empty());
    }

    #[test]
    fn object_pattern_rejects_a_value_with_extra_keys() {
        let mut bindings = Bindings::new();
        let pattern = Expr::Object(
            vec![(Expr::Literal(Value::string("a"), Location::dummy()), Expr::Var(Arc::from("x"), Location::dummy()))],
            Location::dummy(),
        );
        let mut obj = IndexMap::new();
        obj.insert(Value::string("a"), Value::int(1));
        obj.insert(Value::string("b"), Value::int(2));
        assert!(!unify(&pattern, &Value::object(obj), &mut bindings, &noop_eval));
    }
}
