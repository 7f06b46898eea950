//! The safe-variable check: every variable that appears in a rule must be
//! bound by some non-negated expression in the same rule body before (or
//! by) the point it is used, the way OPA's compiler rejects `x > 1` with no
//! prior binding of `x`. `_` is always safe — it never binds anything.

use indexmap::IndexSet;
use rego_ast::ast::{BinOp, Expr, Literal, RefArg, Rule, RuleHead};
use rego_errors::CompileError;
use std::sync::Arc;

fn is_wildcard(name: &str) -> bool {
    name == "_"
}

/// Global names that are always considered bound: `input`, `data`, and any
/// rule name declared elsewhere in the module (checked by the caller before
/// invoking this pass, since this module only sees one rule at a time).
pub fn check_rule(rule: &Rule, global_names: &IndexSet<Arc<str>>) -> Result<(), CompileError> {
    let mut bound: IndexSet<Arc<str>> = global_names.clone();
    bind_head(&rule.head, &mut bound);
    check_body(&rule.body, &mut bound.clone())?;
    for else_rule in &rule.else_rules {
        check_body(&else_rule.body, &mut bound.clone())?;
    }
    Ok(())
}

fn bind_head(head: &RuleHead, bound: &mut IndexSet<Arc<str>>) {
    match head {
        RuleHead::Complete { .. } => {}
        RuleHead::PartialSet { key, .. } => bind_pattern(key, bound),
        RuleHead::PartialObject { key, value, .. } => {
            bind_pattern(key, bound);
            bind_pattern(value, bound);
        }
        RuleHead::Function { args, .. } => {
            for arg in args {
                bind_pattern(arg, bound);
            }
        }
    }
}

/// Binds every bare variable appearing in a head pattern (function args,
/// partial-rule keys) — these are always considered inputs to the rule.
fn bind_pattern(expr: &Expr, bound: &mut IndexSet<Arc<str>>) {
    if let Expr::Var(name, _) = expr {
        if !is_wildcard(name) {
            bound.insert(name.clone());
        }
    }
}

fn check_body(body: &[Literal], bound: &mut IndexSet<Arc<str>>) -> Result<(), CompileError> {
    if let Some(literal) = bind_body_fixed_point(body, bound) {
        let unbound = first_unbound_var(&literal.expr, bound);
        return Err(CompileError::new(
            literal.location,
            format!("variable `{}` is unsafe: not bound by any expression in this rule", unbound.unwrap_or_default()),
            "safety check".to_string(),
        ));
    }
    Ok(())
}

/// Fixed-point: a literal might use a variable bound by a later literal in
/// source order (Rego doesn't require textual order within a body), so
/// iterate until no literal newly resolves. Returns the first literal still
/// stuck once no further progress is possible, or `None` if the whole body
/// resolved. Shared by `check_body` and the comprehension arm of
/// `first_unbound_var`, which needs the same fixed point over a
/// comprehension's own body.
fn bind_body_fixed_point<'a>(body: &'a [Literal], bound: &mut IndexSet<Arc<str>>) -> Option<&'a Literal> {
    let mut remaining: Vec<&Literal> = body.iter().collect();
    loop {
        let before = bound.len();
        remaining.retain(|literal| !try_bind_literal(literal, bound));
        if remaining.is_empty() {
            return None;
        }
        if bound.len() == before {
            return Some(remaining[0]);
        }
    }
}

/// Attempts to resolve `literal` given the currently bound set, adding any
/// new bindings it introduces. Returns true if the literal's own variables
/// are now all accounted for (bound-or-just-bound).
fn try_bind_literal(literal: &Literal, bound: &mut IndexSet<Arc<str>>) -> bool {
    if literal.negated {
        // A negated literal can't introduce bindings; it's resolvable once
        // every variable it reads is already bound.
        return all_vars_bound(&literal.expr, bound);
    }
    match &literal.expr {
        Expr::Binary { op: BinOp::Assign, lhs, rhs, .. } | Expr::Binary { op: BinOp::Unify, lhs, rhs, .. } => {
            let rhs_ready = all_vars_bound(rhs, bound);
            let lhs_ready = all_vars_bound(lhs, bound);
            if rhs_ready {
                bind_pattern_deep(lhs, bound);
            }
            if lhs_ready {
                bind_pattern_deep(rhs, bound);
            }
            all_vars_bound(lhs, bound) && all_vars_bound(rhs, bound)
        }
        Expr::Some(decl) => {
            if let Some((key, collection)) = &decl.in_expr {
                if !all_vars_bound(collection, bound) {
                    return false;
                }
                if let Some(k) = key {
                    bind_pattern_deep(k, bound);
                }
            }
            for var in &decl.vars {
                if !is_wildcard(var) {
                    bound.insert(var.clone());
                }
            }
            true
        }
        Expr::Membership { key, value, collection, .. } => {
            if !all_vars_bound(collection, bound) {
                return false;
            }
            bind_pattern_deep(value, bound);
            if let Some(k) = key {
                bind_pattern_deep(k, bound);
            }
            true
        }
        _ => all_vars_bound(&literal.expr, bound),
    }
}

/// Binds every free variable appearing in a value position (array/object
/// destructuring on the lhs of `:=`/`some ... in`), recursively.
fn bind_pattern_deep(expr: &Expr, bound: &mut IndexSet<Arc<str>>) {
    match expr {
        Expr::Var(name, _) => {
            if !is_wildcard(name) {
                bound.insert(name.clone());
            }
        }
        Expr::Array(items, _) | Expr::Set(items, _) => {
            for item in items {
                bind_pattern_deep(item, bound);
            }
        }
        Expr::Object(pairs, _) => {
            for (_, v) in pairs {
                bind_pattern_deep(v, bound);
            }
        }
        _ => {}
    }
}

fn all_vars_bound(expr: &Expr, bound: &IndexSet<Arc<str>>) -> bool {
    first_unbound_var(expr, bound).is_none()
}

fn first_unbound_var(expr: &Expr, bound: &IndexSet<Arc<str>>) -> Option<Arc<str>> {
    match expr {
        Expr::Var(name, _) => {
            if is_wildcard(name) || bound.contains(name) {
                None
            } else {
                Some(name.clone())
            }
        }
        Expr::Reference { base, args, .. } => {
            first_unbound_var(base, bound).or_else(|| {
                args.iter().find_map(|a| match a {
                    RefArg::Bracket(e) => first_unbound_var(e, bound),
                    RefArg::Dot(_) => None,
                })
            })
        }
        Expr::Array(items, _) | Expr::Set(items, _) => items.iter().find_map(|i| first_unbound_var(i, bound)),
        Expr::Object(pairs, _) => pairs.iter().find_map(|(k, v)| first_unbound_var(k, bound).or_else(|| first_unbound_var(v, bound))),
        Expr::Binary { lhs, rhs, .. } => first_unbound_var(lhs, bound).or_else(|| first_unbound_var(rhs, bound)),
        Expr::Unary { expr, .. } => first_unbound_var(expr, bound),
        Expr::Call { func, args, .. } => first_unbound_var(func, bound).or_else(|| args.iter().find_map(|a| first_unbound_var(a, bound))),
        Expr::Template { parts, .. } => parts.iter().find_map(|p| match p {
            rego_ast::ast::TemplatePart::Interpolate(e) => first_unbound_var(e, bound),
            rego_ast::ast::TemplatePart::Text(_) => None,
        }),
        Expr::Membership { value, collection, .. } => first_unbound_var(value, bound).or_else(|| first_unbound_var(collection, bound)),
        // Comprehensions introduce their own scope: bind their body against
        // a copy of the outer bound set, then resolve the term (or key and
        // value, for an object comprehension) against the result. A
        // variable free in the body or term that the comprehension never
        // binds itself, and that isn't bound outside it either, is unsafe.
        Expr::ArrayCompr { term, body, .. } | Expr::SetCompr { term, body, .. } => {
            let mut inner = bound.clone();
            if let Some(literal) = bind_body_fixed_point(body, &mut inner) {
                return first_unbound_var(&literal.expr, &inner);
            }
            first_unbound_var(term, &inner)
        }
        Expr::ObjectCompr { key, value, body, .. } => {
            let mut inner = bound.clone();
            if let Some(literal) = bind_body_fixed_point(body, &mut inner) {
                return first_unbound_var(&literal.expr, &inner);
            }
            first_unbound_var(key, &inner).or_else(|| first_unbound_var(value, &inner))
        }
        Expr::Literal(..) => None,
        Expr::Some(_) => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn global_names() -> IndexSet<Arc<str>> {
        IndexSet::from([Arc::from("input"), Arc::from("data")])
    }

    #[test]
    fn rejects_unbound_variable() {
        let module = rego_parser::parse_module("package p\n\na { x > 1 }\n").unwrap();
        let err = check_rule(&module.rules[0], &global_names());
        assert!(err.is_err());
    }

    #[test]
    fn accepts_variable_bound_by_assignment() {
        let module = rego_parser::parse_module("package p\n\na { x := 1; x > 0 }\n").unwrap();
        assert!(check_rule(&module.rules[0], &global_names()).is_ok());
    }

    #[test]
    fn accepts_variable_bound_by_later_literal() {
        let module = rego_parser::parse_module("package p\n\na { x > 0; x := 1 }\n").unwrap();
        assert!(check_rule(&module.rules[0], &global_names()).is_ok());
    }

    #[test]
    fn rejects_unbound_variable_used_only_inside_a_comprehension() {
        let module = rego_parser::parse_module("package p\n\na { xs := [y | z > 0] }\n").unwrap();
        let err = check_rule(&module.rules[0], &global_names());
        assert!(err.is_err());
    }

    #[test]
    fn accepts_a_comprehension_whose_variables_are_all_bound() {
        let module = rego_parser::parse_module("package p\n\na { xs := [y | z := [1, 2, 3][_]; y := z * 2] }\n").unwrap();
        assert!(check_rule(&module.rules[0], &global_names()).is_ok());
    }

    #[test]
    fn accepts_a_comprehension_term_bound_by_the_outer_rule() {
        let module = rego_parser::parse_module("package p\n\na { z := 1; xs := [z | true] }\n").unwrap();
        assert!(check_rule(&module.rules[0], &global_names()).is_ok());
    }
}
