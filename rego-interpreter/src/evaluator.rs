//! The evaluator: walks a `CompiledModule`'s rules and an ad hoc query
//! against an [`Environment`], producing the trivalent (`Some`/`None`)
//! results the spec calls for. Bodies are solved as a small Datalog-style
//! search — each literal narrows or multiplies the set of variable
//! bindings flowing out of the literal before it — rather than compiled to
//! a flat boolean expression, because partial rules, comprehensions, and
//! `some`/`every` all need to enumerate, not just test.
//!
//! Known simplification: literals are solved strictly in source order. The
//! safety checker (`rego_compiler::safety`) is more permissive — it accepts
//! a variable bound by a literal appearing later in the body — because that
//! matches real Rego's order-independent safety analysis. A body that
//! relies on that leniency compiles, but a literal reading a not-yet-bound
//! variable evaluates it as undefined rather than deferring. Policies
//! written with bindings before use (the overwhelmingly common style) are
//! unaffected.

use crate::environment::{navigate, BuiltinWithScope, CallGuard, Environment, MemoKey, Root, WithScope};
use crate::unifier::{is_wildcard, unify, Bindings};
use indexmap::{IndexMap, IndexSet};
use rego_ast::ast::*;
use rego_ast::value::{Num, Value};
use rego_compiler::CompiledModule;
use rego_errors::{BuiltinArgumentError, EvaluationError, RegoError, TypeError};
use rego_span::Location;
use std::cmp::Ordering;
use std::sync::Arc;

pub struct Evaluator<'a> {
    pub env: &'a Environment,
    pub compiled: &'a CompiledModule,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: &'a Environment, compiled: &'a CompiledModule) -> Self {
        Self { env, compiled }
    }

    /// Evaluates a free-standing query expression (not part of any rule)
    /// against empty bindings, returning its first solution's value.
    pub fn query(&self, expr: &Expr) -> Result<Option<Value>, RegoError> {
        let literal = Literal { negated: false, expr: expr.clone(), with_mods: Vec::new(), location: expr.location() };
        let solutions = self.eval_literal(&literal, Bindings::new())?;
        let Some(first) = solutions.into_iter().next() else { return Ok(None) };
        self.eval_expr(expr, &first)
    }

    // ---- bodies and literals --------------------------------------------

    pub fn eval_body(&self, body: &[Literal], bindings: Bindings) -> Result<Vec<Bindings>, RegoError> {
        let mut current = vec![bindings];
        for literal in body {
            let mut next = Vec::new();
            for b in current {
                next.extend(self.eval_literal(literal, b)?);
            }
            if next.is_empty() {
                return Ok(Vec::new());
            }
            current = next;
        }
        Ok(current)
    }

    pub fn eval_literal(&self, literal: &Literal, bindings: Bindings) -> Result<Vec<Bindings>, RegoError> {
        if literal.with_mods.is_empty() {
            return self.eval_literal_body(literal, bindings);
        }
        let mut data_scopes = Vec::new();
        let mut builtin_scopes = Vec::new();
        for modifier in &literal.with_mods {
            match self.builtin_override_target(&modifier.target) {
                Some(target_name) => {
                    let replacement = self.builtin_override_replacement(&modifier.value, modifier.location)?;
                    builtin_scopes.push(BuiltinWithScope::push(self.env, target_name, replacement));
                }
                None => {
                    let value = self
                        .eval_expr(&modifier.value, &bindings)?
                        .ok_or_else(|| EvaluationError::new(modifier.location, "`with` replacement value is undefined", "with modifier"))?;
                    let (root, path) = self.with_target(&modifier.target, modifier.location)?;
                    data_scopes.push(WithScope::push(self.env, root, path, value));
                }
            }
        }
        let result = self.eval_literal_body(literal, bindings);
        drop(builtin_scopes);
        drop(data_scopes);
        result
    }

    /// `with count as sum` names a builtin on the left, not an `input`/`data`
    /// path; recognized by a bare single-segment reference matching a
    /// registered builtin name.
    fn builtin_override_target(&self, target: &Expr) -> Option<Arc<str>> {
        let path = target.static_path()?;
        if path.len() != 1 || path[0].as_ref() == "input" || path[0].as_ref() == "data" {
            return None;
        }
        self.env.registry.contains(&path[0]).then(|| path[0].clone())
    }

    fn builtin_override_replacement(&self, value: &Expr, location: Location) -> Result<Arc<str>, RegoError> {
        match value.static_path() {
            Some(path) if path.len() == 1 && self.env.registry.contains(&path[0]) => Ok(path[0].clone()),
            _ => Err(EvaluationError::new(location, "`with` replacement for a builtin must name another builtin", "with modifier").into()),
        }
    }

    fn with_target(&self, target: &Expr, location: Location) -> Result<(Root, Vec<Arc<str>>), RegoError> {
        let path = target
            .static_path()
            .ok_or_else(|| EvaluationError::new(location, "`with` target must be a literal reference into input or data", "with modifier"))?;
        match path.split_first() {
            Some((head, rest)) if head.as_ref() == "input" => Ok((Root::Input, rest.to_vec())),
            Some((head, rest)) if head.as_ref() == "data" => Ok((Root::Data, rest.to_vec())),
            _ => Err(EvaluationError::new(location, "`with` target must start with `input` or `data`", "with modifier").into()),
        }
    }

    fn eval_literal_body(&self, literal: &Literal, bindings: Bindings) -> Result<Vec<Bindings>, RegoError> {
        if literal.negated {
            let positive = Literal { negated: false, ..literal.clone() };
            let solutions = self.eval_literal_body(&positive, bindings.clone())?;
            return Ok(if solutions.is_empty() { vec![bindings] } else { Vec::new() });
        }

        match &literal.expr {
            Expr::Some(decl) => self.eval_some(decl, bindings),
            Expr::Call { func, args, .. } if is_every_marker(func) => self.eval_every(args, bindings),
            Expr::Binary { op: BinOp::Assign, lhs, rhs, .. } | Expr::Binary { op: BinOp::Unify, lhs, rhs, .. } => {
                self.eval_assign(lhs, rhs, bindings)
            }
            Expr::Membership { key, value, collection, .. } => self.eval_membership_literal(key, value, collection, bindings),
            other => match self.eval_expr(other, &bindings)? {
                Some(v) if v.is_truthy() => Ok(vec![bindings]),
                _ => Ok(Vec::new()),
            },
        }
    }

    fn eval_some(&self, decl: &SomeDecl, bindings: Bindings) -> Result<Vec<Bindings>, RegoError> {
        let Some((key_pat, collection_expr)) = &decl.in_expr else {
            // A bare `some x, y` just reserves the names; nothing to bind yet.
            return Ok(vec![bindings]);
        };
        let Some(collection) = self.eval_expr(collection_expr, &bindings)? else { return Ok(Vec::new()) };
        let value_var = decl.vars.last().expect("some decl always has at least one variable");
        let mut out = Vec::new();
        for (k, v) in iter_pairs(&collection) {
            let mut next = bindings.clone();
            if let Some(key_pat) = key_pat {
                if !unify(key_pat, &k, &mut next, &|e, b| self.eval_expr(e, b).ok().flatten()) {
                    continue;
                }
            }
            if !bind_or_match(value_var, v, &mut next) {
                continue;
            }
            out.push(next);
        }
        Ok(out)
    }

    fn eval_every(&self, args: &[Expr], bindings: Bindings) -> Result<Vec<Bindings>, RegoError> {
        let Some(domain) = self.eval_expr(&args[2], &bindings)? else { return Ok(Vec::new()) };
        let value_name = match &args[1] {
            Expr::Var(name, _) => name,
            _ => unreachable!("every desugars its value slot to a bare Var"),
        };
        let key_name = match &args[0] {
            Expr::Var(name, _) => Some(name),
            _ => None,
        };
        let Expr::ArrayCompr { body, .. } = &args[3] else {
            unreachable!("every desugars its body into an ArrayCompr")
        };
        for (k, v) in iter_pairs(&domain) {
            let mut iteration = bindings.clone();
            if let Some(key_name) = key_name {
                iteration.insert(key_name.clone(), k);
            }
            iteration.insert(value_name.clone(), v);
            if self.eval_body(body, iteration)?.is_empty() {
                return Ok(Vec::new());
            }
        }
        Ok(vec![bindings])
    }

    fn eval_assign(&self, lhs: &Expr, rhs: &Expr, bindings: Bindings) -> Result<Vec<Bindings>, RegoError> {
        let eval_cb = |e: &Expr, b: &Bindings| self.eval_expr(e, b).ok().flatten();
        if let Some(rhs_val) = self.eval_expr(rhs, &bindings)? {
            let mut next = bindings.clone();
            return Ok(if unify(lhs, &rhs_val, &mut next, &eval_cb) { vec![next] } else { Vec::new() });
        }
        if let Some(lhs_val) = self.eval_expr(lhs, &bindings)? {
            let mut next = bindings.clone();
            return Ok(if unify(rhs, &lhs_val, &mut next, &eval_cb) { vec![next] } else { Vec::new() });
        }
        Ok(Vec::new())
    }

    fn eval_membership_literal(&self, key: &Option<Box<Expr>>, value: &Expr, collection: &Expr, bindings: Bindings) -> Result<Vec<Bindings>, RegoError> {
        let Some(collection_val) = self.eval_expr(collection, &bindings)? else { return Ok(Vec::new()) };
        let value_is_free = matches!(value, Expr::Var(name, _) if !is_wildcard(name) && !bindings.contains_key(name));
        if value_is_free {
            let Expr::Var(name, _) = value else { unreachable!() };
            let mut out = Vec::new();
            for (k, v) in iter_pairs(&collection_val) {
                let mut next = bindings.clone();
                if let Some(key_pat) = key {
                    if !unify(key_pat, &k, &mut next, &|e, b| self.eval_expr(e, b).ok().flatten()) {
                        continue;
                    }
                }
                next.insert(name.clone(), v);
                out.push(next);
            }
            return Ok(out);
        }
        let Some(value_val) = self.eval_expr(value, &bindings)? else { return Ok(Vec::new()) };
        let found = iter_pairs(&collection_val).into_iter().any(|(k, v)| {
            v == value_val
                && key.as_ref().map(|k_expr| self.eval_expr(k_expr, &bindings).ok().flatten() == Some(k.clone())).unwrap_or(true)
        });
        Ok(if found { vec![bindings] } else { Vec::new() })
    }

    // ---- expressions ------------------------------------------------------

    pub fn eval_expr(&self, expr: &Expr, bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        match expr {
            Expr::Literal(v, _) => Ok(Some(v.clone())),
            Expr::Var(name, _) => self.resolve_var(name, bindings),
            Expr::Reference { base, args, location } => self.eval_reference(base, args, *location, bindings),
            Expr::Array(items, _) => self.eval_array(items, bindings),
            Expr::Object(pairs, _) => self.eval_object(pairs, bindings),
            Expr::Set(items, _) => self.eval_set(items, bindings),
            Expr::ArrayCompr { term, body, .. } => {
                let solutions = self.eval_body(body, bindings.clone())?;
                let mut out = Vec::with_capacity(solutions.len());
                for sol in &solutions {
                    if let Some(v) = self.eval_expr(term, sol)? {
                        out.push(v);
                    }
                }
                Ok(Some(Value::array(out)))
            }
            Expr::SetCompr { term, body, .. } => {
                let solutions = self.eval_body(body, bindings.clone())?;
                let mut out = IndexSet::new();
                for sol in &solutions {
                    if let Some(v) = self.eval_expr(term, sol)? {
                        out.insert(v);
                    }
                }
                Ok(Some(Value::set(out)))
            }
            Expr::ObjectCompr { key, value, body, location } => {
                let solutions = self.eval_body(body, bindings.clone())?;
                let mut out = IndexMap::new();
                for sol in &solutions {
                    let (Some(k), Some(v)) = (self.eval_expr(key, sol)?, self.eval_expr(value, sol)?) else { continue };
                    if let Some(existing) = out.get(&k) {
                        if existing != &v {
                            return Err(EvaluationError::new(*location, "object comprehension produced conflicting values for the same key", "object comprehension").into());
                        }
                    } else {
                        out.insert(k, v);
                    }
                }
                Ok(Some(Value::object(out)))
            }
            Expr::Binary { op, lhs, rhs, location } => self.eval_binary(*op, lhs, rhs, *location, bindings),
            Expr::Unary { op: UnOp::Neg, expr, location } => match self.eval_expr(expr, bindings)? {
                Some(Value::Number(n)) => Ok(Some(Value::Number(negate(n)))),
                Some(other) => Err(TypeError::new(*location, format!("unary `-` requires a number, got {}", other.type_name()), "unary negation").into()),
                None => Ok(None),
            },
            Expr::Call { func, args, location } => self.eval_call(func, args, *location, bindings),
            Expr::Template { parts, .. } => self.eval_template(parts, bindings),
            Expr::Some(_) => Ok(Some(Value::Boolean(true))),
            Expr::Membership { key, value, collection, .. } => {
                let (Some(collection_val), Some(value_val)) = (self.eval_expr(collection, bindings)?, self.eval_expr(value, bindings)?) else {
                    return Ok(None);
                };
                let found = iter_pairs(&collection_val).into_iter().any(|(k, v)| {
                    v == value_val && key.as_ref().map(|k_expr| self.eval_expr(k_expr, bindings).ok().flatten() == Some(k.clone())).unwrap_or(true)
                });
                Ok(Some(Value::boolean(found)))
            }
        }
    }

    fn eval_array(&self, items: &[Expr], bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match self.eval_expr(item, bindings)? {
                Some(v) => out.push(v),
                None => return Ok(None),
            }
        }
        Ok(Some(Value::array(out)))
    }

    fn eval_object(&self, pairs: &[(Expr, Expr)], bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        let mut map = IndexMap::new();
        for (k, v) in pairs {
            let Some(kv) = self.eval_expr(k, bindings)? else { return Ok(None) };
            let Some(vv) = self.eval_expr(v, bindings)? else { return Ok(None) };
            map.insert(kv, vv);
        }
        Ok(Some(Value::object(map)))
    }

    fn eval_set(&self, items: &[Expr], bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        let mut out = IndexSet::new();
        for item in items {
            match self.eval_expr(item, bindings)? {
                Some(v) => {
                    out.insert(v);
                }
                None => return Ok(None),
            }
        }
        Ok(Some(Value::set(out)))
    }

    fn eval_template(&self, parts: &[TemplatePart], bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Text(s) => out.push_str(s),
                TemplatePart::Interpolate(e) => match self.eval_expr(e, bindings)? {
                    Some(Value::String(s)) => out.push_str(&s),
                    Some(v) => out.push_str(&v.to_string()),
                    None => out.push_str("<undefined>"),
                },
            }
        }
        Ok(Some(Value::string(out)))
    }

    fn eval_binary(&self, op: BinOp, lhs: &Expr, rhs: &Expr, location: Location, bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        match op {
            BinOp::Assign | BinOp::Unify => {
                let (l, r) = (self.eval_expr(lhs, bindings)?, self.eval_expr(rhs, bindings)?);
                Ok(match (l, r) {
                    (Some(a), Some(b)) => Some(Value::boolean(a == b)),
                    _ => None,
                })
            }
            BinOp::Eq => self.compare(lhs, rhs, bindings, |o| o == Ordering::Equal),
            BinOp::Ne => self.compare(lhs, rhs, bindings, |o| o != Ordering::Equal),
            BinOp::Lt => self.compare(lhs, rhs, bindings, |o| o == Ordering::Less),
            BinOp::Le => self.compare(lhs, rhs, bindings, |o| o != Ordering::Greater),
            BinOp::Gt => self.compare(lhs, rhs, bindings, |o| o == Ordering::Greater),
            BinOp::Ge => self.compare(lhs, rhs, bindings, |o| o != Ordering::Less),
            BinOp::Or => self.eval_set_or_bool(true, lhs, rhs, location, bindings),
            BinOp::And => self.eval_set_or_bool(false, lhs, rhs, location, bindings),
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => self.eval_arith(op, lhs, rhs, location, bindings),
        }
    }

    fn compare(&self, lhs: &Expr, rhs: &Expr, bindings: &Bindings, pred: impl Fn(Ordering) -> bool) -> Result<Option<Value>, RegoError> {
        let (l, r) = (self.eval_expr(lhs, bindings)?, self.eval_expr(rhs, bindings)?);
        Ok(match (l, r) {
            (Some(a), Some(b)) => Some(Value::boolean(pred(a.cmp(&b)))),
            _ => None,
        })
    }

    fn eval_set_or_bool(&self, is_or: bool, lhs: &Expr, rhs: &Expr, location: Location, bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        let (l, r) = (self.eval_expr(lhs, bindings)?, self.eval_expr(rhs, bindings)?);
        match (l, r) {
            (Some(Value::Set(a)), Some(Value::Set(b))) => {
                let result: IndexSet<Value> = if is_or { a.union(&b).cloned().collect() } else { a.intersection(&b).cloned().collect() };
                Ok(Some(Value::set(result)))
            }
            (Some(Value::Boolean(a)), Some(Value::Boolean(b))) => Ok(Some(Value::boolean(if is_or { a || b } else { a && b }))),
            (Some(a), Some(b)) => Err(TypeError::new(
                location,
                format!("`{}` requires two sets or two booleans, got {} and {}", if is_or { "|" } else { "&" }, a.type_name(), b.type_name()),
                "binary operator",
            )
            .into()),
            _ => Ok(None),
        }
    }

    fn eval_arith(&self, op: BinOp, lhs: &Expr, rhs: &Expr, location: Location, bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        let (l, r) = (self.eval_expr(lhs, bindings)?, self.eval_expr(rhs, bindings)?);
        let (Some(l), Some(r)) = (l, r) else { return Ok(None) };
        let (Value::Number(a), Value::Number(b)) = (l, r) else {
            return Err(TypeError::new(location, "arithmetic requires two numbers", "arithmetic").into());
        };
        let value = match op {
            BinOp::Add => match (a, b) {
                (Num::Int(x), Num::Int(y)) => x.checked_add(y).map(Num::Int).unwrap_or(Num::Float(x as f64 + y as f64)),
                _ => Num::Float(a.as_f64() + b.as_f64()),
            },
            BinOp::Sub => match (a, b) {
                (Num::Int(x), Num::Int(y)) => x.checked_sub(y).map(Num::Int).unwrap_or(Num::Float(x as f64 - y as f64)),
                _ => Num::Float(a.as_f64() - b.as_f64()),
            },
            BinOp::Mul => match (a, b) {
                (Num::Int(x), Num::Int(y)) => x.checked_mul(y).map(Num::Int).unwrap_or(Num::Float(x as f64 * y as f64)),
                _ => Num::Float(a.as_f64() * b.as_f64()),
            },
            BinOp::Div => {
                if b.as_f64() == 0.0 {
                    return Ok(None);
                }
                match (a, b) {
                    (Num::Int(x), Num::Int(y)) if x % y == 0 => Num::Int(x / y),
                    _ => Num::Float(a.as_f64() / b.as_f64()),
                }
            }
            BinOp::Mod => match (a, b) {
                (Num::Int(_), Num::Int(0)) => return Ok(None),
                (Num::Int(x), Num::Int(y)) => Num::Int(x % y),
                _ => return Err(TypeError::new(location, "`%` requires two integers", "arithmetic").into()),
            },
            _ => unreachable!(),
        };
        Ok(Some(Value::Number(value)))
    }

    fn eval_call(&self, func: &Expr, args: &[Expr], location: Location, bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        let name: Arc<str> = match func {
            Expr::Var(n, _) => n.clone(),
            _ => match func.static_path() {
                Some(path) => {
                    let joined = path.iter().map(|s| s.as_ref()).collect::<Vec<&str>>().join(".");
                    Arc::from(joined.as_str())
                }
                None => return Err(BuiltinArgumentError::new(location, "function reference must be a literal name or path", "call").into()),
            },
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match self.eval_expr(arg, bindings)? {
                Some(v) => values.push(v),
                None => return Ok(None),
            }
        }
        if self.env.registry.contains(&name) {
            let effective = self.env.resolve_builtin_name(&name);
            return self.env.registry.call(&effective, &values, location, self.env.error_mode);
        }
        if self.compiled.rule_index.get(&name).is_some() {
            return self.eval_function(&name, &values);
        }
        Err(BuiltinArgumentError::new(location, format!("unknown function `{name}`"), name.to_string()).into())
    }

    // ---- references and rule dispatch -------------------------------------

    fn resolve_var(&self, name: &Arc<str>, bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        if let Some(v) = bindings.get(name) {
            return Ok(Some(v.clone()));
        }
        match name.as_ref() {
            "input" => return Ok(self.env.resolve(Root::Input, &[])),
            "data" => return Ok(self.env.resolve(Root::Data, &[])),
            _ => {}
        }
        if self.compiled.rule_index.get(name).is_some() {
            return self.eval_named(name);
        }
        Ok(None)
    }

    fn eval_reference(&self, base: &Expr, args: &[RefArg], location: Location, bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        if let Some(path) = static_ref_path(base, args) {
            if let Some((head, rest)) = path.split_first() {
                match head.as_ref() {
                    "data" => return self.resolve_data_path(rest, location, bindings),
                    "input" => return Ok(self.env.resolve(Root::Input, rest)),
                    _ => {}
                }
            }
        }
        let Some(mut current) = self.eval_expr(base, bindings)? else { return Ok(None) };
        for arg in args {
            match self.navigate_dynamic(&current, arg, bindings)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn navigate_dynamic(&self, current: &Value, arg: &RefArg, bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        match arg {
            RefArg::Dot(name) => Ok(match current {
                Value::Object(o) => o.get(&Value::string(name.as_ref())).cloned(),
                _ => None,
            }),
            RefArg::Bracket(expr) => {
                let Some(key) = self.eval_expr(expr, bindings)? else { return Ok(None) };
                Ok(match current {
                    Value::Object(o) => o.get(&key).cloned(),
                    Value::Array(a) => match key.as_number() {
                        Some(n) if n.as_f64() >= 0.0 => a.get(n.as_f64() as usize).cloned(),
                        _ => None,
                    },
                    Value::Set(s) => {
                        if s.contains(&key) {
                            Some(key)
                        } else {
                            None
                        }
                    }
                    _ => None,
                })
            }
        }
    }

    fn resolve_data_path(&self, path: &[Arc<str>], location: Location, bindings: &Bindings) -> Result<Option<Value>, RegoError> {
        let _ = (location, bindings);
        if path.is_empty() {
            return Ok(self.env.resolve(Root::Data, &[]));
        }
        let pkg = &self.compiled.module.package.path;
        let remainder: &[Arc<str>] = if path.len() >= pkg.len() && path[..pkg.len()] == pkg[..] { &path[pkg.len()..] } else { path };
        if let Some((name, rest)) = remainder.split_first() {
            if self.compiled.rule_index.get(name).is_some() {
                let value = self.eval_named(name)?;
                return Ok(value.and_then(|v| navigate(&v, rest)));
            }
        }
        Ok(self.env.resolve(Root::Data, path))
    }

    /// Evaluates a rule by name, independent of a reference expression —
    /// used both by variable/reference resolution and by callers that want
    /// a named rule's value directly (the CLI's `--query` default).
    pub fn eval_named(&self, name: &str) -> Result<Option<Value>, RegoError> {
        let rules = self.compiled.rule_index.get(name).expect("caller already checked the rule exists");
        match &rules[0].head {
            RuleHead::Complete { .. } => self.eval_complete(name),
            RuleHead::PartialSet { .. } => self.eval_partial_set(name).map(Some),
            RuleHead::PartialObject { .. } => self.eval_partial_object(name).map(Some),
            RuleHead::Function { .. } => Ok(None),
        }
    }

    fn eval_complete(&self, name: &str) -> Result<Option<Value>, RegoError> {
        let key: MemoKey = (Arc::from(name), Vec::new());
        if let Some(cached) = self.env.memo_get(&key) {
            return Ok(cached);
        }
        let Some(_guard) = CallGuard::enter(self.env, key.clone()) else {
            return Err(EvaluationError::new(
                Location::dummy(),
                format!("infinite recursion evaluating rule `{name}`"),
                "rule evaluation",
            )
            .into());
        };
        let rules = self.compiled.rule_index.get(name).expect("checked by caller");
        let mut result: Option<Value> = None;
        let mut default_value: Option<Value> = None;
        for rule in rules {
            if rule.default {
                default_value = Some(self.eval_rule_with_else(rule, Bindings::new())?.unwrap_or(Value::Boolean(true)));
                continue;
            }
            if let Some(v) = self.eval_rule_with_else(rule, Bindings::new())? {
                match &result {
                    None => result = Some(v),
                    Some(existing) if *existing == v => {}
                    Some(_) => {
                        return Err(EvaluationError::new(rule.location, format!("complete rule `{name}` produced conflicting values"), format!("rule {name}")).into())
                    }
                }
            }
        }
        let value = result.or(default_value);
        self.env.memo_set(key, value.clone());
        Ok(value)
    }

    fn eval_function(&self, name: &str, args: &[Value]) -> Result<Option<Value>, RegoError> {
        let key: MemoKey = (Arc::from(name), args.to_vec());
        if let Some(cached) = self.env.memo_get(&key) {
            return Ok(cached);
        }
        let Some(_guard) = CallGuard::enter(self.env, key.clone()) else {
            return Err(EvaluationError::new(
                Location::dummy(),
                format!("infinite recursion evaluating function `{name}`"),
                "function evaluation",
            )
            .into());
        };
        let rules = self.compiled.rule_index.get(name).expect("checked by caller");
        let mut result: Option<Value> = None;
        for rule in rules {
            let RuleHead::Function { args: patterns, .. } = &rule.head else { continue };
            if patterns.len() != args.len() {
                continue;
            }
            let mut seed = Bindings::new();
            let eval_cb = |e: &Expr, b: &Bindings| self.eval_expr(e, b).ok().flatten();
            let matched = patterns.iter().zip(args.iter()).all(|(p, v)| unify(p, v, &mut seed, &eval_cb));
            if !matched {
                continue;
            }
            if let Some(v) = self.eval_rule_with_else(rule, seed)? {
                match &result {
                    None => result = Some(v),
                    Some(existing) if *existing == v => {}
                    Some(_) => {
                        return Err(EvaluationError::new(rule.location, format!("function `{name}` produced conflicting values for the same arguments"), format!("function {name}")).into())
                    }
                }
            }
        }
        self.env.memo_set(key, result.clone());
        Ok(result)
    }

    fn eval_rule_with_else(&self, rule: &Rule, seed: Bindings) -> Result<Option<Value>, RegoError> {
        let solutions = self.eval_body(&rule.body, seed.clone())?;
        if !solutions.is_empty() {
            return self.resolve_head_value(&rule.head, &solutions).map(Some);
        }
        for else_rule in &rule.else_rules {
            let else_solutions = self.eval_body(&else_rule.body, seed.clone())?;
            if !else_solutions.is_empty() {
                let value = match &else_rule.value {
                    Some(expr) => self.eval_expr(expr, &else_solutions[0])?.unwrap_or(Value::Boolean(true)),
                    None => Value::Boolean(true),
                };
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn resolve_head_value(&self, head: &RuleHead, solutions: &[Bindings]) -> Result<Value, RegoError> {
        let value_expr = match head {
            RuleHead::Complete { value, .. } => value,
            RuleHead::Function { value, .. } => value,
            _ => unreachable!("resolve_head_value only called for Complete/Function heads"),
        };
        let Some(value_expr) = value_expr else { return Ok(Value::Boolean(true)) };
        let mut result: Option<Value> = None;
        for sol in solutions {
            if let Some(v) = self.eval_expr(value_expr, sol)? {
                match &result {
                    None => result = Some(v),
                    Some(existing) if *existing == v => {}
                    Some(_) => return Err(EvaluationError::new(value_expr.location(), "rule body produced conflicting values across solutions", "rule head").into()),
                }
            }
        }
        Ok(result.unwrap_or(Value::Boolean(true)))
    }

    fn eval_partial_set(&self, name: &str) -> Result<Value, RegoError> {
        let key: MemoKey = (Arc::from(name), Vec::new());
        if let Some(Some(cached)) = self.env.memo_get(&key) {
            return Ok(cached);
        }
        let Some(_guard) = CallGuard::enter(self.env, key.clone()) else {
            return Err(EvaluationError::new(
                Location::dummy(),
                format!("infinite recursion evaluating rule `{name}`"),
                "rule evaluation",
            )
            .into());
        };
        let rules = self.compiled.rule_index.get(name).expect("checked by caller");
        let mut out = IndexSet::new();
        for rule in rules {
            let RuleHead::PartialSet { key: key_expr, .. } = &rule.head else { continue };
            for sol in self.eval_body(&rule.body, Bindings::new())? {
                if let Some(v) = self.eval_expr(key_expr, &sol)? {
                    out.insert(v);
                }
            }
        }
        let value = Value::set(out);
        self.env.memo_set(key, Some(value.clone()));
        Ok(value)
    }

    fn eval_partial_object(&self, name: &str) -> Result<Value, RegoError> {
        let key: MemoKey = (Arc::from(name), Vec::new());
        if let Some(Some(cached)) = self.env.memo_get(&key) {
            return Ok(cached);
        }
        let Some(_guard) = CallGuard::enter(self.env, key.clone()) else {
            return Err(EvaluationError::new(
                Location::dummy(),
                format!("infinite recursion evaluating rule `{name}`"),
                "rule evaluation",
            )
            .into());
        };
        let rules = self.compiled.rule_index.get(name).expect("checked by caller");
        let mut out = IndexMap::new();
        for rule in rules {
            let RuleHead::PartialObject { key: key_expr, field, value: value_expr, .. } = &rule.head else { continue };
            for sol in self.eval_body(&rule.body, Bindings::new())? {
                let (Some(k), Some(v)) = (self.eval_expr(key_expr, &sol)?, self.eval_expr(value_expr, &sol)?) else { continue };
                match field {
                    // `name[k].field := v` — several rules sharing a key each
                    // contribute one field of a nested object at that key.
                    Some(field) => {
                        let nested = out.entry(k).or_insert_with(|| Value::object(IndexMap::new()));
                        let Value::Object(existing) = nested else { unreachable!("always constructed as an object") };
                        let mut updated = (**existing).clone();
                        if let Some(prior) = updated.get(&Value::string(field.as_ref())) {
                            if prior != &v {
                                return Err(EvaluationError::new(
                                    rule.location,
                                    format!("partial object rule `{name}` has conflicting values for field `{field}`"),
                                    format!("rule {name}"),
                                )
                                .into());
                            }
                        } else {
                            updated.insert(Value::string(field.as_ref()), v);
                        }
                        *nested = Value::object(updated);
                    }
                    None => {
                        if let Some(existing) = out.get(&k) {
                            if existing != &v {
                                return Err(EvaluationError::new(rule.location, format!("partial object rule `{name}` has conflicting values for the same key"), format!("rule {name}")).into());
                            }
                        } else {
                            out.insert(k, v);
                        }
                    }
                }
            }
        }
        let value = Value::object(out);
        self.env.memo_set(key, Some(value.clone()));
        Ok(value)
    }
}

fn negate(n: Num) -> Num {
    match n {
        Num::Int(i) => Num::Int(-i),
        Num::Float(f) => Num::Float(-f),
    }
}

fn is_every_marker(func: &Expr) -> bool {
    matches!(func, Expr::Var(name, _) if name.as_ref() == "__every__")
}

fn bind_or_match(name: &Arc<str>, value: Value, bindings: &mut Bindings) -> bool {
    if is_wildcard(name) {
        return true;
    }
    match bindings.get(name) {
        Some(existing) => *existing == value,
        None => {
            bindings.insert(name.clone(), value);
            true
        }
    }
}

fn static_ref_path(base: &Expr, args: &[RefArg]) -> Option<Vec<Arc<str>>> {
    let mut path = base.static_path()?;
    for arg in args {
        match arg {
            RefArg::Dot(name) => path.push(name.clone()),
            RefArg::Bracket(Expr::Literal(Value::String(s), _)) => path.push(s.clone()),
            _ => return None,
        }
    }
    Some(path)
}

/// Iterates any collection shape as `(key-or-index, value)` pairs: arrays
/// yield integer indices, objects yield their keys, and sets yield each
/// member as both "key" and value (indexing and membership coincide).
fn iter_pairs(value: &Value) -> Vec<(Value, Value)> {
    match value {
        Value::Array(a) => a.iter().enumerate().map(|(i, v)| (Value::int(i as i64), v.clone())).collect(),
        Value::Object(o) => o.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Set(s) => s.iter().map(|v| (v.clone(), v.clone())).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rego_compiler::compile;

    fn eval_allow(source: &str, input: Value) -> Option<Value> {
        let compiled = compile(source).unwrap();
        let env = Environment::new(Value::object(IndexMap::new()), input);
        let evaluator = Evaluator::new(&env, &compiled);
        evaluator.eval_named("allow").unwrap()
    }

    #[test]
    fn evaluates_complete_rule_with_literal_body() {
        assert_eq!(eval_allow("package p\n\nallow { true }\n", Value::Null), Some(Value::Boolean(true)));
    }

    #[test]
    fn evaluates_input_comparison() {
        let mut input = IndexMap::new();
        input.insert(Value::string("role"), Value::string("admin"));
        let src = "package p\n\nallow { input.role == \"admin\" }\n";
        assert_eq!(eval_allow(src, Value::object(input)), Some(Value::Boolean(true)));
    }

    #[test]
    fn undefined_when_body_never_succeeds() {
        let mut input = IndexMap::new();
        input.insert(Value::string("role"), Value::string("guest"));
        let src = "package p\n\nallow { input.role == \"admin\" }\n";
        assert_eq!(eval_allow(src, Value::object(input)), None);
    }

    #[test]
    fn evaluates_partial_set_rule() {
        let compiled = compile("package p\n\nnames[x] { x := \"a\" }\nnames[x] { x := \"b\" }\n").unwrap();
        let env = Environment::new(Value::object(IndexMap::new()), Value::Null);
        let evaluator = Evaluator::new(&env, &compiled);
        let Value::Set(set) = evaluator.eval_named("names").unwrap().unwrap() else { panic!() };
        assert!(set.contains(&Value::string("a")));
        assert!(set.contains(&Value::string("b")));
    }

    #[test]
    fn with_modifier_overrides_input_for_its_literal() {
        let compiled = compile("package p\n\nallow { input.x == 1 with input as {\"x\": 1} }\n").unwrap();
        let env = Environment::new(Value::object(IndexMap::new()), Value::Null);
        let evaluator = Evaluator::new(&env, &compiled);
        assert_eq!(evaluator.eval_named("allow").unwrap(), Some(Value::Boolean(true)));
    }

    #[test]
    fn negation_succeeds_when_inner_expression_is_undefined() {
        let compiled = compile("package p\n\nallow { not input.missing }\n").unwrap();
        let env = Environment::new(Value::object(IndexMap::new()), Value::object(IndexMap::new()));
        let evaluator = Evaluator::new(&env, &compiled);
        assert_eq!(evaluator.eval_named("allow").unwrap(), Some(Value::Boolean(true)));
    }

    #[test]
    fn every_requires_all_elements_to_satisfy_the_body() {
        let compiled = compile("package p\n\nallow { every x in [1, 2, 3] { x > 0 } }\n").unwrap();
        let env = Environment::new(Value::object(IndexMap::new()), Value::Null);
        let evaluator = Evaluator::new(&env, &compiled);
        assert_eq!(evaluator.eval_named("allow").unwrap(), Some(Value::Boolean(true)));
    }
}

#[cfg(test)]
mod proptest_evaluator {
    use super::*;
    use proptest::prelude::*;
    use rego_compiler::compile;

    proptest! {
        /// Dotting into a scalar `input` is Undefined no matter what the
        /// scalar is — navigation never treats a number, string, or bool
        /// as a traversable collection.
        #[test]
        fn scalar_input_reference_is_always_undefined(n in any::<i32>()) {
            let compiled = compile("package p\n\nallow { input.x == 1 }\n").unwrap();
            let env = Environment::new(Value::object(IndexMap::new()), Value::int(n as i64));
            let evaluator = Evaluator::new(&env, &compiled);
            prop_assert_eq!(evaluator.eval_named("allow").unwrap(), None);
        }

        /// A `with input as ...` override is scoped to the single literal
        /// it's attached to: the next literal in the same body sees the
        /// environment's real input again, whatever value it holds.
        #[test]
        fn with_override_does_not_leak_past_its_literal(n in -1000i64..1000) {
            let source = format!(
                "package p\n\nallow {{ input.x == 1 with input as {{\"x\": 1}}; input.x == {n} }}\n"
            );
            let compiled = compile(&source).unwrap();
            let mut input = IndexMap::new();
            input.insert(Value::string("x"), Value::int(n));
            let env = Environment::new(Value::object(IndexMap::new()), Value::object(input));
            let evaluator = Evaluator::new(&env, &compiled);
            prop_assert_eq!(evaluator.eval_named("allow").unwrap(), Some(Value::Boolean(true)));
        }
    }
}
