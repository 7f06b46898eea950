//! `rego-lang`: a compiler and evaluator for the Rego policy language.
//!
//! This crate is a thin facade over the pipeline crates
//! (`rego-parser` → `rego-compiler` → `rego-interpreter`), the way the
//! teacher's top-level crate re-exports its sub-crates' public surface
//! rather than re-implementing anything. [`Policy`] is the entry point most
//! callers want: compile a source string once, then evaluate any number of
//! queries (or the module's named rules) against different `input`
//! documents.

use rego_ast::value::Value;
pub use rego_compiler::CompiledModule;
pub use rego_errors::{ErrorKind, RegoError, Result};
use rego_interpreter::{Environment, Evaluator};
pub use rego_builtins::ErrorMode;

/// A compiled Rego module, ready to evaluate against any `input`/`data`.
pub struct Policy {
    compiled: CompiledModule,
}

impl Policy {
    /// Parses and compiles `source`, running every compiler pass (indexing,
    /// conflict checking, safety checking, dependency-cycle checking).
    pub fn compile(source: &str) -> Result<Self> {
        let compiled = rego_compiler::compile(source)?;
        Ok(Self { compiled })
    }

    pub fn module(&self) -> &rego_ast::ast::Module {
        &self.compiled.module
    }

    /// Evaluates the named rule (`allow`, `deny`, a partial set/object, or a
    /// function called with no arguments) against `data`/`input`, in the
    /// given builtin error mode.
    pub fn evaluate_rule(&self, name: &str, data: Value, input: Value, mode: ErrorMode) -> Result<Option<Value>> {
        let env = Environment::new(data, input).with_error_mode(mode);
        let evaluator = Evaluator::new(&env, &self.compiled);
        evaluator.eval_named(name)
    }

    /// Evaluates an ad hoc query expression (e.g. `data.policy.allow` or
    /// `input.x > 1`) against `data`/`input`.
    pub fn query(&self, source: &str, data: Value, input: Value, mode: ErrorMode) -> Result<Option<Value>> {
        let module = rego_parser::parse_module(&format!("package __query__\n\nresult := {source}\n"))?;
        let expr = match module.rules.first().map(|r| &r.head) {
            Some(rego_ast::ast::RuleHead::Complete { value: Some(expr), .. }) => expr.clone(),
            _ => return Err(rego_errors::ParseError::new(rego_span::Location::dummy(), "query must be a single expression").into()),
        };
        let env = Environment::new(data, input).with_error_mode(mode);
        let evaluator = Evaluator::new(&env, &self.compiled);
        evaluator.query(&expr)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn compiles_and_evaluates_a_simple_allow_rule() {
        let policy = Policy::compile("package example\n\nallow { input.user == \"admin\" }\n").unwrap();
        let mut input = IndexMap::new();
        input.insert(Value::string("user"), Value::string("admin"));
        let result = policy.evaluate_rule("allow", Value::object(IndexMap::new()), Value::object(input), ErrorMode::Lenient).unwrap();
        assert_eq!(result, Some(Value::Boolean(true)));
    }

    #[test]
    fn compiles_a_recursive_module_but_rejects_infinite_recursion_at_evaluation_time() {
        let policy = Policy::compile("package example\n\na { b }\nb { a }\n").unwrap();
        let err = policy.evaluate_rule("a", Value::object(IndexMap::new()), Value::Null, ErrorMode::Lenient).unwrap_err();
        assert!(format!("{err}").to_lowercase().contains("recursion"));
    }

    #[test]
    fn mutual_recursion_guarded_by_a_base_case_evaluates_without_error() {
        // `a` and `b` reference each other textually (a cyclic dependency
        // graph), but each one's recursive clause is guarded by a condition
        // that this input never satisfies, so the cycle is never actually
        // walked at evaluation time.
        let policy = Policy::compile(
            "package example\n\na { input.done; true }\na { not input.done; b }\nb { input.done; true }\nb { not input.done; a }\n",
        )
        .unwrap();
        let mut input = IndexMap::new();
        input.insert(Value::string("done"), Value::Boolean(true));
        let result = policy.evaluate_rule("a", Value::object(IndexMap::new()), Value::object(input), ErrorMode::Lenient).unwrap();
        assert_eq!(result, Some(Value::Boolean(true)));
    }
}
