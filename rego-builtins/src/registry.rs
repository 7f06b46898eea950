//! The builtin function registry: a name → implementation table, with
//! support for per-evaluation overlays so the `with`-modifier engine can
//! shadow a builtin's implementation the way it shadows `data`/`input`.

use crate::{aggregates, casts, collections, strings, types};
use indexmap::IndexMap;
use rego_ast::value::Value;
use rego_errors::{BuiltinArgumentError, RegoError};
use rego_span::Location;

/// Strict mode turns a builtin's own argument-type errors into `RegoError`;
/// lenient mode turns them into the Rego-standard "undefined" result
/// instead, matching how OPA's default evaluation mode treats most builtin
/// errors as silent failure of the containing expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorMode {
    Strict,
    Lenient,
}

pub type BuiltinFn = fn(&[Value], Location) -> Result<Value, RegoError>;

#[derive(Clone)]
pub struct Registry {
    table: IndexMap<&'static str, BuiltinFn>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut table: IndexMap<&'static str, BuiltinFn> = IndexMap::new();
        for (name, f) in types::BUILTINS {
            table.insert(*name, *f);
        }
        for (name, f) in aggregates::BUILTINS {
            table.insert(*name, *f);
        }
        for (name, f) in strings::BUILTINS {
            table.insert(*name, *f);
        }
        for (name, f) in collections::BUILTINS {
            table.insert(*name, *f);
        }
        for (name, f) in casts::BUILTINS {
            table.insert(*name, *f);
        }
        Self { table }
    }
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<BuiltinFn> {
        self.table.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Returns a clone of this registry with `name` shadowed by `f`, used by
    /// `with func.name as ...`-style replacement (a Rego extension some
    /// hosts support; kept here because the `with` engine treats function
    /// references and data references through the same replacement map).
    pub fn with_override(&self, name: &'static str, f: BuiltinFn) -> Self {
        let mut table = self.table.clone();
        table.insert(name, f);
        Self { table }
    }

    /// Dispatches `name(args)`, applying `mode` to decide whether an
    /// argument-shape mismatch is a hard error or an undefined result.
    pub fn call(&self, name: &str, args: &[Value], location: Location, mode: ErrorMode) -> Result<Option<Value>, RegoError> {
        let Some(f) = self.get(name) else {
            return Err(BuiltinArgumentError::new(location, format!("unknown builtin `{name}`"), name.to_string()).into());
        };
        match f(args, location) {
            Ok(v) => Ok(Some(v)),
            Err(RegoError::BuiltinArgument(_)) if mode == ErrorMode::Lenient => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn arity_error(context: &str, location: Location, expected: usize, got: usize) -> RegoError {
    BuiltinArgumentError::new(location, format!("expected {expected} argument(s), got {got}"), context.to_string()).into()
}

pub(crate) fn type_error(context: &str, location: Location, message: impl Into<String>) -> RegoError {
    BuiltinArgumentError::new(location, message.into(), context.to_string()).into()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registry_resolves_known_builtin() {
        let reg = Registry::default();
        assert!(reg.contains("count"));
        assert!(reg.contains("sprintf"));
        assert!(!reg.contains("definitely_not_a_builtin"));
    }
}
