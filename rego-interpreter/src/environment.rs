//! Evaluation context: the `data`/`input` documents, the builtin registry,
//! the memoization cache, the `with`-modifier overlay stack, and the
//! in-progress call set used to catch non-terminating recursion.
//!
//! `with` replacements are not applied by mutating `data`/`input` in place —
//! that would require threading `&mut Environment` through every recursive
//! call just for the rare literal that carries a `with` clause. Instead an
//! override is pushed onto a stack and resolution walks the stack
//! newest-first, falling back to the real document. Restoration happens via
//! `WithScope`'s `Drop` impl, so every exit path (normal return, `?`, panic)
//! unwinds the overlay together with the call stack.
//!
//! The memoization cache is a stack of frames rather than one flat map: a
//! `with` override changes what a rule computes, so a value memoized inside
//! one overlay must never leak out to (or survive into) evaluation under a
//! different overlay. `WithScope`/`BuiltinWithScope` push a fresh, empty
//! frame alongside the overlay they apply and discard it on drop, so a
//! rule re-entered under `with count as sum` always recomputes instead of
//! returning a value cached from an unmodified call.

use indexmap::{IndexMap, IndexSet};
use rego_ast::ast::Var;
use rego_ast::value::Value;
use rego_builtins::{ErrorMode, Registry};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Root {
    Data,
    Input,
}

#[derive(Clone, Debug)]
struct Overlay {
    root: Root,
    path: Vec<Arc<str>>,
    value: Value,
}

pub type MemoKey = (Arc<str>, Vec<Value>);

pub struct Environment {
    pub data: Value,
    pub input: Value,
    pub registry: Registry,
    pub error_mode: ErrorMode,
    overlays: RefCell<Vec<Overlay>>,
    builtin_overrides: RefCell<Vec<(Arc<str>, Arc<str>)>>,
    memo: RefCell<Vec<IndexMap<MemoKey, Option<Value>>>>,
    in_progress: RefCell<IndexSet<MemoKey>>,
}

impl Environment {
    pub fn new(data: Value, input: Value) -> Self {
        Self {
            data,
            input,
            registry: Registry::default(),
            error_mode: ErrorMode::Lenient,
            overlays: RefCell::new(Vec::new()),
            builtin_overrides: RefCell::new(Vec::new()),
            memo: RefCell::new(vec![IndexMap::new()]),
            in_progress: RefCell::new(IndexSet::new()),
        }
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    fn base_root(&self, root: Root) -> &Value {
        match root {
            Root::Data => &self.data,
            Root::Input => &self.input,
        }
    }

    /// Resolves `root` followed by `path`, honoring any active overlay.
    pub fn resolve(&self, root: Root, path: &[Arc<str>]) -> Option<Value> {
        let overlays = self.overlays.borrow();
        for overlay in overlays.iter().rev() {
            if overlay.root != root {
                continue;
            }
            if path.len() >= overlay.path.len() && path[..overlay.path.len()] == overlay.path[..] {
                let remainder = &path[overlay.path.len()..];
                return navigate(&overlay.value, remainder);
            }
        }
        navigate(self.base_root(root), path)
    }

    pub fn push_overlay(&self, root: Root, path: Vec<Arc<str>>, value: Value) {
        self.overlays.borrow_mut().push(Overlay { root, path, value });
        self.memo.borrow_mut().push(IndexMap::new());
    }

    pub fn pop_overlay(&self) {
        self.overlays.borrow_mut().pop();
        self.memo.borrow_mut().pop();
    }

    pub fn push_builtin_override(&self, name: Arc<str>, replacement: Arc<str>) {
        self.builtin_overrides.borrow_mut().push((name, replacement));
        self.memo.borrow_mut().push(IndexMap::new());
    }

    pub fn pop_builtin_override(&self) {
        self.builtin_overrides.borrow_mut().pop();
        self.memo.borrow_mut().pop();
    }

    /// Returns the name a builtin call should actually dispatch to, honoring
    /// the most recent active `with count as sum`-style override.
    pub fn resolve_builtin_name(&self, name: &Arc<str>) -> Arc<str> {
        let overrides = self.builtin_overrides.borrow();
        for (target, replacement) in overrides.iter().rev() {
            if target == name {
                return replacement.clone();
            }
        }
        name.clone()
    }

    /// Looks up `key` in the current (innermost) memo frame only — a value
    /// memoized under a different `with` overlay never shadows this one.
    pub fn memo_get(&self, key: &MemoKey) -> Option<Option<Value>> {
        let memo = self.memo.borrow();
        let hit = memo.last().expect("memo always has a base frame").get(key).cloned();
        if hit.is_some() {
            trace!(rule = %key.0, "memo hit");
        }
        hit
    }

    pub fn memo_set(&self, key: MemoKey, value: Option<Value>) {
        self.memo.borrow_mut().last_mut().expect("memo always has a base frame").insert(key, value);
    }

    /// Marks `key` as being evaluated. Returns `false` (and leaves the set
    /// unchanged) if `key` is already in progress, meaning the evaluator
    /// has re-entered a rule call without an intervening base case — actual
    /// infinite recursion rather than a dependency-graph cycle that happens
    /// to terminate on differing bindings.
    pub fn enter_call(&self, key: MemoKey) -> bool {
        self.in_progress.borrow_mut().insert(key)
    }

    pub fn exit_call(&self, key: &MemoKey) {
        self.in_progress.borrow_mut().shift_remove(key);
    }
}

pub(crate) fn navigate(root: &Value, path: &[Arc<str>]) -> Option<Value> {
    let mut current = root.clone();
    for segment in path {
        current = match &current {
            Value::Object(map) => map.get(&Value::string(segment.as_ref()))?.clone(),
            Value::Array(arr) => {
                let idx: usize = segment.parse().ok()?;
                arr.get(idx)?.clone()
            }
            _ => return None,
        };
    }
    Some(current)
}

/// RAII guard applying one `with` replacement for its lifetime.
pub struct WithScope<'a> {
    env: &'a Environment,
}

impl<'a> WithScope<'a> {
    pub fn push(env: &'a Environment, root: Root, path: Vec<Var>, value: Value) -> Self {
        env.push_overlay(root, path, value);
        Self { env }
    }
}

impl Drop for WithScope<'_> {
    fn drop(&mut self) {
        self.env.pop_overlay();
    }
}

/// RAII guard applying one `with <builtin> as <builtin>` replacement.
pub struct BuiltinWithScope<'a> {
    env: &'a Environment,
}

impl<'a> BuiltinWithScope<'a> {
    pub fn push(env: &'a Environment, name: Arc<str>, replacement: Arc<str>) -> Self {
        env.push_builtin_override(name, replacement);
        Self { env }
    }
}

impl Drop for BuiltinWithScope<'_> {
    fn drop(&mut self) {
        self.env.pop_builtin_override();
    }
}

/// RAII guard marking a rule/function call in progress for the guard's
/// lifetime, so the call is always removed from the in-progress set on
/// every exit path (`?`, a later `return`, or a panic unwinding).
pub struct CallGuard<'a> {
    env: &'a Environment,
    key: MemoKey,
}

impl<'a> CallGuard<'a> {
    /// Returns `None` if `key` is already in progress (a non-terminating
    /// recursive call), `Some(guard)` otherwise.
    pub fn enter(env: &'a Environment, key: MemoKey) -> Option<Self> {
        env.enter_call(key.clone()).then_some(Self { env, key })
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.env.exit_call(&self.key);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolves_nested_path_without_overlay() {
        let mut data = IndexMap::new();
        data.insert(Value::string("a"), Value::object({
            let mut m = IndexMap::new();
            m.insert(Value::string("b"), Value::int(1));
            m
        }));
        let env = Environment::new(Value::object(data), Value::Null);
        let path: Vec<Arc<str>> = vec![Arc::from("a"), Arc::from("b")];
        assert_eq!(env.resolve(Root::Data, &path), Some(Value::int(1)));
    }

    #[test]
    fn overlay_shadows_then_restores() {
        let env = Environment::new(Value::object(IndexMap::new()), Value::Null);
        let path: Vec<Arc<str>> = vec![];
        assert_eq!(env.resolve(Root::Input, &path), Some(Value::Null));
        {
            let _scope = WithScope::push(&env, Root::Input, vec![], Value::int(42));
            assert_eq!(env.resolve(Root::Input, &path), Some(Value::int(42)));
        }
        assert_eq!(env.resolve(Root::Input, &path), Some(Value::Null));
    }

    #[test]
    fn builtin_override_shadows_then_restores() {
        let env = Environment::new(Value::object(IndexMap::new()), Value::Null);
        let count: Arc<str> = Arc::from("count");
        let sum: Arc<str> = Arc::from("sum");
        assert_eq!(env.resolve_builtin_name(&count).as_ref(), "count");
        {
            let _scope = BuiltinWithScope::push(&env, count.clone(), sum.clone());
            assert_eq!(env.resolve_builtin_name(&count).as_ref(), "sum");
        }
        assert_eq!(env.resolve_builtin_name(&count).as_ref(), "count");
    }

    #[test]
    fn overlay_on_subpath_leaves_siblings_alone() {
        let mut data = IndexMap::new();
        data.insert(Value::string("a"), Value::int(1));
        data.insert(Value::string("b"), Value::int(2));
        let env = Environment::new(Value::object(data), Value::Null);
        let path_a: Vec<Arc<str>> = vec![Arc::from("a")];
        let path_b: Vec<Arc<str>> = vec![Arc::from("b")];
        let _scope = WithScope::push(&env, Root::Data, path_a.clone(), Value::int(99));
        assert_eq!(env.resolve(Root::Data, &path_a), Some(Value::int(99)));
        assert_eq!(env.resolve(Root::Data, &path_b), Some(Value::int(2)));
    }

    #[test]
    fn memo_entry_does_not_survive_a_with_overlay_and_is_restored_after() {
        let env = Environment::new(Value::object(IndexMap::new()), Value::Null);
        let key: MemoKey = (Arc::from("count"), vec![]);
        env.memo_set(key.clone(), Some(Value::int(1)));
        assert_eq!(env.memo_get(&key), Some(Some(Value::int(1))));
        {
            let _scope = WithScope::push(&env, Root::Input, vec![], Value::int(0));
            assert_eq!(env.memo_get(&key), None, "fresh overlay frame must not see the outer frame's cache");
            env.memo_set(key.clone(), Some(Value::int(2)));
            assert_eq!(env.memo_get(&key), Some(Some(Value::int(2))));
        }
        assert_eq!(env.memo_get(&key), Some(Some(Value::int(1))), "outer frame's cache must survive the overlay popping");
    }

    #[test]
    fn call_guard_rejects_reentrant_keys_and_releases_on_drop() {
        let env = Environment::new(Value::object(IndexMap::new()), Value::Null);
        let key: MemoKey = (Arc::from("a"), vec![]);
        {
            let _outer = CallGuard::enter(&env, key.clone()).expect("first entry should succeed");
            assert!(CallGuard::enter(&env, key.clone()).is_none(), "re-entering the same call must be rejected");
        }
        assert!(CallGuard::enter(&env, key).is_some(), "the key must be released once the guard drops");
    }
}
