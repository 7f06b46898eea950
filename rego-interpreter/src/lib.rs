//! Evaluator, unifier, and `with`-modifier engine for the Rego interpreter.
//!
//! This crate turns a [`rego_compiler::CompiledModule`] plus an
//! [`Environment`] (the `data`/`input` documents and builtin registry) into
//! concrete values, honoring memoization, `default`/`else` chains, and
//! scoped `with` replacements.

pub mod environment;
pub mod evaluator;
pub mod unifier;

pub use environment::{Environment, Root};
pub use evaluator::Evaluator;
pub use unifier::{unify, Bindings};
