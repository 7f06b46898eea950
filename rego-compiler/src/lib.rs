//! Static checks that turn a parsed `rego_ast::Module` into a
//! `CompiledModule` ready for evaluation.

pub mod compiler;
pub mod conflicts;
pub mod dependency_graph;
pub mod indexing;
pub mod safety;

pub use compiler::{compile, CompiledModule, Compiler};
