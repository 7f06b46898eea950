//! Orchestrates the compilation pipeline in the shape of the teacher's
//! `Compiler` struct: a handful of named pass methods called in a fixed
//! order by `compiler_stages`, producing an immutable artifact.

use crate::conflicts;
use crate::dependency_graph::{self, DependencyGraph};
use crate::indexing::{self, RuleIndex};
use crate::safety;
use indexmap::IndexSet;
use rego_ast::ast::Module;
use rego_errors::RegoError;
use std::sync::Arc;
use tracing::debug;

/// The immutable result of compiling one Rego module: everything the
/// interpreter needs to evaluate queries against it.
#[derive(Clone, Debug)]
pub struct CompiledModule {
    pub module: Module,
    pub rule_index: RuleIndex,
    pub dependency_graph: DependencyGraph,
}

pub struct Compiler {
    source: String,
}

impl Compiler {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    pub fn compile(&self) -> Result<CompiledModule, RegoError> {
        let module = self.parse_pass()?;
        self.compiler_stages(module)
    }

    fn parse_pass(&self) -> Result<Module, RegoError> {
        debug!("parsing module");
        rego_parser::parse_module(&self.source)
    }

    /// Runs the remaining passes in a fixed order, each consuming the
    /// previous stage's output — mirrors the teacher's `compiler_stages`.
    fn compiler_stages(&self, module: Module) -> Result<CompiledModule, RegoError> {
        let rule_index = self.indexing_pass(&module);
        self.conflict_pass(&rule_index)?;
        self.safety_pass(&module)?;
        let dependency_graph = self.dependency_pass(&module)?;
        Ok(CompiledModule { module, rule_index, dependency_graph })
    }

    fn indexing_pass(&self, module: &Module) -> RuleIndex {
        debug!("indexing rules");
        indexing::build(module)
    }

    fn conflict_pass(&self, index: &RuleIndex) -> Result<(), RegoError> {
        debug!("checking rule head conflicts");
        conflicts::check(index).map_err(RegoError::from)
    }

    fn safety_pass(&self, module: &Module) -> Result<(), RegoError> {
        debug!("checking variable safety");
        let globals: IndexSet<Arc<str>> = IndexSet::from([Arc::from("input"), Arc::from("data")]);
        for rule in &module.rules {
            safety::check_rule(rule, &globals).map_err(RegoError::from)?;
        }
        Ok(())
    }

    /// Builds the call graph for informational use (the interpreter doesn't
    /// need topological order — rule results are memoized — but the graph
    /// is handy for tooling). Cyclic rule references are not rejected here:
    /// many cycles terminate at runtime (e.g. mutual recursion guarded by
    /// differing conditions), so the only sound place to catch a cycle that
    /// actually never bottoms out is at evaluation time, via the in-progress
    /// guard in `rego-interpreter`'s `Environment`.
    fn dependency_pass(&self, module: &Module) -> Result<DependencyGraph, RegoError> {
        debug!("building rule dependency graph");
        Ok(dependency_graph::build(module))
    }
}

pub fn compile(source: &str) -> Result<CompiledModule, RegoError> {
    Compiler::new(source).compile()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn compiles_a_simple_module() {
        let compiled = compile("package p\n\nallow { input.x == 1 }\n").unwrap();
        assert_eq!(compiled.module.package.path, vec![Arc::from("p")]);
        assert!(compiled.rule_index.get("allow").is_some());
    }

    #[test]
    fn compiles_a_mutually_recursive_module_without_rejecting_the_cycle() {
        // Whether `a`/`b` actually terminate depends on runtime bindings
        // (e.g. differing guards), so the dependency graph records the
        // cycle without rejecting it; only the evaluator can tell a
        // terminating mutual call from an infinite one.
        let compiled = compile("package p\n\na { b }\nb { a }\n").unwrap();
        assert!(compiled.dependency_graph.contains_node("a"));
        assert!(compiled.dependency_graph.contains_node("b"));
    }

    #[test]
    fn rejects_unsafe_variable() {
        let err = compile("package p\n\na { x > 1 }\n");
        assert!(err.is_err());
    }
}
