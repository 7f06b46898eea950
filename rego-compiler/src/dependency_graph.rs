//! Rule dependency graph, in the shape of the teacher's `CallGraph`: a node
//! set plus an edge map. Informational only — the interpreter memoizes rule
//! results, so evaluation doesn't require topological order, and a cycle
//! here doesn't imply infinite recursion (it may terminate at runtime on
//! differing bindings). Actual non-terminating recursion is caught by
//! `rego-interpreter`'s in-progress guard during evaluation, not here.

use indexmap::{IndexMap, IndexSet};
use rego_ast::ast::{Expr, Module, RefArg, Rule};
use std::sync::Arc;

pub type RuleName = Arc<str>;

#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: IndexSet<RuleName>,
    edges: IndexMap<RuleName, IndexSet<RuleName>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, from: RuleName, to: RuleName) {
        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());
        self.edges.entry(from).or_default().insert(to);
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.as_ref() == name)
    }

    pub fn dependencies_of(&self, name: &str) -> Vec<RuleName> {
        self.edges.get(name).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }
}

/// Builds the dependency graph by scanning every rule body for references
/// into the local module's own rule names.
pub fn build(module: &Module) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    let local_names: IndexSet<RuleName> = module.rules.iter().map(|r| r.head.name().clone()).collect();
    for rule in &module.rules {
        let from = rule.head.name().clone();
        graph.nodes.insert(from.clone());
        for literal in all_literals(rule) {
            collect_refs(&literal.expr, &local_names, &mut |target| graph.add_edge(from.clone(), target));
        }
    }
    graph
}

fn all_literals(rule: &Rule) -> Vec<&rego_ast::ast::Literal> {
    let mut out: Vec<&rego_ast::ast::Literal> = rule.body.iter().collect();
    for else_rule in &rule.else_rules {
        out.extend(else_rule.body.iter());
    }
    out
}

fn collect_refs(expr: &Expr, local_names: &IndexSet<RuleName>, visit: &mut impl FnMut(RuleName)) {
    match expr {
        Expr::Var(name, _) => {
            if local_names.contains(name) {
                visit(name.clone());
            }
        }
        Expr::Reference { base, args, .. } => {
            collect_refs(base, local_names, visit);
            for arg in args {
                if let RefArg::Bracket(e) = arg {
                    collect_refs(e, local_names, visit);
                }
            }
        }
        Expr::Array(items, _) | Expr::Set(items, _) => {
            for item in items {
                collect_refs(item, local_names, visit);
            }
        }
        Expr::Object(pairs, _) => {
            for (k, v) in pairs {
                collect_refs(k, local_names, visit);
                collect_refs(v, local_names, visit);
            }
        }
        Expr::ArrayCompr { term, body, .. } | Expr::SetCompr { term, body, .. } => {
            collect_refs(term, local_names, visit);
            for lit in body {
                collect_refs(&lit.expr, local_names, visit);
            }
        }
        Expr::ObjectCompr { key, value, body, .. } => {
            collect_refs(key, local_names, visit);
            collect_refs(value, local_names, visit);
            for lit in body {
                collect_refs(&lit.expr, local_names, visit);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect_refs(lhs, local_names, visit);
            collect_refs(rhs, local_names, visit);
        }
        Expr::Unary { expr, .. } => collect_refs(expr, local_names, visit),
        Expr::Call { func, args, .. } => {
            collect_refs(func, local_names, visit);
            for arg in args {
                collect_refs(arg, local_names, visit);
            }
        }
        Expr::Template { parts, .. } => {
            for part in parts {
                if let rego_ast::ast::TemplatePart::Interpolate(e) = part {
                    collect_refs(e, local_names, visit);
                }
            }
        }
        Expr::Membership { key, value, collection, .. } => {
            if let Some(k) = key {
                collect_refs(k, local_names, visit);
            }
            collect_refs(value, local_names, visit);
            collect_refs(collection, local_names, visit);
        }
        Expr::Some(decl) => {
            if let Some((key, collection)) = &decl.in_expr {
                if let Some(k) = key {
                    collect_refs(k, local_names, visit);
                }
                collect_refs(collection, local_names, visit);
            }
        }
        Expr::Literal(..) => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_a_direct_edge_between_mutually_referencing_rules() {
        let module = rego_parser::parse_module("package p\n\na { b }\nb { a }\n").unwrap();
        let graph = build(&module);
        assert_eq!(graph.dependencies_of("a"), vec![Arc::from("b")]);
        assert_eq!(graph.dependencies_of("b"), vec![Arc::from("a")]);
    }

    #[test]
    fn records_dependencies_of_an_acyclic_module() {
        let module = rego_parser::parse_module("package p\n\na { true }\nb { a }\n").unwrap();
        let graph = build(&module);
        assert!(graph.dependencies_of("a").is_empty());
        assert_eq!(graph.dependencies_of("b"), vec![Arc::from("a")]);
    }
}
