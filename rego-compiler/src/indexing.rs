//! Groups a module's rules by head name, the first pass of compilation —
//! the direct analogue of the teacher's symbol-table pass.

use indexmap::IndexMap;
use rego_ast::ast::{Module, Rule};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct RuleIndex {
    pub by_name: IndexMap<Arc<str>, Vec<Rule>>,
}

impl RuleIndex {
    pub fn get(&self, name: &str) -> Option<&[Rule]> {
        self.by_name.get(name).map(|v| v.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.by_name.keys()
    }
}

pub fn build(module: &Module) -> RuleIndex {
    let mut by_name: IndexMap<Arc<str>, Vec<Rule>> = IndexMap::new();
    for rule in &module.rules {
        by_name.entry(rule.head.name().clone()).or_default().push(rule.clone());
    }
    RuleIndex { by_name }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn groups_rules_sharing_a_head_name() {
        let module = rego_parser::parse_module("package p\n\na { true }\na { false }\n").unwrap();
        let index = build(&module);
        assert_eq!(index.get("a").unwrap().len(), 2);
    }
}
