//! Structural rule-head conflict checks: a name cannot be defined as both a
//! complete rule and a partial set/object, function arity cannot vary
//! across definitions, and `default` may only appear once per name.

use crate::indexing::RuleIndex;
use rego_ast::ast::RuleHead;
use rego_errors::CompileError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    Complete,
    PartialSet,
    PartialObject,
    Function(usize),
}

fn shape_of(head: &RuleHead) -> Shape {
    match head {
        RuleHead::Complete { .. } => Shape::Complete,
        RuleHead::PartialSet { .. } => Shape::PartialSet,
        RuleHead::PartialObject { .. } => Shape::PartialObject,
        RuleHead::Function { args, .. } => Shape::Function(args.len()),
    }
}

pub fn check(index: &RuleIndex) -> Result<(), CompileError> {
    for (name, rules) in &index.by_name {
        let mut default_count = 0;
        let mut unconditional_value_count = 0;
        let first_shape = shape_of(&rules[0].head);
        for rule in rules {
            if rule.default {
                default_count += 1;
            }
            let shape = shape_of(&rule.head);
            let compatible = match (first_shape, shape) {
                (Shape::Function(a), Shape::Function(b)) => a == b,
                (a, b) => a == b,
            };
            if !compatible {
                return Err(CompileError::new(
                    rule.location,
                    format!("rule `{name}` is defined with conflicting head shapes"),
                    format!("rule {name}"),
                ));
            }
            let is_unconditional_value = !rule.default
                && rule.body.is_empty()
                && matches!(&rule.head, RuleHead::Complete { value: Some(_), .. });
            if is_unconditional_value {
                unconditional_value_count += 1;
            }
        }
        if default_count > 1 {
            return Err(CompileError::new(
                rules[0].location,
                format!("rule `{name}` has more than one `default` definition"),
                format!("rule {name}"),
            ));
        }
        if unconditional_value_count > 1 {
            return Err(CompileError::new(
                rules[0].location,
                format!("rule `{name}` has more than one unconditional value assignment"),
                format!("rule {name}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::indexing;

    #[test]
    fn rejects_mixed_complete_and_partial_set() {
        let module = rego_parser::parse_module("package p\n\na { true }\na[x] { x := 1 }\n").unwrap();
        let index = indexing::build(&module);
        assert!(check(&index).is_err());
    }

    #[test]
    fn allows_multiple_complete_definitions() {
        let module = rego_parser::parse_module("package p\n\na { true }\na { false }\n").unwrap();
        let index = indexing::build(&module);
        assert!(check(&index).is_ok());
    }

    #[test]
    fn rejects_more_than_one_unconditional_value_assignment() {
        let module = rego_parser::parse_module("package p\n\na := 1\na := 2\n").unwrap();
        let index = indexing::build(&module);
        assert!(check(&index).is_err());
    }

    #[test]
    fn allows_a_single_unconditional_value_alongside_conditional_ones() {
        let module = rego_parser::parse_module("package p\n\na := 1\na := 2 { false }\n").unwrap();
        let index = indexing::build(&module);
        assert!(check(&index).is_ok());
    }
}
