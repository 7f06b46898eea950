//! Type-inspection builtins: `type_name` and the `is_*` family.

use crate::registry::{arity_error, BuiltinFn};
use rego_ast::value::Value;
use rego_errors::RegoError;
use rego_span::Location;

pub const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("type_name", type_name),
    ("is_number", is_number),
    ("is_string", is_string),
    ("is_boolean", is_boolean),
    ("is_null", is_null),
    ("is_array", is_array),
    ("is_object", is_object),
    ("is_set", is_set),
    ("equal", equal),
];

fn one<'a>(name: &str, args: &'a [Value], location: Location) -> Result<&'a Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error(name, location, 1, args.len()));
    }
    Ok(&args[0])
}

fn type_name(args: &[Value], location: Location) -> Result<Value, RegoError> {
    let v = one("type_name", args, location)?;
    Ok(Value::string(v.type_name()))
}

fn is_number(args: &[Value], location: Location) -> Result<Value, RegoError> {
    Ok(Value::boolean(matches!(one("is_number", args, location)?, Value::Number(_))))
}

fn is_string(args: &[Value], location: Location) -> Result<Value, RegoError> {
    Ok(Value::boolean(matches!(one("is_string", args, location)?, Value::String(_))))
}

fn is_boolean(args: &[Value], location: Location) -> Result<Value, RegoError> {
    Ok(Value::boolean(matches!(one("is_boolean", args, location)?, Value::Boolean(_))))
}

fn is_null(args: &[Value], location: Location) -> Result<Value, RegoError> {
    Ok(Value::boolean(matches!(one("is_null", args, location)?, Value::Null)))
}

fn is_array(args: &[Value], location: Location) -> Result<Value, RegoError> {
    Ok(Value::boolean(matches!(one("is_array", args, location)?, Value::Array(_))))
}

fn is_object(args: &[Value], location: Location) -> Result<Value, RegoError> {
    Ok(Value::boolean(matches!(one("is_object", args, location)?, Value::Object(_))))
}

fn is_set(args: &[Value], location: Location) -> Result<Value, RegoError> {
    Ok(Value::boolean(matches!(one("is_set", args, location)?, Value::Set(_))))
}

fn equal(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("equal", location, 2, args.len()));
    }
    Ok(Value::boolean(args[0] == args[1]))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn type_name_reports_each_shape() {
        assert_eq!(type_name(&[Value::int(1)], Location::dummy()).unwrap(), Value::string("number"));
        assert_eq!(type_name(&[Value::Null], Location::dummy()).unwrap(), Value::string("null"));
    }

    #[test]
    fn is_number_rejects_other_shapes() {
        assert_eq!(is_number(&[Value::string("x")], Location::dummy()).unwrap(), Value::boolean(false));
    }
}
