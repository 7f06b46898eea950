//! Casting builtins between strings, numbers, and collections.

use crate::registry::{arity_error, type_error, BuiltinFn};
use rego_ast::value::Value;
use rego_errors::RegoError;
use rego_span::Location;

pub const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("to_number", to_number),
    ("cast_string", cast_string),
    ("cast_boolean", cast_boolean),
    ("cast_array", cast_array),
    ("cast_set", cast_set),
    ("cast_object", cast_object),
];

fn to_number(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("to_number", location, 1, args.len()));
    }
    match &args[0] {
        Value::Number(_) => Ok(args[0].clone()),
        Value::Boolean(b) => Ok(Value::int(if *b { 1 } else { 0 })),
        Value::String(s) => {
            if let Ok(i) = s.parse::<i64>() {
                Ok(Value::int(i))
            } else if let Ok(f) = s.parse::<f64>() {
                Ok(Value::float(f))
            } else {
                Err(type_error("to_number", location, format!("cannot parse `{s}` as a number")))
            }
        }
        other => Err(type_error("to_number", location, format!("cannot convert {} to a number", other.type_name()))),
    }
}

/// Renders any value the way it would appear in a policy's formatted output,
/// rather than re-quoting strings (`cast_string("x")` is `"x"`, not `"\"x\""`).
fn cast_string(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("cast_string", location, 1, args.len()));
    }
    Ok(match &args[0] {
        Value::String(s) => Value::String(s.clone()),
        other => Value::string(other.to_string()),
    })
}

fn cast_boolean(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("cast_boolean", location, 1, args.len()));
    }
    match &args[0] {
        Value::Boolean(b) => Ok(Value::boolean(*b)),
        Value::String(s) if s.as_ref() == "true" => Ok(Value::boolean(true)),
        Value::String(s) if s.as_ref() == "false" => Ok(Value::boolean(false)),
        other => Err(type_error("cast_boolean", location, format!("cannot cast {} to boolean", other.type_name()))),
    }
}

fn cast_array(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("cast_array", location, 1, args.len()));
    }
    match &args[0] {
        Value::Array(a) => Ok(Value::Array(a.clone())),
        Value::Set(s) => Ok(Value::array(s.iter().cloned().collect())),
        other => Err(type_error("cast_array", location, format!("cannot cast {} to array", other.type_name()))),
    }
}

fn cast_set(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("cast_set", location, 1, args.len()));
    }
    match &args[0] {
        Value::Set(s) => Ok(Value::Set(s.clone())),
        Value::Array(a) => Ok(Value::set(a.iter().cloned().collect())),
        other => Err(type_error("cast_set", location, format!("cannot cast {} to set", other.type_name()))),
    }
}

fn cast_object(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("cast_object", location, 1, args.len()));
    }
    match &args[0] {
        Value::Object(o) => Ok(Value::Object(o.clone())),
        other => Err(type_error("cast_object", location, format!("cannot cast {} to object", other.type_name()))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn to_number_parses_strings() {
        assert_eq!(to_number(&[Value::string("42")], Location::dummy()).unwrap(), Value::int(42));
        assert_eq!(to_number(&[Value::string("3.5")], Location::dummy()).unwrap(), Value::float(3.5));
    }

    #[test]
    fn to_number_rejects_garbage() {
        assert!(to_number(&[Value::string("nope")], Location::dummy()).is_err());
    }

    #[test]
    fn cast_string_does_not_requote_strings() {
        assert_eq!(cast_string(&[Value::string("x")], Location::dummy()).unwrap(), Value::string("x"));
        assert_eq!(cast_string(&[Value::int(5)], Location::dummy()).unwrap(), Value::string("5"));
    }

    #[test]
    fn cast_boolean_parses_string_literals() {
        assert_eq!(cast_boolean(&[Value::string("true")], Location::dummy()).unwrap(), Value::boolean(true));
        assert!(cast_boolean(&[Value::string("yes")], Location::dummy()).is_err());
    }

    #[test]
    fn cast_array_and_set_convert_between_each_other() {
        let set = Value::set([Value::int(1), Value::int(2)].into_iter().collect());
        let Value::Array(arr) = cast_array(&[set], Location::dummy()).unwrap() else { panic!() };
        assert_eq!(arr.len(), 2);
    }
}
