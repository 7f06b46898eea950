//! Aggregate builtins over arrays and sets: `count`, `sum`, `max`, `min`,
//! `sort`, `all`, `any`.

use crate::registry::{arity_error, type_error, BuiltinFn};
use rego_ast::value::{Num, Value};
use rego_errors::RegoError;
use rego_span::Location;

pub const BUILTINS: &[(&str, BuiltinFn)] =
    &[("count", count), ("sum", sum), ("max", max), ("min", min), ("sort", sort), ("all", all), ("any", any)];

/// Collections that support iteration-based aggregation: arrays and sets
/// (objects are aggregated over their values in OPA; we mirror that here).
fn elements<'a>(name: &str, v: &'a Value, location: Location) -> Result<Vec<&'a Value>, RegoError> {
    match v {
        Value::Array(a) => Ok(a.iter().collect()),
        Value::Set(s) => Ok(s.iter().collect()),
        Value::Object(o) => Ok(o.values().collect()),
        _ => Err(type_error(name, location, format!("expected array, set or object, got {}", v.type_name()))),
    }
}

fn count(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("count", location, 1, args.len()));
    }
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        other => elements("count", other, location)?.len(),
    };
    Ok(Value::int(len as i64))
}

fn sum(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("sum", location, 1, args.len()));
    }
    let items = elements("sum", &args[0], location)?;
    let mut acc = Num::Int(0);
    for item in items {
        let n = item.as_number().ok_or_else(|| type_error("sum", location, "sum requires a collection of numbers"))?;
        acc = match (acc, n) {
            (Num::Int(a), Num::Int(b)) => a.checked_add(b).map(Num::Int).unwrap_or_else(|| Num::Float(a as f64 + b as f64)),
            _ => Num::Float(acc.as_f64() + n.as_f64()),
        };
    }
    Ok(Value::Number(acc))
}

fn max(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("max", location, 1, args.len()));
    }
    let items = elements("max", &args[0], location)?;
    items.into_iter().max().cloned().ok_or_else(|| type_error("max", location, "max of empty collection is undefined"))
}

fn min(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("min", location, 1, args.len()));
    }
    let items = elements("min", &args[0], location)?;
    items.into_iter().min().cloned().ok_or_else(|| type_error("min", location, "min of empty collection is undefined"))
}

fn sort(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("sort", location, 1, args.len()));
    }
    let mut items: Vec<Value> = elements("sort", &args[0], location)?.into_iter().cloned().collect();
    items.sort();
    Ok(Value::array(items))
}

fn all(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("all", location, 1, args.len()));
    }
    let items = elements("all", &args[0], location)?;
    Ok(Value::boolean(items.iter().all(|v| v.is_truthy())))
}

fn any(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("any", location, 1, args.len()));
    }
    let items = elements("any", &args[0], location)?;
    Ok(Value::boolean(items.iter().any(|v| v.is_truthy())))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sum_promotes_to_float_on_overflow() {
        let arr = Value::array(vec![Value::int(i64::MAX), Value::int(1)]);
        let Value::Number(n) = sum(&[arr], Location::dummy()).unwrap() else { panic!() };
        assert!(!n.is_integral());
    }

    #[test]
    fn sort_orders_mixed_numeric_values() {
        let arr = Value::array(vec![Value::int(3), Value::int(1), Value::float(2.0)]);
        let sorted = sort(&[arr], Location::dummy()).unwrap();
        assert_eq!(sorted, Value::array(vec![Value::int(1), Value::float(2.0), Value::int(3)]));
    }

    #[test]
    fn count_counts_string_chars_not_bytes() {
        assert_eq!(count(&[Value::string("abc")], Location::dummy()).unwrap(), Value::int(3));
    }
}
