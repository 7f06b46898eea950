//! Set algebra and object-merge builtins.

use crate::registry::{arity_error, type_error, BuiltinFn};
use indexmap::IndexMap;
use rego_ast::value::Value;
use rego_errors::RegoError;
use rego_span::Location;

pub const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("union", union),
    ("intersection", intersection),
    ("set_diff", set_diff),
    ("set", to_set),
    ("object.union", object_union),
    ("object.get", object_get),
    ("object.keys", object_keys),
    ("object.remove", object_remove),
    ("array.concat", array_concat),
    ("array.slice", array_slice),
    ("array.reverse", array_reverse),
];

fn as_set<'a>(name: &str, v: &'a Value, location: Location) -> Result<&'a indexmap::IndexSet<Value>, RegoError> {
    v.as_set().ok_or_else(|| type_error(name, location, format!("expected set, got {}", v.type_name())))
}

fn union(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("union", location, 1, args.len()));
    }
    // Takes a set of sets, per the standard library signature.
    let outer = as_set("union", &args[0], location)?;
    let mut result = indexmap::IndexSet::new();
    for inner in outer {
        for v in as_set("union", inner, location)? {
            result.insert(v.clone());
        }
    }
    Ok(Value::set(result))
}

fn intersection(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("intersection", location, 1, args.len()));
    }
    let outer = as_set("intersection", &args[0], location)?;
    let mut iter = outer.iter();
    let Some(first) = iter.next() else {
        return Ok(Value::set(indexmap::IndexSet::new()));
    };
    let mut result: indexmap::IndexSet<Value> = as_set("intersection", first, location)?.clone();
    for inner in iter {
        let set = as_set("intersection", inner, location)?;
        result.retain(|v| set.contains(v));
    }
    Ok(Value::set(result))
}

fn set_diff(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("set_diff", location, 2, args.len()));
    }
    let a = as_set("set_diff", &args[0], location)?;
    let b = as_set("set_diff", &args[1], location)?;
    Ok(Value::set(a.iter().filter(|v| !b.contains(*v)).cloned().collect()))
}

fn to_set(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("set", location, 1, args.len()));
    }
    match &args[0] {
        Value::Array(a) => Ok(Value::set(a.iter().cloned().collect())),
        Value::Set(s) => Ok(Value::Set(s.clone())),
        other => Err(type_error("set", location, format!("expected array or set, got {}", other.type_name()))),
    }
}

fn object_union(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("object.union", location, 2, args.len()));
    }
    let a = args[0].as_object().ok_or_else(|| type_error("object.union", location, "expected object"))?;
    let b = args[1].as_object().ok_or_else(|| type_error("object.union", location, "expected object"))?;
    let mut merged = a.clone();
    for (k, v) in b.iter() {
        merged.insert(k.clone(), v.clone());
    }
    Ok(Value::object(merged))
}

fn object_get(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 3 {
        return Err(arity_error("object.get", location, 3, args.len()));
    }
    let obj = args[0].as_object().ok_or_else(|| type_error("object.get", location, "expected object"))?;
    Ok(obj.get(&args[1]).cloned().unwrap_or_else(|| args[2].clone()))
}

fn object_keys(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("object.keys", location, 1, args.len()));
    }
    let obj = args[0].as_object().ok_or_else(|| type_error("object.keys", location, "expected object"))?;
    Ok(Value::set(obj.keys().cloned().collect()))
}

fn object_remove(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("object.remove", location, 2, args.len()));
    }
    let obj = args[0].as_object().ok_or_else(|| type_error("object.remove", location, "expected object"))?;
    let drop: Vec<Value> = match &args[1] {
        Value::Array(a) => a.iter().cloned().collect(),
        Value::Set(s) => s.iter().cloned().collect(),
        other => return Err(type_error("object.remove", location, format!("expected array or set of keys, got {}", other.type_name()))),
    };
    let mut out = obj.clone();
    for key in &drop {
        out.shift_remove(key);
    }
    Ok(Value::object(out))
}

fn array_concat(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("array.concat", location, 2, args.len()));
    }
    let a = args[0].as_array().ok_or_else(|| type_error("array.concat", location, "expected array"))?;
    let b = args[1].as_array().ok_or_else(|| type_error("array.concat", location, "expected array"))?;
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    Ok(Value::array(out))
}

fn array_slice(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 3 {
        return Err(arity_error("array.slice", location, 3, args.len()));
    }
    let arr = args[0].as_array().ok_or_else(|| type_error("array.slice", location, "expected array"))?;
    let start = args[1].as_number().ok_or_else(|| type_error("array.slice", location, "expected number"))?.as_f64() as usize;
    let stop = args[2].as_number().ok_or_else(|| type_error("array.slice", location, "expected number"))?.as_f64() as usize;
    let start = start.min(arr.len());
    let stop = stop.min(arr.len()).max(start);
    Ok(Value::array(arr[start..stop].to_vec()))
}

fn array_reverse(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("array.reverse", location, 1, args.len()));
    }
    let arr = args[0].as_array().ok_or_else(|| type_error("array.reverse", location, "expected array"))?;
    let mut out = arr.to_vec();
    out.reverse();
    Ok(Value::array(out))
}

#[allow(dead_code)]
fn empty_map() -> IndexMap<Value, Value> {
    IndexMap::new()
}

#[cfg(test)]
mod test {
    use super::*;
    use indexmap::IndexSet;

    fn set_of(items: &[Value]) -> Value {
        Value::set(items.iter().cloned().collect::<IndexSet<_>>())
    }

    #[test]
    fn union_flattens_set_of_sets() {
        let outer = set_of(&[set_of(&[Value::int(1)]), set_of(&[Value::int(2)])]);
        let Value::Set(result) = union(&[outer], Location::dummy()).unwrap() else { panic!() };
        assert!(result.contains(&Value::int(1)));
        assert!(result.contains(&Value::int(2)));
    }

    #[test]
    fn object_get_falls_back_to_default() {
        let obj = Value::object(IndexMap::new());
        assert_eq!(
            object_get(&[obj, Value::string("missing"), Value::int(9)], Location::dummy()).unwrap(),
            Value::int(9)
        );
    }

    #[test]
    fn set_diff_removes_shared_members() {
        let a = set_of(&[Value::int(1), Value::int(2)]);
        let b = set_of(&[Value::int(2)]);
        let Value::Set(result) = set_diff(&[a, b], Location::dummy()).unwrap() else { panic!() };
        assert!(result.contains(&Value::int(1)));
        assert!(!result.contains(&Value::int(2)));
    }

    #[test]
    fn object_keys_and_remove_round_trip() {
        let mut map = IndexMap::new();
        map.insert(Value::string("a"), Value::int(1));
        map.insert(Value::string("b"), Value::int(2));
        let obj = Value::object(map);
        let Value::Set(keys) = object_keys(&[obj.clone()], Location::dummy()).unwrap() else { panic!() };
        assert!(keys.contains(&Value::string("a")));
        let removed = object_remove(&[obj, set_of(&[Value::string("a")])], Location::dummy()).unwrap();
        let mut expected = IndexMap::new();
        expected.insert(Value::string("b"), Value::int(2));
        assert_eq!(removed, Value::object(expected));
    }

    #[test]
    fn array_reverse_reverses_order() {
        let arr = Value::array(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(
            array_reverse(&[arr], Location::dummy()).unwrap(),
            Value::array(vec![Value::int(3), Value::int(2), Value::int(1)])
        );
    }
}
