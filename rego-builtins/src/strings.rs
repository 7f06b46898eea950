//! String manipulation and formatting builtins, including the `sprintf`/
//! `format_int` verb subset called out as a supplemented feature.

use crate::registry::{arity_error, type_error, BuiltinFn};
use rego_ast::value::{Num, Value};
use rego_errors::RegoError;
use rego_span::Location;

pub const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("concat", concat),
    ("contains", contains),
    ("startswith", startswith),
    ("endswith", endswith),
    ("upper", upper),
    ("lower", lower),
    ("trim", trim),
    ("trim_left", trim_left),
    ("trim_right", trim_right),
    ("trim_space", trim_space),
    ("split", split),
    ("sprintf", sprintf),
    ("format_int", format_int),
    ("replace", replace),
    ("indexof", indexof),
    ("substring", substring),
];

fn as_str<'a>(name: &str, v: &'a Value, location: Location) -> Result<&'a str, RegoError> {
    v.as_str().ok_or_else(|| type_error(name, location, format!("expected string, got {}", v.type_name())))
}

fn concat(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("concat", location, 2, args.len()));
    }
    let sep = as_str("concat", &args[0], location)?;
    let parts: Vec<&str> = match &args[1] {
        Value::Array(a) => a.iter().map(|v| as_str("concat", v, location)).collect::<Result<_, _>>()?,
        Value::Set(s) => s.iter().map(|v| as_str("concat", v, location)).collect::<Result<_, _>>()?,
        other => return Err(type_error("concat", location, format!("expected array or set, got {}", other.type_name()))),
    };
    Ok(Value::string(parts.join(sep)))
}

fn contains(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("contains", location, 2, args.len()));
    }
    let haystack = as_str("contains", &args[0], location)?;
    let needle = as_str("contains", &args[1], location)?;
    Ok(Value::boolean(haystack.contains(needle)))
}

fn startswith(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("startswith", location, 2, args.len()));
    }
    Ok(Value::boolean(as_str("startswith", &args[0], location)?.starts_with(as_str("startswith", &args[1], location)?)))
}

fn endswith(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("endswith", location, 2, args.len()));
    }
    Ok(Value::boolean(as_str("endswith", &args[0], location)?.ends_with(as_str("endswith", &args[1], location)?)))
}

fn upper(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("upper", location, 1, args.len()));
    }
    Ok(Value::string(as_str("upper", &args[0], location)?.to_uppercase()))
}

fn lower(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("lower", location, 1, args.len()));
    }
    Ok(Value::string(as_str("lower", &args[0], location)?.to_lowercase()))
}

fn trim(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("trim", location, 2, args.len()));
    }
    let s = as_str("trim", &args[0], location)?;
    let cutset = as_str("trim", &args[1], location)?;
    Ok(Value::string(s.trim_matches(|c| cutset.contains(c))))
}

fn trim_left(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("trim_left", location, 2, args.len()));
    }
    let s = as_str("trim_left", &args[0], location)?;
    let cutset = as_str("trim_left", &args[1], location)?;
    Ok(Value::string(s.trim_start_matches(|c| cutset.contains(c))))
}

fn trim_right(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("trim_right", location, 2, args.len()));
    }
    let s = as_str("trim_right", &args[0], location)?;
    let cutset = as_str("trim_right", &args[1], location)?;
    Ok(Value::string(s.trim_end_matches(|c| cutset.contains(c))))
}

fn trim_space(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 1 {
        return Err(arity_error("trim_space", location, 1, args.len()));
    }
    Ok(Value::string(as_str("trim_space", &args[0], location)?.trim()))
}

/// Character-index (not byte-index) search, matching OPA's `indexof` contract.
fn indexof(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("indexof", location, 2, args.len()));
    }
    let haystack = as_str("indexof", &args[0], location)?;
    let needle = as_str("indexof", &args[1], location)?;
    let chars: Vec<char> = haystack.chars().collect();
    let needle_chars: Vec<char> = needle.chars().collect();
    let found = if needle_chars.is_empty() {
        Some(0)
    } else {
        chars.windows(needle_chars.len()).position(|w| w == needle_chars.as_slice())
    };
    Ok(Value::int(found.map(|i| i as i64).unwrap_or(-1)))
}

fn substring(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 3 {
        return Err(arity_error("substring", location, 3, args.len()));
    }
    let s = as_str("substring", &args[0], location)?;
    let start = args[1].as_number().ok_or_else(|| type_error("substring", location, "expected number"))?.as_f64() as usize;
    let length = args[2].as_number().ok_or_else(|| type_error("substring", location, "expected number"))?.as_f64();
    let chars: Vec<char> = s.chars().collect();
    let start = start.min(chars.len());
    let end = if length < 0.0 { chars.len() } else { (start + length as usize).min(chars.len()) };
    Ok(Value::string(chars[start..end].iter().collect::<String>()))
}

fn split(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("split", location, 2, args.len()));
    }
    let s = as_str("split", &args[0], location)?;
    let delim = as_str("split", &args[1], location)?;
    let parts: Vec<Value> = if delim.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(delim).map(Value::string).collect()
    };
    Ok(Value::array(parts))
}

fn replace(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 3 {
        return Err(arity_error("replace", location, 3, args.len()));
    }
    let s = as_str("replace", &args[0], location)?;
    let from = as_str("replace", &args[1], location)?;
    let to = as_str("replace", &args[2], location)?;
    Ok(Value::string(s.replace(from, to)))
}

/// `sprintf(format, args)` supports the verb subset `%d %s %v %.Nf %x %o %%`,
/// consuming elements of the `args` array in order — enough to cover the
/// policy-authoring idioms seen in practice without pulling in a full
/// printf-format crate.
fn sprintf(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("sprintf", location, 2, args.len()));
    }
    let format = as_str("sprintf", &args[0], location)?;
    let values = match &args[1] {
        Value::Array(a) => a.as_slice(),
        other => return Err(type_error("sprintf", location, format!("expected array of args, got {}", other.type_name()))),
    };
    let mut out = String::new();
    let mut chars = format.chars().peekable();
    let mut next_arg = values.iter();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut precision: Option<usize> = None;
        let mut verb_chars = String::new();
        loop {
            match chars.peek() {
                Some('.') => {
                    chars.next();
                    let mut digits = String::new();
                    while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                        digits.push(chars.next().unwrap());
                    }
                    precision = digits.parse().ok();
                }
                Some(c) if c.is_ascii_digit() => {
                    verb_chars.push(chars.next().unwrap());
                }
                _ => break,
            }
        }
        let Some(verb) = chars.next() else {
            return Err(type_error("sprintf", location, "trailing `%` in format string"));
        };
        match verb {
            '%' => out.push('%'),
            'd' => {
                let v = next_arg.next().ok_or_else(|| type_error("sprintf", location, "not enough arguments for format string"))?;
                let n = v.as_number().ok_or_else(|| type_error("sprintf", location, "%d requires a number"))?;
                out.push_str(&format!("{}", n.as_f64() as i64));
            }
            's' => {
                let v = next_arg.next().ok_or_else(|| type_error("sprintf", location, "not enough arguments for format string"))?;
                out.push_str(v.as_str().ok_or_else(|| type_error("sprintf", location, "%s requires a string"))?);
            }
            'v' => {
                let v = next_arg.next().ok_or_else(|| type_error("sprintf", location, "not enough arguments for format string"))?;
                out.push_str(&v.to_string());
            }
            'f' => {
                let v = next_arg.next().ok_or_else(|| type_error("sprintf", location, "not enough arguments for format string"))?;
                let n = v.as_number().ok_or_else(|| type_error("sprintf", location, "%f requires a number"))?;
                out.push_str(&format!("{:.*}", precision.unwrap_or(6), n.as_f64()));
            }
            'x' => {
                let v = next_arg.next().ok_or_else(|| type_error("sprintf", location, "not enough arguments for format string"))?;
                let n = v.as_number().ok_or_else(|| type_error("sprintf", location, "%x requires a number"))?;
                out.push_str(&format!("{:x}", n.as_f64() as i64));
            }
            'o' => {
                let v = next_arg.next().ok_or_else(|| type_error("sprintf", location, "not enough arguments for format string"))?;
                let n = v.as_number().ok_or_else(|| type_error("sprintf", location, "%o requires a number"))?;
                out.push_str(&format!("{:o}", n.as_f64() as i64));
            }
            other => return Err(type_error("sprintf", location, format!("unsupported format verb `%{other}`"))),
        }
    }
    Ok(Value::string(out))
}

/// `format_int(number, base)` for base 2, 8, 10, 16.
fn format_int(args: &[Value], location: Location) -> Result<Value, RegoError> {
    if args.len() != 2 {
        return Err(arity_error("format_int", location, 2, args.len()));
    }
    let n = args[0].as_number().ok_or_else(|| type_error("format_int", location, "expected number"))?;
    let base = match args[1].as_number() {
        Some(Num::Int(b)) => b,
        _ => return Err(type_error("format_int", location, "expected integer base")),
    };
    let i = n.as_f64() as i64;
    let s = match base {
        2 => format!("{i:b}"),
        8 => format!("{i:o}"),
        10 => format!("{i}"),
        16 => format!("{i:x}"),
        other => return Err(type_error("format_int", location, format!("unsupported base {other}"))),
    };
    Ok(Value::string(s))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sprintf_supports_core_verbs() {
        let args = Value::array(vec![Value::string("Ada"), Value::int(42)]);
        let out = sprintf(&[Value::string("hello %s, %d"), args], Location::dummy()).unwrap();
        assert_eq!(out, Value::string("hello Ada, 42"));
    }

    #[test]
    fn sprintf_supports_precision() {
        let args = Value::array(vec![Value::float(3.14159)]);
        let out = sprintf(&[Value::string("%.2f"), args], Location::dummy()).unwrap();
        assert_eq!(out, Value::string("3.14"));
    }

    #[test]
    fn format_int_hex() {
        assert_eq!(format_int(&[Value::int(255), Value::int(16)], Location::dummy()).unwrap(), Value::string("ff"));
    }

    #[test]
    fn split_on_empty_delim_yields_chars() {
        assert_eq!(
            split(&[Value::string("ab"), Value::string("")], Location::dummy()).unwrap(),
            Value::array(vec![Value::string("a"), Value::string("b")])
        );
    }

    #[test]
    fn indexof_counts_characters_not_bytes() {
        assert_eq!(indexof(&[Value::string("héllo"), Value::string("llo")], Location::dummy()).unwrap(), Value::int(2));
        assert_eq!(indexof(&[Value::string("abc"), Value::string("z")], Location::dummy()).unwrap(), Value::int(-1));
    }

    #[test]
    fn substring_extracts_by_character_offset() {
        assert_eq!(
            substring(&[Value::string("héllo"), Value::int(1), Value::int(3)], Location::dummy()).unwrap(),
            Value::string("éll")
        );
    }

    #[test]
    fn trim_space_strips_both_ends() {
        assert_eq!(trim_space(&[Value::string("  hi  ")], Location::dummy()).unwrap(), Value::string("hi"));
    }
}
