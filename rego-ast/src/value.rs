//! The runtime value model.
//!
//! Rego has seven value shapes: three scalars (string, number, boolean),
//! `null`, and three collections (array, object, set). There is no explicit
//! "undefined" variant — undefined is the *absence* of a `Value`, modeled as
//! `Option<Value>` everywhere a computation can fail to produce a result.
//!
//! Objects and sets preserve insertion order (spec invariant: iteration order
//! matches construction order, even though Rego objects are unordered maps
//! semantically) because `IndexMap`/`IndexSet` is what the teacher's parser
//! already reaches for to keep diagnostics and serialization deterministic.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A Rego number. Integers are kept exact as long as the source and every
/// arithmetic step stays integral; anything involving division, a float
/// literal, or a fractional builtin result is promoted to `Float`.
#[derive(Clone, Copy, Debug)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(self, Num::Int(_))
    }
}

impl PartialEq for Num {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl Eq for Num {}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Num {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

impl Hash for Num {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash by numeric value, not by representation, so `1` and `1.0`
        // collide in a set/object-key position the same way they compare equal.
        self.as_f64().to_bits().hash(state);
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Num::Int(i) => write!(f, "{i}"),
            Num::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() && x.abs() < 1e15 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{x}")
                }
            }
        }
    }
}

impl From<i64> for Num {
    fn from(i: i64) -> Self {
        Num::Int(i)
    }
}

impl From<f64> for Num {
    fn from(f: f64) -> Self {
        Num::Float(f)
    }
}

/// A fully-evaluated Rego value.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    #[serde(with = "num_serde")]
    Number(Num),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Object(Arc<IndexMap<Value, Value>>),
    Set(Arc<IndexSet<Value>>),
}

mod num_serde {
    use super::Num;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(n: &Num, s: S) -> Result<S::Ok, S::Error> {
        match n {
            Num::Int(i) => i.serialize(s),
            Num::Float(f) => f.serialize(s),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Num, D::Error> {
        let v = serde_json::Number::deserialize(d)?;
        if let Some(i) = v.as_i64() {
            Ok(Num::Int(i))
        } else {
            Ok(Num::Float(v.as_f64().unwrap_or(f64::NAN)))
        }
    }
}

impl Value {
    pub fn boolean(b: bool) -> Self {
        Value::Boolean(b)
    }

    pub fn int(i: i64) -> Self {
        Value::Number(Num::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Value::Number(Num::Float(f))
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }

    pub fn object(map: IndexMap<Value, Value>) -> Self {
        Value::Object(Arc::new(map))
    }

    pub fn set(items: IndexSet<Value>) -> Self {
        Value::Set(Arc::new(items))
    }

    /// The type name as the `type_name` builtin and error messages report it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Set(_) => "set",
        }
    }

    /// Rego's trivalent truthiness for `if`/rule-body purposes: everything
    /// except the literal boolean `false` is truthy. Undefined is handled
    /// one layer up (it is not a `Value` at all).
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Num> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<Value, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&IndexSet<Value>> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering used by `sort`, `<`/`>` on mixed-type arrays, and set/object
    /// key ordering: undefined < null < boolean < number < string < array <
    /// object < set, matching the rank OPA documents for its comparator.
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
            Value::Set(_) => 6,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use itertools::Itertools as _;
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(a) => write!(f, "[{}]", a.iter().format(", ")),
            Value::Object(o) => write!(f, "{{{}}}", o.iter().map(|(k, v)| format!("{k}: {v}")).format(", ")),
            Value::Set(s) => write!(f, "{{{}}}", s.iter().format(", ")),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Number(n) => n.hash(state),
            Value::String(s) => s.hash(state),
            Value::Array(a) => a.hash(state),
            Value::Object(o) => {
                // Eq on IndexMap ignores insertion order, so the hash must
                // combine entries order-independently too.
                let mut acc: u64 = 0;
                for (k, v) in o.iter() {
                    let mut h = std::collections::hash_map::DefaultHasher::new();
                    k.hash(&mut h);
                    v.hash(&mut h);
                    acc ^= h.finish();
                }
                acc.hash(state);
            }
            Value::Set(s) => {
                let mut acc: u64 = 0;
                for v in s.iter() {
                    let mut h = std::collections::hash_map::DefaultHasher::new();
                    v.hash(&mut h);
                    acc ^= h.finish();
                }
                acc.hash(state);
            }
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Object(a), Value::Object(b)) => {
                a.iter().collect::<Vec<_>>().cmp(&b.iter().collect::<Vec<_>>())
            }
            (Value::Set(a), Value::Set(b)) => a.iter().cmp(b.iter()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int_and_float_compare_equal() {
        assert_eq!(Value::int(1), Value::float(1.0));
    }

    #[test]
    fn false_is_the_only_falsy_value() {
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Null.is_truthy());
        assert!(Value::int(0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn rank_orders_across_types() {
        assert!(Value::Null < Value::Boolean(false));
        assert!(Value::Boolean(true) < Value::int(0));
        assert!(Value::int(100) < Value::string("a"));
    }

    #[test]
    fn object_equality_ignores_insertion_order_of_equal_maps() {
        let mut a = IndexMap::new();
        a.insert(Value::string("x"), Value::int(1));
        a.insert(Value::string("y"), Value::int(2));
        let mut b = IndexMap::new();
        b.insert(Value::string("y"), Value::int(2));
        b.insert(Value::string("x"), Value::int(1));
        assert_eq!(Value::object(a), Value::object(b));
    }
}

#[cfg(test)]
mod proptest_value {
    use super::*;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::boolean),
            any::<i32>().prop_map(|n| Value::int(n as i64)),
            "[a-z]{0,8}".prop_map(Value::string),
        ]
    }

    fn tree(depth: u32) -> impl Strategy<Value = Value> {
        let leaf = leaf();
        if depth == 0 {
            leaf.boxed()
        } else {
            let inner = tree(depth - 1);
            prop_oneof![
                leaf,
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::array),
                prop::collection::vec((any::<i32>(), inner), 0..4)
                    .prop_map(|pairs| Value::object(pairs.into_iter().map(|(k, v)| (Value::int(k as i64), v)).collect())),
            ]
            .boxed()
        }
    }

    proptest! {
        /// Every `Value` survives a JSON round trip unchanged — the CLI's
        /// `--format json` report and `--config` loading both depend on this.
        #[test]
        fn json_round_trip(value in tree(3)) {
            let encoded = serde_json::to_string(&value).unwrap();
            let decoded: Value = serde_json::from_str(&encoded).unwrap();
            prop_assert_eq!(value, decoded);
        }

        /// `Value` equality never panics and is reflexive, including for
        /// deeply-nested collections built from the same generator.
        #[test]
        fn equality_is_reflexive(value in tree(3)) {
            prop_assert_eq!(value.clone(), value);
        }
    }
}
