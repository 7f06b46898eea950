//! Syntax tree produced by `rego-parser` and consumed by `rego-compiler`.
//!
//! Every node carries a [`Location`] so that compile and evaluation errors
//! can point back at source text. The tree is intentionally close to the
//! surface grammar (spec §4.2) — desugaring (e.g. `else` chains, partial-set
//! rule bodies) happens in the compiler, not here.

use crate::value::Value;
use indexmap::IndexMap;
use rego_span::Location;
use std::sync::Arc;

pub type Var = Arc<str>;

#[derive(Clone, Debug)]
pub struct Module {
    pub package: Package,
    pub imports: Vec<Import>,
    pub rules: Vec<Rule>,
}

#[derive(Clone, Debug)]
pub struct Package {
    pub path: Vec<Var>,
    pub location: Location,
}

#[derive(Clone, Debug)]
pub struct Import {
    pub path: Vec<Var>,
    pub alias: Option<Var>,
    pub location: Location,
}

/// The shape of what a rule defines, independent of its body.
#[derive(Clone, Debug)]
pub enum RuleHead {
    /// `allow { ... }` or `allow = true { ... }` — single document value.
    Complete { name: Var, value: Option<Expr> },
    /// `r[x] { ... }` — the rule builds a set by iterating `x`.
    PartialSet { name: Var, key: Expr },
    /// `r[k] = v { ... }` — the rule builds an object. `field` is set for
    /// the nested-head sugar `r[k].field = v { ... }`, where several rules
    /// sharing a key contribute different fields of the same nested object.
    PartialObject { name: Var, key: Expr, field: Option<Var>, value: Expr },
    /// `f(x, y) = z { ... }` — a function with positional arguments.
    Function { name: Var, args: Vec<Expr>, value: Option<Expr> },
}

impl RuleHead {
    pub fn name(&self) -> &Var {
        match self {
            RuleHead::Complete { name, .. }
            | RuleHead::PartialSet { name, .. }
            | RuleHead::PartialObject { name, .. }
            | RuleHead::Function { name, .. } => name,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub head: RuleHead,
    pub body: Vec<Literal>,
    /// `else` continuations sharing the same head name, each with its own
    /// guard body and optional value override.
    pub else_rules: Vec<ElseRule>,
    pub default: bool,
    pub location: Location,
}

#[derive(Clone, Debug)]
pub struct ElseRule {
    pub value: Option<Expr>,
    pub body: Vec<Literal>,
    pub location: Location,
}

/// One body statement: an expression, optionally negated, optionally
/// carrying `with` replacements scoped to that single statement.
#[derive(Clone, Debug)]
pub struct Literal {
    pub negated: bool,
    pub expr: Expr,
    pub with_mods: Vec<WithModifier>,
    pub location: Location,
}

#[derive(Clone, Debug)]
pub struct WithModifier {
    pub target: Expr,
    pub value: Expr,
    pub location: Location,
}

#[derive(Clone, Debug)]
pub struct SomeDecl {
    pub vars: Vec<Var>,
    /// `some k, v in collection` form; `None` for the bare `some x, y` form.
    pub in_expr: Option<(Option<Expr>, Expr)>,
    pub location: Location,
}

#[derive(Clone, Debug)]
pub struct Every {
    pub key: Option<Var>,
    pub value: Var,
    pub domain: Expr,
    pub body: Vec<Literal>,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    Unify,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
}

/// A segment of a reference chain: `.field`, `[expr]`, or a plain identifier
/// at the head of the chain.
#[derive(Clone, Debug)]
pub enum RefArg {
    Dot(Var),
    Bracket(Expr),
}

#[derive(Clone, Debug)]
pub enum Expr {
    Literal(Value, Location),
    Var(Var, Location),
    /// `data.foo.bar`, `input.x[y]`, `arr[0].field` — a base expression
    /// followed by zero or more `.field` / `[expr]` accesses.
    Reference { base: Box<Expr>, args: Vec<RefArg>, location: Location },
    Array(Vec<Expr>, Location),
    Object(Vec<(Expr, Expr)>, Location),
    Set(Vec<Expr>, Location),
    ArrayCompr { term: Box<Expr>, body: Vec<Literal>, location: Location },
    SetCompr { term: Box<Expr>, body: Vec<Literal>, location: Location },
    ObjectCompr { key: Box<Expr>, value: Box<Expr>, body: Vec<Literal>, location: Location },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, location: Location },
    Unary { op: UnOp, expr: Box<Expr>, location: Location },
    Call { func: Box<Expr>, args: Vec<Expr>, location: Location },
    /// A formatted string literal with `${expr}` interpolation segments.
    Template { parts: Vec<TemplatePart>, location: Location },
    Some(SomeDecl),
    /// `x in xs` / `k, v in xs` membership test used both standalone and
    /// inside `some ... in ...` desugaring.
    Membership { key: Option<Box<Expr>>, value: Box<Expr>, collection: Box<Expr>, location: Location },
}

#[derive(Clone, Debug)]
pub enum TemplatePart {
    Text(Arc<str>),
    Interpolate(Expr),
}

impl Expr {
    pub fn location(&self) -> Location {
        match self {
            Expr::Literal(_, l) => *l,
            Expr::Var(_, l) => *l,
            Expr::Reference { location, .. } => *location,
            Expr::Array(_, l) => *l,
            Expr::Object(_, l) => *l,
            Expr::Set(_, l) => *l,
            Expr::ArrayCompr { location, .. } => *location,
            Expr::SetCompr { location, .. } => *location,
            Expr::ObjectCompr { location, .. } => *location,
            Expr::Binary { location, .. } => *location,
            Expr::Unary { location, .. } => *location,
            Expr::Call { location, .. } => *location,
            Expr::Template { location, .. } => *location,
            Expr::Some(s) => s.location,
            Expr::Membership { location, .. } => *location,
        }
    }

    /// A dotted path for references with only `Dot`/identifier-literal
    /// `Bracket` segments, e.g. `data.policy.allow` — used by the compiler
    /// to resolve rule references without full evaluation.
    pub fn static_path(&self) -> Option<Vec<Var>> {
        match self {
            Expr::Var(v, _) => Some(vec![v.clone()]),
            Expr::Reference { base, args, .. } => {
                let mut path = base.static_path()?;
                for arg in args {
                    match arg {
                        RefArg::Dot(name) => path.push(name.clone()),
                        RefArg::Bracket(expr) => match expr {
                            Expr::Literal(Value::String(s), _) => path.push(s.clone()),
                            _ => return None,
                        },
                    }
                }
                Some(path)
            }
            _ => None,
        }
    }
}

/// Convenience constructor used throughout the parser and by tests.
pub fn object_literal(pairs: Vec<(Value, Value)>) -> Value {
    let mut map = IndexMap::new();
    for (k, v) in pairs {
        map.insert(k, v);
    }
    Value::object(map)
}
