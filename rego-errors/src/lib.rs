//! The error taxonomy shared by every pass of the Rego pipeline.
//!
//! Each stage of the pipeline (lex, parse, compile, evaluate, builtin
//! dispatch) has its own error type so that callers can match on the stage
//! that failed without string-sniffing a message. [`RegoError`] unifies them
//! at the library boundary.

use rego_span::Location;
use std::fmt;
use thiserror::Error;

pub type Result<T, E = RegoError> = std::result::Result<T, E>;

/// A lexical error: malformed source character, unterminated literal.
#[derive(Clone, Debug, Error)]
#[error("lex error at {location}: {message}")]
pub struct LexError {
    pub location: Location,
    pub message: String,
}

impl LexError {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self { location, message: message.into() }
    }
}

/// A grammar error: token mismatch, invalid construct.
#[derive(Clone, Debug, Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    pub location: Location,
    pub message: String,
}

impl ParseError {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self { location, message: message.into() }
    }
}

/// A static-compilation error: rule conflict, unsafe variable, invalid head.
#[derive(Clone, Debug, Error)]
#[error("compile error at {location}: {message} ({context})")]
pub struct CompileError {
    pub location: Location,
    pub message: String,
    pub context: String,
}

impl CompileError {
    pub fn new(location: Location, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self { location, message: message.into(), context: context.into() }
    }
}

/// A runtime error raised by rule construction: conflicting partial-object
/// keys, unsafe `with` replacements, complete-rule value conflicts.
#[derive(Clone, Debug, Error)]
#[error("evaluation error at {location}: {message} ({context})")]
pub struct EvaluationError {
    pub location: Location,
    pub message: String,
    pub context: String,
}

impl EvaluationError {
    pub fn new(location: Location, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self { location, message: message.into(), context: context.into() }
    }
}

/// Wrong arity or argument type at a builtin-function boundary.
#[derive(Clone, Debug, Error)]
#[error("builtin argument error in {context}: {message}")]
pub struct BuiltinArgumentError {
    pub location: Location,
    pub message: String,
    pub context: String,
}

impl BuiltinArgumentError {
    pub fn new(location: Location, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self { location, message: message.into(), context: context.into() }
    }
}

/// A value-level type mismatch at the evaluator/builtin boundary that is
/// not an Undefined-propagation point (strict-mode builtin dispatch).
#[derive(Clone, Debug, Error)]
#[error("type error at {location}: {message} ({context})")]
pub struct TypeError {
    pub location: Location,
    pub message: String,
    pub context: String,
}

impl TypeError {
    pub fn new(location: Location, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self { location, message: message.into(), context: context.into() }
    }
}

/// The union of every error kind the library surface can return.
#[derive(Clone, Debug, Error)]
pub enum RegoError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Evaluate(#[from] EvaluationError),
    #[error(transparent)]
    BuiltinArgument(#[from] BuiltinArgumentError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// The taxonomy name, independent of which variant carries the payload —
/// used by the CLI to pick an exit code and by tests asserting on kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
    Compile,
    Evaluate,
    BuiltinArgument,
    Type,
}

impl RegoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegoError::Lex(_) => ErrorKind::Lex,
            RegoError::Parse(_) => ErrorKind::Parse,
            RegoError::Compile(_) => ErrorKind::Compile,
            RegoError::Evaluate(_) => ErrorKind::Evaluate,
            RegoError::BuiltinArgument(_) => ErrorKind::BuiltinArgument,
            RegoError::Type(_) => ErrorKind::Type,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            RegoError::Lex(e) => e.location,
            RegoError::Parse(e) => e.location,
            RegoError::Compile(e) => e.location,
            RegoError::Evaluate(e) => e.location,
            RegoError::BuiltinArgument(e) => e.location,
            RegoError::Type(e) => e.location,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Lex => "Lex",
            ErrorKind::Parse => "Parse",
            ErrorKind::Compile => "Compile",
            ErrorKind::Evaluate => "Evaluate",
            ErrorKind::BuiltinArgument => "BuiltinArgument",
            ErrorKind::Type => "Type",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err: RegoError = CompileError::new(Location::dummy(), "unsafe variable", "rule allow").into();
        assert_eq!(err.kind(), ErrorKind::Compile);
    }
}
