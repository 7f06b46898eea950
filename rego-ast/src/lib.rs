//! Value model and abstract syntax tree shared by the parser, compiler, and
//! interpreter crates.

pub mod ast;
pub mod value;

pub use ast::*;
pub use value::{Num, Value};
