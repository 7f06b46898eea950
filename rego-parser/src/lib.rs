//! Tokenizer and parser turning Rego source text into `rego_ast::Module`.

pub mod lexer;
pub mod parser;
pub mod token;

pub use parser::{parse_module, Parser};
