//! Token kinds produced by the lexer.

use rego_span::Location;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Literals
    Ident(Arc<str>),
    StringLit(Arc<str>),
    RawStringLit(Arc<str>),
    TemplateStringLit(Arc<str>),
    IntLit(i64),
    FloatLit(f64),
    True,
    False,
    Null,

    // Keywords
    Package,
    Import,
    As,
    Default,
    Else,
    Not,
    Some,
    Every,
    In,
    With,
    If,
    Contains,

    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Semi,
    Dot,
    Colon,

    // Operators
    Assign,    // :=
    Unify,     // =
    Eq,        // ==
    Ne,        // !=
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pipe,  // |  (set union infix and bitor)
    Amp,   // &  (set intersection infix and bitand)

    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "identifier `{s}`"),
            TokenKind::StringLit(_) => write!(f, "string literal"),
            TokenKind::RawStringLit(_) => write!(f, "raw string literal"),
            TokenKind::TemplateStringLit(_) => write!(f, "template string literal"),
            TokenKind::IntLit(n) => write!(f, "integer `{n}`"),
            TokenKind::FloatLit(n) => write!(f, "float `{n}`"),
            TokenKind::True => write!(f, "`true`"),
            TokenKind::False => write!(f, "`false`"),
            TokenKind::Null => write!(f, "`null`"),
            TokenKind::Package => write!(f, "`package`"),
            TokenKind::Import => write!(f, "`import`"),
            TokenKind::As => write!(f, "`as`"),
            TokenKind::Default => write!(f, "`default`"),
            TokenKind::Else => write!(f, "`else`"),
            TokenKind::Not => write!(f, "`not`"),
            TokenKind::Some => write!(f, "`some`"),
            TokenKind::Every => write!(f, "`every`"),
            TokenKind::In => write!(f, "`in`"),
            TokenKind::With => write!(f, "`with`"),
            TokenKind::If => write!(f, "`if`"),
            TokenKind::Contains => write!(f, "`contains`"),
            TokenKind::LBrace => write!(f, "`{{`"),
            TokenKind::RBrace => write!(f, "`}}`"),
            TokenKind::LBracket => write!(f, "`[`"),
            TokenKind::RBracket => write!(f, "`]`"),
            TokenKind::LParen => write!(f, "`(`"),
            TokenKind::RParen => write!(f, "`)`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Semi => write!(f, "`;`"),
            TokenKind::Dot => write!(f, "`.`"),
            TokenKind::Colon => write!(f, "`:`"),
            TokenKind::Assign => write!(f, "`:=`"),
            TokenKind::Unify => write!(f, "`=`"),
            TokenKind::Eq => write!(f, "`==`"),
            TokenKind::Ne => write!(f, "`!=`"),
            TokenKind::Lt => write!(f, "`<`"),
            TokenKind::Le => write!(f, "`<=`"),
            TokenKind::Gt => write!(f, "`>`"),
            TokenKind::Ge => write!(f, "`>=`"),
            TokenKind::Plus => write!(f, "`+`"),
            TokenKind::Minus => write!(f, "`-`"),
            TokenKind::Star => write!(f, "`*`"),
            TokenKind::Slash => write!(f, "`/`"),
            TokenKind::Percent => write!(f, "`%`"),
            TokenKind::Pipe => write!(f, "`|`"),
            TokenKind::Amp => write!(f, "`&`"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

/// Keyword lookup used after an identifier has been scanned; Rego keywords
/// are only reserved in certain grammar positions, but the lexer always
/// tags them so the parser can decide contextually.
pub fn keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "package" => TokenKind::Package,
        "import" => TokenKind::Import,
        "as" => TokenKind::As,
        "default" => TokenKind::Default,
        "else" => TokenKind::Else,
        "not" => TokenKind::Not,
        "some" => TokenKind::Some,
        "every" => TokenKind::Every,
        "in" => TokenKind::In,
        "with" => TokenKind::With,
        "if" => TokenKind::If,
        "contains" => TokenKind::Contains,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        _ => return None,
    })
}
