//! Hand-rolled character-by-character lexer, in the shape of the teacher's
//! `tokenizer::lexer` module: a `Peekable<Chars>` cursor, small `eat_*`
//! helpers for each literal family, and a keyword table consulted after an
//! identifier has already been scanned.

use crate::token::{keyword, Token, TokenKind};
use rego_errors::LexError;
use rego_span::{Cursor, Location};
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    cursor: Cursor,
    /// Tracks whether the previous significant token can end a statement,
    /// so we know whether to emit a `Newline` token (Rego is line-sensitive
    /// inside rule bodies the way Go is with semicolon insertion).
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { chars: source.chars().peekable(), cursor: Cursor::new(), at_line_start: true }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.cursor.advance(c);
        Some(c)
    }

    fn single(&mut self, kind: TokenKind, start: Cursor) -> Token {
        self.bump();
        Token { kind, location: start.location(1) }
    }

    /// If the next char after the already-consumed one matches `expected`,
    /// consume it too and return `then`; otherwise return `otherwise`.
    fn followed_by(&mut self, expected: char, then: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.peek() == Some(expected) {
            self.bump();
            then
        } else {
            otherwise
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> bool {
        let mut saw_newline = false;
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some('\n') => {
                    saw_newline = true;
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
        saw_newline
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let saw_newline = self.skip_whitespace_and_comments();
        let start = self.cursor;

        if saw_newline && !self.at_line_start {
            self.at_line_start = true;
            return Ok(Token { kind: TokenKind::Newline, location: start.location(0) });
        }

        let Some(c) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, location: start.location(0) });
        };

        self.at_line_start = false;

        let tok = match c {
            '{' => self.single(TokenKind::LBrace, start),
            '}' => self.single(TokenKind::RBrace, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            ',' => self.single(TokenKind::Comma, start),
            ';' => self.single(TokenKind::Semi, start),
            ':' => {
                self.bump();
                let kind = self.followed_by('=', TokenKind::Assign, TokenKind::Colon);
                Token { kind, location: start.location(if self.peek() == Some('=') { 2 } else { 1 }) }
            }
            '=' => {
                self.bump();
                let kind = self.followed_by('=', TokenKind::Eq, TokenKind::Unify);
                Token { kind, location: start.location(1) }
            }
            '!' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Token { kind: TokenKind::Ne, location: start.location(2) }
                } else {
                    return Err(LexError::new(start.location(1), "expected `=` after `!`"));
                }
            }
            '<' => {
                self.bump();
                let kind = self.followed_by('=', TokenKind::Le, TokenKind::Lt);
                Token { kind, location: start.location(1) }
            }
            '>' => {
                self.bump();
                let kind = self.followed_by('=', TokenKind::Ge, TokenKind::Gt);
                Token { kind, location: start.location(1) }
            }
            '.' => {
                self.bump();
                Token { kind: TokenKind::Dot, location: start.location(1) }
            }
            '+' => self.single(TokenKind::Plus, start),
            '-' => self.single(TokenKind::Minus, start),
            '*' => self.single(TokenKind::Star, start),
            '/' => self.single(TokenKind::Slash, start),
            '%' => self.single(TokenKind::Percent, start),
            '|' => self.single(TokenKind::Pipe, start),
            '&' => self.single(TokenKind::Amp, start),
            '"' => self.eat_string(start)?,
            '`' => self.eat_raw_string(start)?,
            c if c.is_ascii_digit() => self.eat_number(start)?,
            c if c.is_alphabetic() || c == '_' => self.eat_identifier(start),
            other => return Err(LexError::new(start.location(1), format!("unexpected character `{other}`"))),
        };
        Ok(tok)
    }

    fn eat_identifier(&mut self, start: Cursor) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let location = start.location(text.len());
        let kind = keyword(&text).unwrap_or(TokenKind::Ident(Arc::from(text.as_str())));
        Token { kind, location }
    }

    fn eat_number(&mut self, start: Cursor) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.peek() == Some('.') {
            // Lookahead: only consume `.` as a decimal point if followed by a
            // digit, otherwise it's a reference-chain dot (e.g. `1.to_s`
            // never occurs in Rego, but `data.1` inside brackets might).
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('.');
                self.bump();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let next_is_sign = matches!(lookahead.peek(), Some('+') | Some('-'));
            if next_is_sign {
                lookahead.next();
            }
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push(self.bump().unwrap());
                if matches!(self.peek(), Some('+') | Some('-')) {
                    text.push(self.bump().unwrap());
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        let location = start.location(text.len());
        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| LexError::new(location, format!("invalid float literal `{text}`")))?;
            Ok(Token { kind: TokenKind::FloatLit(value), location })
        } else {
            match text.parse::<i64>() {
                Ok(value) => Ok(Token { kind: TokenKind::IntLit(value), location }),
                Err(_) => {
                    // Overflows i64 (or a huge literal) — fall back to float,
                    // per the big-integer-literal accommodation.
                    let value: f64 = text
                        .parse()
                        .map_err(|_| LexError::new(location, format!("invalid numeric literal `{text}`")))?;
                    Ok(Token { kind: TokenKind::FloatLit(value), location })
                }
            }
        }
    }

    fn eat_string(&mut self, start: Cursor) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let mut text = String::new();
        let mut has_interpolation = false;
        loop {
            match self.bump() {
                None => return Err(LexError::new(start.location(text.len()), "unterminated string literal")),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('"') => text.push('"'),
                    Some('\\') => text.push('\\'),
                    Some('$') => text.push('$'),
                    Some(other) => text.push(other),
                    None => return Err(LexError::new(start.location(text.len()), "unterminated escape sequence")),
                },
                Some('$') if self.peek() == Some('{') => {
                    has_interpolation = true;
                    text.push('$');
                    text.push('{');
                    self.bump();
                    let mut depth = 1;
                    while depth > 0 {
                        match self.bump() {
                            Some('{') => {
                                depth += 1;
                                text.push('{');
                            }
                            Some('}') => {
                                depth -= 1;
                                text.push('}');
                            }
                            Some(c) => text.push(c),
                            None => {
                                return Err(LexError::new(start.location(text.len()), "unterminated interpolation"))
                            }
                        }
                    }
                }
                Some(c) => text.push(c),
            }
        }
        let location = start.location(text.len() + 2);
        let kind = if has_interpolation {
            TokenKind::TemplateStringLit(Arc::from(text.as_str()))
        } else {
            TokenKind::StringLit(Arc::from(text.as_str()))
        };
        Ok(Token { kind, location })
    }

    fn eat_raw_string(&mut self, start: Cursor) -> Result<Token, LexError> {
        self.bump(); // opening backtick
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(LexError::new(start.location(text.len()), "unterminated raw string literal")),
                Some('`') => break,
                Some(c) => text.push(c),
            }
        }
        let location = start.location(text.len() + 2);
        Ok(Token { kind: TokenKind::RawStringLit(Arc::from(text.as_str())), location })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_punctuation_and_operators() {
        assert_eq!(
            kinds(":= = == != <= >="),
            vec![
                TokenKind::Assign,
                TokenKind::Unify,
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_keywords_vs_identifiers() {
        assert_eq!(
            kinds("package not allow"),
            vec![
                TokenKind::Package,
                TokenKind::Not,
                TokenKind::Ident(Arc::from("allow")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_float_and_int() {
        assert_eq!(kinds("1 1.5 10"), vec![
            TokenKind::IntLit(1),
            TokenKind::FloatLit(1.5),
            TokenKind::IntLit(10),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn lexes_negative_exponent_float() {
        assert_eq!(kinds("1e-3"), vec![TokenKind::FloatLit(1e-3), TokenKind::Eof]);
    }

    #[test]
    fn skips_comments() {
        assert_eq!(kinds("1 # trailing comment\n2"), vec![
            TokenKind::IntLit(1),
            TokenKind::Newline,
            TokenKind::IntLit(2),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn lexes_template_string() {
        let kinds = kinds(r#""hello ${name}""#);
        assert_eq!(kinds.len(), 2);
        assert!(matches!(kinds[0], TokenKind::TemplateStringLit(_)));
    }
}
