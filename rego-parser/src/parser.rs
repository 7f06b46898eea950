//! Recursive-descent / precedence-climbing parser, in the shape of the
//! teacher's `parser::expression` module: a chain of `parse_*_expression`
//! methods, each falling through to the next-tighter level, bottoming out
//! at `parse_primary`. Statement-level grammar (rules, imports, `with`)
//! follows the same one-method-per-construct layout as the teacher's
//! `parser::statement` module.

use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use rego_ast::ast::*;
use rego_ast::value::Value;
use rego_errors::ParseError;
use rego_span::Location;
use std::sync::Arc;
use tracing::debug;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

pub fn parse_module(source: &str) -> Result<Module, rego_errors::RegoError> {
    let tokens = Lexer::new(source).tokenize()?;
    debug!(token_count = tokens.len(), "tokenized module");
    let mut parser = Parser::new(tokens);
    Ok(parser.module()?)
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        // Newlines terminate a rule body line the way semicolons do; the
        // parser consumes them explicitly at statement boundaries and
        // otherwise skips them, so filtering here would lose that signal.
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_loc(&self) -> Location {
        self.tokens[self.pos].location
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> PResult<Token> {
        self.skip_newlines_before(kind);
        if self.peek() == kind {
            Ok(self.advance())
        } else {
            Err(ParseError::new(self.peek_loc(), format!("expected {kind}, found {}", self.peek())))
        }
    }

    /// Most punctuation can't be preceded by a significant newline inside an
    /// expression, but closing delimiters commonly are (trailing newline
    /// before `}`), so swallow them before expecting one.
    fn skip_newlines_before(&mut self, kind: &TokenKind) {
        if matches!(kind, TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen) {
            self.skip_newlines();
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn ident(&mut self) -> PResult<(Var, Location)> {
        let loc = self.peek_loc();
        match self.advance().kind {
            TokenKind::Ident(name) => Ok((name, loc)),
            other => Err(ParseError::new(loc, format!("expected identifier, found {other}"))),
        }
    }

    // ---- top level -----------------------------------------------------

    pub fn module(&mut self) -> PResult<Module> {
        self.skip_newlines();
        let package = self.package()?;
        self.end_of_statement()?;
        let mut imports = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(&TokenKind::Import) {
                imports.push(self.import()?);
                self.end_of_statement()?;
            } else {
                break;
            }
        }
        let mut rules = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::Eof) {
                break;
            }
            rules.push(self.rule()?);
        }
        Ok(Module { package, imports, rules })
    }

    fn end_of_statement(&mut self) -> PResult<()> {
        if matches!(self.peek(), TokenKind::Newline | TokenKind::Semi) {
            self.advance();
            Ok(())
        } else if matches!(self.peek(), TokenKind::Eof) {
            Ok(())
        } else {
            Err(ParseError::new(self.peek_loc(), format!("expected end of statement, found {}", self.peek())))
        }
    }

    fn dotted_path(&mut self) -> PResult<Vec<Var>> {
        let mut path = vec![self.ident()?.0];
        while self.check(&TokenKind::Dot) {
            self.advance();
            path.push(self.ident()?.0);
        }
        Ok(path)
    }

    fn package(&mut self) -> PResult<Package> {
        let loc = self.eat(&TokenKind::Package)?.location;
        let path = self.dotted_path()?;
        Ok(Package { path, location: loc })
    }

    fn import(&mut self) -> PResult<Import> {
        let loc = self.eat(&TokenKind::Import)?.location;
        let path = self.dotted_path()?;
        let alias = if self.check(&TokenKind::As) {
            self.advance();
            Some(self.ident()?.0)
        } else {
            None
        };
        Ok(Import { path, alias, location: loc })
    }

    // ---- rules -----------------------------------------------------------

    fn rule(&mut self) -> PResult<Rule> {
        let start = self.peek_loc();
        let default = if self.check(&TokenKind::Default) {
            self.advance();
            true
        } else {
            false
        };
        let (name, _) = self.ident()?;

        let head = if self.check(&TokenKind::LBracket) {
            self.advance();
            let key = self.expr()?;
            if self.check(&TokenKind::RBracket) {
                self.advance();
            } else {
                return Err(ParseError::new(self.peek_loc(), "expected `]` closing partial rule key"));
            }
            let field = if self.check(&TokenKind::Dot) {
                self.advance();
                Some(self.ident()?.0)
            } else {
                None
            };
            if self.check(&TokenKind::Unify) || self.check(&TokenKind::Assign) {
                self.advance();
                let value = self.expr()?;
                RuleHead::PartialObject { name, key, field, value }
            } else {
                RuleHead::PartialSet { name, key }
            }
        } else if self.check(&TokenKind::Contains) {
            self.advance();
            let key = self.expr()?;
            RuleHead::PartialSet { name, key }
        } else if self.check(&TokenKind::LParen) {
            self.advance();
            let mut args = Vec::new();
            if !self.check(&TokenKind::RParen) {
                loop {
                    args.push(self.expr()?);
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.eat(&TokenKind::RParen)?;
            let value = if self.check(&TokenKind::Unify) || self.check(&TokenKind::Assign) {
                self.advance();
                Some(self.expr()?)
            } else {
                None
            };
            RuleHead::Function { name, args, value }
        } else if self.check(&TokenKind::Unify) || self.check(&TokenKind::Assign) {
            self.advance();
            let value = self.expr()?;
            RuleHead::Complete { name, value: Some(value) }
        } else {
            RuleHead::Complete { name, value: None }
        };

        let body = if self.check(&TokenKind::LBrace) {
            self.rule_body()?
        } else if self.check(&TokenKind::If) {
            self.advance();
            self.if_body()?
        } else {
            Vec::new()
        };

        let mut else_rules = Vec::new();
        loop {
            self.skip_newlines();
            if !self.check(&TokenKind::Else) {
                break;
            }
            self.advance();
            let value = if self.check(&TokenKind::Unify) || self.check(&TokenKind::Assign) {
                self.advance();
                Some(self.expr()?)
            } else {
                None
            };
            let else_loc = self.peek_loc();
            let else_body = if self.check(&TokenKind::LBrace) {
                self.rule_body()?
            } else if self.check(&TokenKind::If) {
                self.advance();
                self.if_body()?
            } else {
                Vec::new()
            };
            else_rules.push(ElseRule { value, body: else_body, location: else_loc });
        }

        self.end_of_statement()?;
        Ok(Rule { head, body, else_rules, default, location: start })
    }

    fn rule_body(&mut self) -> PResult<Vec<Literal>> {
        self.eat(&TokenKind::LBrace)?;
        let mut literals = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RBrace) {
            literals.push(self.literal()?);
            self.skip_newlines();
            if self.check(&TokenKind::Semi) {
                self.advance();
                self.skip_newlines();
            }
        }
        self.eat(&TokenKind::RBrace)?;
        Ok(literals)
    }

    /// The body following `if`: either a braced, semicolon/newline-separated
    /// query (same as a bare `{ ... }` body) or a single bare literal.
    fn if_body(&mut self) -> PResult<Vec<Literal>> {
        if self.check(&TokenKind::LBrace) {
            self.rule_body()
        } else {
            Ok(vec![self.literal()?])
        }
    }

    fn literal(&mut self) -> PResult<Literal> {
        let start = self.peek_loc();
        if self.check(&TokenKind::Some) {
            let some = self.some_decl()?;
            return Ok(Literal { negated: false, expr: Expr::Some(some), with_mods: Vec::new(), location: start });
        }
        if self.check(&TokenKind::Every) {
            // `every` is a standalone statement desugared to a Call so the
            // rest of the pipeline only has to understand `Expr`.
            let every = self.every_stmt()?;
            let loc = every.location;
            return Ok(Literal {
                negated: false,
                expr: Expr::Call {
                    func: Box::new(Expr::Var(Arc::from("__every__"), loc)),
                    args: every_to_args(every),
                    location: loc,
                },
                with_mods: Vec::new(),
                location: start,
            });
        }

        let negated = if self.check(&TokenKind::Not) {
            self.advance();
            true
        } else {
            false
        };
        let expr = self.expr()?;
        let mut with_mods = Vec::new();
        while self.check(&TokenKind::With) {
            with_mods.push(self.with_modifier()?);
        }
        Ok(Literal { negated, expr, with_mods, location: start })
    }

    fn some_decl(&mut self) -> PResult<SomeDecl> {
        let loc = self.eat(&TokenKind::Some)?.location;
        let mut vars = vec![self.ident()?.0];
        let mut second: Option<Var> = None;
        if self.check(&TokenKind::Comma) {
            self.advance();
            let (v, _) = self.ident()?;
            second = Some(v.clone());
            vars.push(v);
        }
        let in_expr = if self.check(&TokenKind::In) {
            self.advance();
            let collection = self.expr()?;
            let key_var = second.map(|v| Expr::Var(v, loc));
            Some((key_var, collection))
        } else {
            None
        };
        Ok(SomeDecl { vars, in_expr, location: loc })
    }

    fn every_stmt(&mut self) -> PResult<Every> {
        let loc = self.eat(&TokenKind::Every)?.location;
        let (first, _) = self.ident()?;
        let (key, value) = if self.check(&TokenKind::Comma) {
            self.advance();
            let (second, _) = self.ident()?;
            (Some(first), second)
        } else {
            (None, first)
        };
        self.eat(&TokenKind::In)?;
        let domain = self.expr()?;
        let body = self.rule_body()?;
        Ok(Every { key, value, domain, body, location: loc })
    }

    fn with_modifier(&mut self) -> PResult<WithModifier> {
        let loc = self.eat(&TokenKind::With)?.location;
        let target = self.reference_chain()?;
        self.eat(&TokenKind::As)?;
        let value = self.expr()?;
        Ok(WithModifier { target, value, location: loc })
    }

    // ---- expressions, precedence low to high -----------------------------

    pub fn expr(&mut self) -> PResult<Expr> {
        self.assign_expr()
    }

    fn bin_expr(
        &mut self,
        mut next: impl FnMut(&mut Self) -> PResult<Expr>,
        ops: &[(TokenKind, BinOp)],
    ) -> PResult<Expr> {
        let mut lhs = next(self)?;
        loop {
            let Some((_, op)) = ops.iter().find(|(tok, _)| self.check(tok)) else { break };
            let op_loc = self.advance().location;
            let rhs = next(self)?;
            let loc = lhs.location().merge(rhs.location()).merge(op_loc);
            lhs = Expr::Binary { op: *op, lhs: Box::new(lhs), rhs: Box::new(rhs), location: loc };
        }
        Ok(lhs)
    }

    /// Loosest operator: `:=`/`=` bind wider than `|` and `&`, so
    /// `x := a | b` parses as `x := (a | b)`, not `(x := a) | b`.
    fn assign_expr(&mut self) -> PResult<Expr> {
        self.bin_expr(
            Self::or_expr,
            &[(TokenKind::Assign, BinOp::Assign), (TokenKind::Unify, BinOp::Unify)],
        )
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        self.bin_expr(Self::and_expr, &[(TokenKind::Pipe, BinOp::Or)])
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        self.bin_expr(Self::equality_expr, &[(TokenKind::Amp, BinOp::And)])
    }

    fn equality_expr(&mut self) -> PResult<Expr> {
        self.bin_expr(Self::comparison_expr, &[(TokenKind::Eq, BinOp::Eq), (TokenKind::Ne, BinOp::Ne)])
    }

    fn comparison_expr(&mut self) -> PResult<Expr> {
        self.bin_expr(
            Self::membership_expr,
            &[
                (TokenKind::Le, BinOp::Le),
                (TokenKind::Ge, BinOp::Ge),
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::Gt, BinOp::Gt),
            ],
        )
    }

    fn membership_expr(&mut self) -> PResult<Expr> {
        let lhs = self.additive_expr()?;
        if self.check(&TokenKind::In) {
            self.advance();
            let collection = self.additive_expr()?;
            let loc = lhs.location().merge(collection.location());
            return Ok(Expr::Membership { key: None, value: Box::new(lhs), collection: Box::new(collection), location: loc });
        }
        Ok(lhs)
    }

    fn additive_expr(&mut self) -> PResult<Expr> {
        self.bin_expr(Self::multiplicative_expr, &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)])
    }

    fn multiplicative_expr(&mut self) -> PResult<Expr> {
        self.bin_expr(
            Self::unary_expr,
            &[(TokenKind::Star, BinOp::Mul), (TokenKind::Slash, BinOp::Div), (TokenKind::Percent, BinOp::Mod)],
        )
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        if self.check(&TokenKind::Minus) {
            let loc = self.advance().location;
            let expr = self.unary_expr()?;
            let span = loc.merge(expr.location());
            return Ok(Expr::Unary { op: UnOp::Neg, expr: Box::new(expr), location: span });
        }
        self.reference_chain()
    }

    /// A primary term followed by any number of `.field` / `[expr]` /
    /// `(args)` suffixes — references and calls share this chain because
    /// Rego allows `data.foo.bar(1, 2).baz` in one expression.
    fn reference_chain(&mut self) -> PResult<Expr> {
        let mut base = self.primary()?;
        loop {
            if self.check(&TokenKind::Dot) {
                self.advance();
                let (name, loc) = self.ident()?;
                base = push_ref_arg(base, RefArg::Dot(name), loc);
            } else if self.check(&TokenKind::LBracket) {
                let open = self.advance().location;
                let index = self.expr()?;
                let close = self.eat(&TokenKind::RBracket)?.location;
                base = push_ref_arg(base, RefArg::Bracket(index), open.merge(close));
            } else if self.check(&TokenKind::LParen) {
                self.advance();
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.expr()?);
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                let close = self.eat(&TokenKind::RParen)?.location;
                let loc = base.location().merge(close);
                base = Expr::Call { func: Box::new(base), args, location: loc };
            } else {
                break;
            }
        }
        Ok(base)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let loc = self.peek_loc();
        match self.peek().clone() {
            TokenKind::IntLit(n) => {
                self.advance();
                Ok(Expr::Literal(Value::int(n), loc))
            }
            TokenKind::FloatLit(n) => {
                self.advance();
                Ok(Expr::Literal(Value::float(n), loc))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Expr::Literal(Value::string(s), loc))
            }
            TokenKind::RawStringLit(s) => {
                self.advance();
                Ok(Expr::Literal(Value::string(s), loc))
            }
            TokenKind::TemplateStringLit(s) => {
                self.advance();
                Ok(parse_template(&s, loc))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Boolean(true), loc))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Boolean(false), loc))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null, loc))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Var(name, loc))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.eat(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.array_or_compr(loc),
            TokenKind::LBrace => self.object_or_set_or_compr(loc),
            other => Err(ParseError::new(loc, format!("expected expression, found {other}"))),
        }
    }

    fn array_or_compr(&mut self, start: Location) -> PResult<Expr> {
        self.advance();
        self.skip_newlines();
        if self.check(&TokenKind::RBracket) {
            self.advance();
            return Ok(Expr::Array(Vec::new(), start));
        }
        let first = self.expr()?;
        self.skip_newlines();
        if self.check(&TokenKind::Pipe) {
            self.advance();
            let body = self.comprehension_body()?;
            let close = self.eat(&TokenKind::RBracket)?.location;
            return Ok(Expr::ArrayCompr { term: Box::new(first), body, location: start.merge(close) });
        }
        let mut items = vec![first];
        while self.check(&TokenKind::Comma) {
            self.advance();
            self.skip_newlines();
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.expr()?);
            self.skip_newlines();
        }
        let close = self.eat(&TokenKind::RBracket)?.location;
        Ok(Expr::Array(items, start.merge(close)))
    }

    fn object_or_set_or_compr(&mut self, start: Location) -> PResult<Expr> {
        self.advance();
        self.skip_newlines();
        if self.check(&TokenKind::RBrace) {
            self.advance();
            return Ok(Expr::Object(Vec::new(), start));
        }
        let first_key = self.expr()?;
        self.skip_newlines();
        if self.check(&TokenKind::Colon) {
            self.advance();
            let first_value = self.expr()?;
            self.skip_newlines();
            if self.check(&TokenKind::Pipe) {
                self.advance();
                let body = self.comprehension_body()?;
                let close = self.eat(&TokenKind::RBrace)?.location;
                return Ok(Expr::ObjectCompr {
                    key: Box::new(first_key),
                    value: Box::new(first_value),
                    body,
                    location: start.merge(close),
                });
            }
            let mut pairs = vec![(first_key, first_value)];
            while self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                let k = self.expr()?;
                self.eat(&TokenKind::Colon)?;
                let v = self.expr()?;
                pairs.push((k, v));
                self.skip_newlines();
            }
            let close = self.eat(&TokenKind::RBrace)?.location;
            Ok(Expr::Object(pairs, start.merge(close)))
        } else if self.check(&TokenKind::Pipe) {
            self.advance();
            let body = self.comprehension_body()?;
            let close = self.eat(&TokenKind::RBrace)?.location;
            Ok(Expr::SetCompr { term: Box::new(first_key), body, location: start.merge(close) })
        } else {
            let mut items = vec![first_key];
            while self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                items.push(self.expr()?);
                self.skip_newlines();
            }
            let close = self.eat(&TokenKind::RBrace)?.location;
            Ok(Expr::Set(items, start.merge(close)))
        }
    }

    fn comprehension_body(&mut self) -> PResult<Vec<Literal>> {
        self.skip_newlines();
        let mut literals = vec![self.literal()?];
        while self.check(&TokenKind::Comma) || self.check(&TokenKind::Semi) {
            self.advance();
            self.skip_newlines();
            literals.push(self.literal()?);
        }
        self.skip_newlines();
        Ok(literals)
    }
}

fn push_ref_arg(base: Expr, arg: RefArg, arg_loc: Location) -> Expr {
    let loc = base.location().merge(arg_loc);
    match base {
        Expr::Reference { base, mut args, .. } => {
            args.push(arg);
            Expr::Reference { base, args, location: loc }
        }
        other => Expr::Reference { base: Box::new(other), args: vec![arg], location: loc },
    }
}

fn every_to_args(every: Every) -> Vec<Expr> {
    // Packed positionally so the compiler's desugar pass can destructure
    // without a dedicated `Expr` variant: [key-or-null, value-var, domain,
    // synthetic-compr-body-as-call].
    let key = every.key.map(|k| Expr::Var(k, every.location)).unwrap_or(Expr::Literal(Value::Null, every.location));
    let value = Expr::Var(every.value, every.location);
    vec![
        key,
        value,
        every.domain,
        Expr::ArrayCompr { term: Box::new(Expr::Literal(Value::Boolean(true), every.location)), body: every.body, location: every.location },
    ]
}

fn parse_interpolation(source: &str) -> Result<Expr, rego_errors::RegoError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut p = Parser::new(tokens);
    Ok(p.expr()?)
}

/// Splits a template string's raw text (as captured by the lexer, including
/// the `${...}` markers) into literal and interpolated parts, then parses
/// each interpolated segment as its own expression.
fn parse_template(raw: &str, loc: Location) -> Expr {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            if !text.is_empty() {
                parts.push(TemplatePart::Text(Arc::from(text.as_str())));
                text.clear();
            }
            let mut inner = String::new();
            let mut depth = 1;
            for c in chars.by_ref() {
                if c == '{' {
                    depth += 1;
                    inner.push(c);
                } else if c == '}' {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    inner.push(c);
                } else {
                    inner.push(c);
                }
            }
            match parse_interpolation(&inner) {
                Ok(expr) => parts.push(TemplatePart::Interpolate(expr)),
                // An unparseable interpolation renders literally rather than
                // failing the whole module — the spec treats missing/invalid
                // interpolation as a rendering concern, not a parse error.
                Err(_) => parts.push(TemplatePart::Text(Arc::from(format!("${{{inner}}}").as_str()))),
            }
        } else {
            text.push(c);
        }
    }
    if !text.is_empty() {
        parts.push(TemplatePart::Text(Arc::from(text.as_str())));
    }
    Expr::Template { parts, location: loc }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(src: &str) -> Module {
        parse_module(src).unwrap()
    }

    #[test]
    fn parses_package_and_complete_rule() {
        let m = parse("package policy\n\nallow { true }\n");
        assert_eq!(m.package.path, vec![Arc::from("policy")]);
        assert_eq!(m.rules.len(), 1);
        assert!(matches!(m.rules[0].head, RuleHead::Complete { .. }));
    }

    #[test]
    fn parses_partial_set_rule() {
        let m = parse("package p\n\nr[x] { x := 1 }\n");
        assert!(matches!(m.rules[0].head, RuleHead::PartialSet { .. }));
    }

    #[test]
    fn parses_operator_precedence() {
        let m = parse("package p\n\nr { x := 1 + 2 * 3 }\n");
        let Rule { body, .. } = &m.rules[0];
        let Expr::Binary { op: BinOp::Assign, rhs, .. } = &body[0].expr else { panic!() };
        let Expr::Binary { op: BinOp::Add, rhs: mul, .. } = rhs.as_ref() else { panic!() };
        assert!(matches!(mul.as_ref(), Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn assignment_is_looser_than_or_and_and() {
        // `x := a | b` must parse as `x := (a | b)`, not `(x := a) | b`.
        let m = parse("package p\n\nr { x := a | b }\n");
        let Expr::Binary { op: BinOp::Assign, rhs, .. } = &m.rules[0].body[0].expr else { panic!() };
        assert!(matches!(rhs.as_ref(), Expr::Binary { op: BinOp::Or, .. }));
    }

    #[test]
    fn parses_with_modifier() {
        let m = parse("package p\n\nr { data.x with input as 1 }\n");
        assert_eq!(m.rules[0].body[0].with_mods.len(), 1);
    }

    #[test]
    fn parses_every_statement() {
        let m = parse("package p\n\nr { every x in [1, 2] { x > 0 } }\n");
        assert_eq!(m.rules[0].body.len(), 1);
    }
}

#[cfg(test)]
mod proptest_parser {
    use super::parse_module;
    use proptest::prelude::*;

    proptest! {
        /// Arbitrary bytes fed to the lexer/parser pipeline must either
        /// produce a module or a `RegoError` — never panic. The lexer and
        /// parser are the only stages that see raw, untrusted source text.
        #[test]
        fn never_panics_on_arbitrary_text(body in "\\PC{0,80}") {
            let source = format!("package p\n\n{body}\n");
            let _ = parse_module(&source);
        }

        /// A well-formed complete rule with an arbitrary identifier name
        /// always parses, and the parsed head carries that same name back.
        #[test]
        fn round_trips_an_arbitrary_rule_name(name in "[a-z][a-z0-9_]{0,15}") {
            let source = format!("package p\n\n{name} {{ true }}\n");
            let module = parse_module(&source).expect("well-formed rule should parse");
            prop_assert_eq!(module.rules[0].head.name().as_ref(), name.as_str());
        }
    }
}
