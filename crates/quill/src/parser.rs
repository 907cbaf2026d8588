// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Operator-precedence parser for the embedded expression language.
//!
//! [`parse_expression`] is the crate's external entry point: given a source
//! fragment, a [`LocalVarNames`] set of identifiers already known to be
//! locals, and a [`GlobalFunctions`] registry of recognized global function
//! names, it produces an [`Expr`] AST root or a `parse-error`/`lex-error`.
//!
//! The grammar is the precedence ladder in spec.md §4.2, implemented as one
//! recursive-descent function per level (lowest precedence outermost,
//! `parse_assignment`, down to `parse_postfix`/`parse_primary` innermost).
//! Each level's function parses its operand by calling the next-tighter
//! level, so the call chain below mirrors the table directly:
//!
//! ```text
//! assignment > ternary > || > && > == != =~ > < <= > >= <=> > .. ...
//!   > | ^ > & > << >> > + - > * / % > unary > ** > postfix > primary
//! ```
//!
//! `&&`/`||` are desugared into [`Expr::Conditional`] here, at parse time,
//! per the AST's design note, so the evaluator never special-cases them.

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use crate::ast::{BinaryOp, DispatchCache, Expr, HashEntry, StringSegment, UnaryOp};
use crate::error::{Result, ScriptError};
use crate::lexer::{Lexer, StringPart, Token, TokenKind};
use crate::object::Object;
use crate::symbol::Symbol;

/// Identifiers the parser should resolve as locals (`Expr::Variable`) rather
/// than as an implicit zero-argument self-call, threaded in from the
/// surrounding template's already-seen assignments and block parameters.
#[derive(Debug, Clone, Default)]
pub struct LocalVarNames(HashSet<Symbol>);

impl LocalVarNames {
    /// An empty set.
    pub fn new() -> Self {
        LocalVarNames(HashSet::new())
    }

    /// Whether `sym` is a known local.
    pub fn contains(&self, sym: Symbol) -> bool {
        self.0.contains(&sym)
    }

    /// Adds `sym`, returning whether it was newly inserted.
    pub fn insert(&mut self, sym: Symbol) -> bool {
        self.0.insert(sym)
    }

    /// Removes `sym`, returning whether it was present.
    pub fn remove(&mut self, sym: Symbol) -> bool {
        self.0.remove(&sym)
    }
}

impl FromIterator<Symbol> for LocalVarNames {
    fn from_iter<T: IntoIterator<Item = Symbol>>(iter: T) -> Self {
        LocalVarNames(iter.into_iter().collect())
    }
}

/// The registry of recognized global function names, resolved to
/// `Expr::GlobalFuncCall` at parse time. Anything not in this set (and not a
/// known local, and not capitalized) parses as `Expr::Variable`, which falls
/// back to an implicit zero-argument self-call at eval time — see
/// `crate::scope::Scope::get`.
#[derive(Debug, Clone, Default)]
pub struct GlobalFunctions(HashSet<Symbol>);

impl GlobalFunctions {
    /// An empty registry.
    pub fn new() -> Self {
        GlobalFunctions(HashSet::new())
    }

    /// Whether `sym` names a registered global function.
    pub fn contains(&self, sym: Symbol) -> bool {
        self.0.contains(&sym)
    }
}

impl FromIterator<Symbol> for GlobalFunctions {
    fn from_iter<T: IntoIterator<Item = Symbol>>(iter: T) -> Self {
        GlobalFunctions(iter.into_iter().collect())
    }
}

/// Parses `source` as a single `full_expression()`, failing if any non-
/// trivial token remains afterward.
pub fn parse_expression(source: &str, locals: &LocalVarNames, globals: &GlobalFunctions) -> Result<Rc<Expr>> {
    let mut parser = Parser::new(source, locals.clone(), globals.clone());
    let expr = parser.parse_assignment()?;
    let trailing = parser.peek()?;
    if trailing.kind != TokenKind::Eof {
        return Err(parser.error(&trailing, format!("unexpected trailing token {:?}", trailing.kind)));
    }
    Ok(expr)
}

/// Token kinds that can unambiguously start a juxtaposed (paren-less) call
/// argument, e.g. the `' '` in `'hello world'.partition ' '`. Tokens that
/// double as binary operators (`+ - * &` ...) are deliberately excluded: a
/// bare identifier followed by one of those is ambiguous and more often a
/// binary expression than an argument list.
fn starts_juxtaposed_arg(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier(_)
            | TokenKind::Attribute(_)
            | TokenKind::Constant(_)
            | TokenKind::Integer(_)
            | TokenKind::Float(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::RegexLiteral(_, _)
            | TokenKind::SymbolLiteral(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil
    )
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Parser-owned lookahead queue, independent of the lexer's own
    /// single-slot peek/rewind — some constructs (assignment detection,
    /// `key:` hash-entry shorthand) need to look two tokens ahead and
    /// conditionally put both back.
    queue: VecDeque<Token>,
    locals: LocalVarNames,
    globals: GlobalFunctions,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, locals: LocalVarNames, globals: GlobalFunctions) -> Self {
        Parser {
            lexer: Lexer::new(source),
            queue: VecDeque::new(),
            locals,
            globals,
        }
    }

    fn fill(&mut self, n: usize) -> Result<()> {
        while self.queue.len() < n {
            let tok = self.lexer.next_token()?;
            // Newlines are only meaningful to the surrounding template
            // tokenizer; the expression parser treats them as whitespace.
            if tok.kind == TokenKind::Newline {
                continue;
            }
            self.queue.push_back(tok);
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<Token> {
        self.fill(1)?;
        Ok(self.queue[0].clone())
    }

    fn peek_at(&mut self, offset: usize) -> Result<Token> {
        self.fill(offset + 1)?;
        Ok(self.queue[offset].clone())
    }

    fn advance(&mut self) -> Result<Token> {
        self.fill(1)?;
        Ok(self.queue.pop_front().unwrap())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let tok = self.advance()?;
        if std::mem::discriminant(&tok.kind) == std::mem::discriminant(&kind) {
            Ok(tok)
        } else {
            Err(self.error(&tok, format!("expected {:?}, found {:?}", kind, tok.kind)))
        }
    }

    fn error(&self, tok: &Token, message: impl Into<String>) -> ScriptError {
        let message = message.into();
        tracing::trace!(line = tok.line, column = tok.column, %message, "parse error");
        ScriptError::ParseError {
            message,
            line: tok.line,
            column: tok.column,
        }
    }

    // -- precedence ladder ---------------------------------------------

    fn parse_assignment(&mut self) -> Result<Rc<Expr>> {
        if let TokenKind::Identifier(name) = &self.peek()?.kind {
            let name = name.clone();
            if self.peek_at(1)?.kind == TokenKind::Eq {
                self.advance()?; // identifier
                self.advance()?; // '='
                let sym = Symbol::intern(&name);
                self.locals.insert(sym);
                let value = self.parse_assignment()?;
                return Ok(Rc::new(Expr::Assignment(sym, value)));
            }
        }
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Rc<Expr>> {
        let cond = self.parse_logical_or()?;
        if self.peek()?.kind == TokenKind::Question {
            self.advance()?;
            let then_branch = self.parse_ternary()?;
            self.expect(TokenKind::Colon)?;
            let else_branch = self.parse_ternary()?;
            return Ok(Rc::new(Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            }));
        }
        Ok(cond)
    }

    fn parse_logical_or(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_logical_and()?;
        while self.peek()?.kind == TokenKind::PipePipe {
            self.advance()?;
            let rhs = self.parse_logical_and()?;
            // `a || b` desugars to `a ? a : b`.
            lhs = Rc::new(Expr::Conditional {
                cond: lhs.clone(),
                then_branch: lhs,
                else_branch: rhs,
            });
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_equality()?;
        while self.peek()?.kind == TokenKind::AmpAmp {
            self.advance()?;
            let rhs = self.parse_equality()?;
            // `a && b` desugars to `a ? b : a`.
            lhs = Rc::new(Expr::Conditional {
                cond: lhs.clone(),
                then_branch: rhs,
                else_branch: lhs,
            });
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::MatchOp => BinaryOp::Match,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_comparison()?;
            lhs = Rc::new(Expr::Binary(op, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_range()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                TokenKind::Spaceship => BinaryOp::Spaceship,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_range()?;
            lhs = Rc::new(Expr::Binary(op, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_range(&mut self) -> Result<Rc<Expr>> {
        let lhs = self.parse_bitor()?;
        match self.peek()?.kind {
            TokenKind::DotDot => {
                self.advance()?;
                let rhs = self.parse_bitor()?;
                Ok(Rc::new(Expr::InclusiveRangeOp(lhs, rhs)))
            }
            TokenKind::DotDotDot => {
                self.advance()?;
                let rhs = self.parse_bitor()?;
                Ok(Rc::new(Expr::ExclusiveRangeOp(lhs, rhs)))
            }
            _ => Ok(lhs),
        }
    }

    fn parse_bitor(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_bitand()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::Pipe => BinaryOp::BitOr,
                TokenKind::Caret => BinaryOp::BitXor,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_bitand()?;
            lhs = Rc::new(Expr::Binary(op, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_shift()?;
        while self.peek()?.kind == TokenKind::Amp {
            self.advance()?;
            let rhs = self.parse_shift()?;
            lhs = Rc::new(Expr::Binary(BinaryOp::BitAnd, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::ShiftLeft => BinaryOp::ShiftLeft,
                TokenKind::ShiftRight => BinaryOp::ShiftRight,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_additive()?;
            lhs = Rc::new(Expr::Binary(op, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_multiplicative()?;
            lhs = Rc::new(Expr::Binary(op, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_unary()?;
            lhs = Rc::new(Expr::Binary(op, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Rc<Expr>> {
        let op = match self.peek()?.kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            // Unary binds looser than `**`, so `-2 ** 2` is `-(2 ** 2)`.
            let operand = self.parse_unary()?;
            return Ok(Rc::new(Expr::Unary(op, operand)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Rc<Expr>> {
        let lhs = self.parse_postfix()?;
        if self.peek()?.kind == TokenKind::StarStar {
            self.advance()?;
            // Right-associative: `2 ** 3 ** 2 == 2 ** (3 ** 2)`.
            let rhs = self.parse_power()?;
            return Ok(Rc::new(Expr::Binary(BinaryOp::Pow, lhs, rhs)));
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Rc<Expr>> {
        let mut lhs = self.parse_primary()?;
        loop {
            match self.peek()?.kind {
                TokenKind::Dot => {
                    self.advance()?;
                    let name = self.expect_method_name()?;
                    let (args, cache) = self.parse_call_tail()?;
                    lhs = Rc::new(Expr::MemberFuncCall { lhs, name, args, cache });
                }
                TokenKind::SafeNav => {
                    self.advance()?;
                    let name = self.expect_method_name()?;
                    let (args, cache) = self.parse_call_tail()?;
                    lhs = Rc::new(Expr::SafeNavMemberFuncCall { lhs, name, args, cache });
                }
                TokenKind::ColonColon => {
                    self.advance()?;
                    let name = self.expect_constant_name()?;
                    lhs = Rc::new(Expr::ConstantNav(lhs, name));
                }
                TokenKind::LBracket => {
                    self.advance()?;
                    let args = self.parse_arg_list_until(&TokenKind::RBracket)?;
                    self.expect(TokenKind::RBracket)?;
                    lhs = Rc::new(Expr::ElementRefOp { lhs, args });
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn expect_method_name(&mut self) -> Result<Symbol> {
        let tok = self.advance()?;
        match tok.kind {
            TokenKind::Identifier(name) => Ok(Symbol::intern(&name)),
            other => Err(self.error(&tok, format!("expected a method name, found {other:?}"))),
        }
    }

    fn expect_constant_name(&mut self) -> Result<Symbol> {
        let tok = self.advance()?;
        match tok.kind {
            TokenKind::Constant(name) => Ok(Symbol::intern(&name)),
            other => Err(self.error(&tok, format!("expected a constant name, found {other:?}"))),
        }
    }

    /// Parses a call's argument list (parenthesized or juxtaposed) and any
    /// trailing block, for use after a call name has already been consumed.
    fn parse_call_tail(&mut self) -> Result<(Vec<Rc<Expr>>, DispatchCache)> {
        let mut args = if self.peek()?.kind == TokenKind::LParen {
            self.advance()?;
            let args = self.parse_arg_list_until(&TokenKind::RParen)?;
            self.expect(TokenKind::RParen)?;
            args
        } else if starts_juxtaposed_arg(&self.peek()?.kind) {
            let mut args = vec![self.parse_ternary()?];
            while self.peek()?.kind == TokenKind::Comma {
                self.advance()?;
                args.push(self.parse_ternary()?);
            }
            args
        } else {
            Vec::new()
        };
        if let Some(block) = self.try_parse_trailing_block()? {
            args.push(block);
        }
        Ok((args, DispatchCache::new()))
    }

    fn parse_arg_list_until(&mut self, end: &TokenKind) -> Result<Vec<Rc<Expr>>> {
        let mut items = Vec::new();
        if &self.peek()?.kind != end {
            loop {
                items.push(self.parse_ternary()?);
                if self.peek()?.kind == TokenKind::Comma {
                    self.advance()?;
                    if &self.peek()?.kind == end {
                        break; // trailing comma
                    }
                    continue;
                }
                break;
            }
        }
        Ok(items)
    }

    /// `{ |params| body }` or `do |params| body end`, attached as the call's
    /// last argument. A bare `{` right after a call name is always a block,
    /// never a hash-literal argument (matching the source language's own
    /// disambiguation); hash literals as call arguments need either parens
    /// or their own primary-expression position.
    fn try_parse_trailing_block(&mut self) -> Result<Option<Rc<Expr>>> {
        let closer = match self.peek()?.kind {
            TokenKind::LBrace => TokenKind::RBrace,
            TokenKind::Do => TokenKind::End,
            _ => return Ok(None),
        };
        self.advance()?;
        let params = self.parse_block_params()?;
        let body = self.parse_assignment()?;
        self.expect(closer)?;
        for p in &params {
            self.locals.remove(*p);
        }
        Ok(Some(Rc::new(Expr::Block { params, body })))
    }

    fn parse_block_params(&mut self) -> Result<Vec<Symbol>> {
        let mut params = Vec::new();
        if self.peek()?.kind != TokenKind::Pipe {
            return Ok(params);
        }
        self.advance()?;
        if self.peek()?.kind != TokenKind::Pipe {
            loop {
                let tok = self.advance()?;
                match tok.kind {
                    TokenKind::Identifier(name) => {
                        let sym = Symbol::intern(&name);
                        self.locals.insert(sym);
                        params.push(sym);
                    }
                    other => return Err(self.error(&tok, format!("expected a block parameter name, found {other:?}"))),
                }
                if self.peek()?.kind == TokenKind::Comma {
                    self.advance()?;
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::Pipe)?;
        Ok(params)
    }

    fn parse_primary(&mut self) -> Result<Rc<Expr>> {
        let tok = self.advance()?;
        match tok.kind {
            TokenKind::Integer(n) => Ok(Rc::new(Expr::Literal(Object::Number(n as f64)))),
            TokenKind::Float(n) => Ok(Rc::new(Expr::Literal(Object::Number(n)))),
            TokenKind::True => Ok(Rc::new(Expr::Literal(Object::true_()))),
            TokenKind::False => Ok(Rc::new(Expr::Literal(Object::false_()))),
            TokenKind::Nil => Ok(Rc::new(Expr::Literal(Object::Nil))),
            TokenKind::SymbolLiteral(name) => Ok(Rc::new(Expr::Literal(Object::symbol(name)))),
            TokenKind::StringLiteral(parts) => self.build_string_expr(parts),
            TokenKind::RegexLiteral(parts, options) => self.build_regex_expr(parts, options),
            TokenKind::Attribute(name) => Ok(Rc::new(Expr::Attribute(Symbol::intern(&name)))),
            TokenKind::Constant(name) => Ok(Rc::new(Expr::GlobalConstant(Symbol::intern(&name)))),
            TokenKind::Identifier(name) => self.resolve_identifier(name),
            TokenKind::LParen => {
                let inner = self.parse_assignment()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let items = self.parse_arg_list_until(&TokenKind::RBracket)?;
                self.expect(TokenKind::RBracket)?;
                Ok(Rc::new(Expr::ArrayLiteral(items)))
            }
            TokenKind::LBrace => self.parse_hash_literal(),
            other => Err(self.error(&tok, format!("unexpected token {other:?}"))),
        }
    }

    /// Resolution order from spec.md §4.2: known local → `Variable`; known
    /// global function name → `GlobalFuncCall`; otherwise `Variable`, which
    /// falls back to an implicit zero-argument self-call at eval time
    /// (`Scope::get`). Capitalized identifiers never reach here — the lexer
    /// tags them `Constant` — so the "leading uppercase" branch of the
    /// resolution order is handled in `parse_primary` directly.
    fn resolve_identifier(&mut self, name: String) -> Result<Rc<Expr>> {
        let sym = Symbol::intern(&name);
        if self.locals.contains(sym) {
            return Ok(Rc::new(Expr::Variable(sym)));
        }
        if self.globals.contains(sym) {
            let (args, cache) = self.parse_call_tail()?;
            return Ok(Rc::new(Expr::GlobalFuncCall { name: sym, args, cache }));
        }
        Ok(Rc::new(Expr::Variable(sym)))
    }

    fn parse_hash_literal(&mut self) -> Result<Rc<Expr>> {
        let mut entries = Vec::new();
        if self.peek()?.kind != TokenKind::RBrace {
            loop {
                entries.push(self.parse_hash_entry()?);
                if self.peek()?.kind == TokenKind::Comma {
                    self.advance()?;
                    if self.peek()?.kind == TokenKind::RBrace {
                        break; // trailing comma
                    }
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Rc::new(Expr::HashLiteral(entries)))
    }

    fn parse_hash_entry(&mut self) -> Result<HashEntry> {
        if let TokenKind::Identifier(name) = &self.peek()?.kind {
            if self.peek_at(1)?.kind == TokenKind::Colon {
                let name = name.clone();
                self.advance()?; // identifier
                self.advance()?; // ':'
                let key = Rc::new(Expr::Literal(Object::symbol(name)));
                let value = self.parse_ternary()?;
                return Ok(HashEntry { key, value });
            }
        }
        let key = self.parse_ternary()?;
        self.expect(TokenKind::FatArrow)?;
        let value = self.parse_ternary()?;
        Ok(HashEntry { key, value })
    }

    fn build_string_expr(&mut self, parts: Vec<StringPart>) -> Result<Rc<Expr>> {
        if let [StringPart::Literal(s)] = parts.as_slice() {
            return Ok(Rc::new(Expr::Literal(Object::string(s.clone()))));
        }
        let segments = self.build_segments(parts)?;
        Ok(Rc::new(Expr::InterpolatedString(segments)))
    }

    fn build_regex_expr(&mut self, parts: Vec<StringPart>, options: String) -> Result<Rc<Expr>> {
        let segments = self.build_segments(parts)?;
        Ok(Rc::new(Expr::InterpolatedRegex { segments, options }))
    }

    fn build_segments(&mut self, parts: Vec<StringPart>) -> Result<Vec<StringSegment>> {
        let mut segments = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                StringPart::Literal(s) => segments.push(StringSegment::Literal(s)),
                StringPart::Interpolation(src) => {
                    segments.push(StringSegment::Expr(self.parse_sub_expression(&src)?));
                }
            }
        }
        Ok(segments)
    }

    /// Re-lexes and parses the source text of a `#{...}` interpolation,
    /// sharing this parser's current local-variable set (an assignment
    /// inside an interpolation introduces a local visible for the rest of
    /// the enclosing expression, since both run in the same scope at eval
    /// time).
    fn parse_sub_expression(&mut self, src: &str) -> Result<Rc<Expr>> {
        let mut sub = Parser::new(src, self.locals.clone(), self.globals.clone());
        let expr = sub.parse_assignment()?;
        let trailing = sub.peek()?;
        if trailing.kind != TokenKind::Eof {
            return Err(sub.error(&trailing, format!("unexpected trailing token {:?} in interpolation", trailing.kind)));
        }
        self.locals = sub.locals;
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Rc<Expr> {
        parse_expression(src, &LocalVarNames::new(), &GlobalFunctions::new()).unwrap()
    }

    #[test]
    fn parses_integer_literal() {
        assert_eq!(parse("42").to_string(), "42");
    }

    #[test]
    fn parses_arithmetic_precedence() {
        // `2 + 3 * 4` should group as `2 + (3 * 4)`.
        let expr = parse("2 + 3 * 4");
        match &*expr {
            Expr::Binary(BinaryOp::Add, lhs, rhs) => {
                assert_eq!(lhs.to_string(), "2");
                assert_eq!(rhs.to_string(), "3 * 4");
            }
            other => panic!("expected Add at the top, got {other}"),
        }
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        let expr = parse("-2 ** 2");
        match &*expr {
            Expr::Unary(UnaryOp::Neg, operand) => assert_eq!(operand.to_string(), "2 ** 2"),
            other => panic!("expected a top-level Unary, got {other}"),
        }
    }

    #[test]
    fn power_is_right_associative() {
        let expr = parse("2 ** 3 ** 2");
        match &*expr {
            Expr::Binary(BinaryOp::Pow, lhs, rhs) => {
                assert_eq!(lhs.to_string(), "2");
                assert_eq!(rhs.to_string(), "3 ** 2");
            }
            other => panic!("expected Pow at the top, got {other}"),
        }
    }

    #[test]
    fn desugars_and_or_into_conditional() {
        assert_eq!(parse("a && b").to_string(), "a ? b : a");
        assert_eq!(parse("a || b").to_string(), "a ? a : b");
    }

    #[test]
    fn ternary_parses() {
        let expr = parse("cond ? 1 : 2");
        assert!(matches!(&*expr, Expr::Conditional { .. }));
    }

    #[test]
    fn member_call_with_parens() {
        let expr = parse("'test'.split('')");
        match &*expr {
            Expr::MemberFuncCall { name, args, .. } => {
                assert_eq!(name.as_str(), "split");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected MemberFuncCall, got {other}"),
        }
    }

    #[test]
    fn member_call_with_juxtaposed_args() {
        let expr = parse("'hello world'.partition ' '");
        match &*expr {
            Expr::MemberFuncCall { name, args, .. } => {
                assert_eq!(name.as_str(), "partition");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected MemberFuncCall, got {other}"),
        }
    }

    #[test]
    fn juxtaposed_args_support_multiple_comma_separated_values() {
        let expr = parse("'hello world'.rindex 'l', -20");
        match &*expr {
            Expr::MemberFuncCall { args, .. } => assert_eq!(args.len(), 2),
            other => panic!("expected MemberFuncCall, got {other}"),
        }
    }

    #[test]
    fn trailing_brace_block_attaches_as_last_arg() {
        let expr = parse("'test'.each_line.each{|x| x}");
        match &*expr {
            Expr::MemberFuncCall { name, args, .. } => {
                assert_eq!(name.as_str(), "each");
                assert_eq!(args.len(), 1);
                assert!(matches!(*args[0], Expr::Block { .. }));
            }
            other => panic!("expected MemberFuncCall, got {other}"),
        }
    }

    #[test]
    fn safe_navigation_parses() {
        let expr = parse("x&.foo");
        assert!(matches!(&*expr, Expr::SafeNavMemberFuncCall { .. }));
    }

    #[test]
    fn hash_literal_with_colon_shorthand() {
        let expr = parse("{a: 1, b: 2}");
        match &*expr {
            Expr::HashLiteral(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].key.to_string(), ":a");
            }
            other => panic!("expected HashLiteral, got {other}"),
        }
    }

    #[test]
    fn hash_literal_with_fat_arrow() {
        let expr = parse("{1 => 2}");
        assert!(matches!(&*expr, Expr::HashLiteral(entries) if entries.len() == 1));
    }

    #[test]
    fn array_literal_parses() {
        let expr = parse("[1, 2, 3]");
        assert!(matches!(&*expr, Expr::ArrayLiteral(items) if items.len() == 3));
    }

    #[test]
    fn interpolated_string_parses_segments() {
        let expr = parse(r#""hi #{name}!""#);
        match &*expr {
            Expr::InterpolatedString(segments) => assert_eq!(segments.len(), 3),
            other => panic!("expected InterpolatedString, got {other}"),
        }
    }

    #[test]
    fn assignment_makes_subsequent_uses_a_variable() {
        let mut locals = LocalVarNames::new();
        let globals = GlobalFunctions::new();
        let expr = parse_expression("x = 1", &locals, &globals).unwrap();
        match &*expr {
            Expr::Assignment(sym, _) => {
                locals.insert(*sym);
            }
            other => panic!("expected Assignment, got {other}"),
        }
        let next = parse_expression("x", &locals, &globals).unwrap();
        assert!(matches!(&*next, Expr::Variable(_)));
    }

    #[test]
    fn unknown_global_call_rejects_stray_parens() {
        // `foo` is neither a local nor a registered global, so `foo()`
        // leaves a trailing `(` the top-level parser rejects.
        let err = parse_expression("foo()", &LocalVarNames::new(), &GlobalFunctions::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ParseError);
    }

    #[test]
    fn known_global_function_call() {
        let globals: GlobalFunctions = [Symbol::intern("link_to")].into_iter().collect();
        let expr = parse_expression("link_to 'x'", &LocalVarNames::new(), &globals).unwrap();
        assert!(matches!(&*expr, Expr::GlobalFuncCall { .. }));
    }

    #[test]
    fn element_ref_parses() {
        let expr = parse("arr[0]");
        assert!(matches!(&*expr, Expr::ElementRefOp { .. }));
    }

    #[test]
    fn range_operators_parse() {
        assert!(matches!(&*parse("1..5"), Expr::InclusiveRangeOp(_, _)));
        assert!(matches!(&*parse("1...5"), Expr::ExclusiveRangeOp(_, _)));
    }
}
