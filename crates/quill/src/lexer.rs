// Copyright 2019-2026 Quill Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Lexer for the embedded expression language.
//!
//! Produces a stream of [`Token`]s from a single expression fragment handed
//! to us by the (external) template tokenizer. The lexer tracks byte offsets
//! for error reporting but scans identifiers and string content on Unicode
//! scalar value boundaries, never splitting a multi-byte character.
//!
//! Supports one-token lookahead via [`Lexer::peek`] and rewinding to the last
//! peeked token via [`Lexer::rewind`], which is all the parser needs for its
//! Pratt-style precedence climb.

use std::str::CharIndices;

use crate::error::{Result, ScriptError};

/// A lexical token, carrying its kind, source span, and line/column for
/// error messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Byte offset of the first byte.
    pub start: usize,
    /// Byte offset one past the last byte.
    pub end: usize,
    /// 1-indexed line number of `start`.
    pub line: usize,
    /// 1-indexed column number of `start`.
    pub column: usize,
}

/// A piece of a double-quoted string: either literal text or the source text
/// of an interpolated `#{...}` sub-expression (re-lexed and re-parsed by the
/// parser, not by the lexer).
#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    /// Literal text with escapes already processed.
    Literal(String),
    /// The raw source of a `#{...}` interpolation, without the braces.
    Interpolation(String),
}

/// The kind of a lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A plain identifier, e.g. `foo`, `each_char`.
    Identifier(String),
    /// An `@name` attribute reference.
    Attribute(String),
    /// A capitalized identifier, e.g. `String`, `A`.
    Constant(String),
    /// An integer literal (decimal, `0x…`, or `0b…|`).
    Integer(i64),
    /// A float literal; always has a decimal point with digits on both sides.
    Float(f64),
    /// A single- or double-quoted string literal. Single-quoted strings have
    /// exactly one `Literal` part; double-quoted strings may interleave
    /// `Literal` and `Interpolation` parts.
    StringLiteral(Vec<StringPart>),
    /// A `/pattern/flags` regex literal. The body may itself contain
    /// `#{...}` interpolations, tracked the same way as string literals.
    RegexLiteral(Vec<StringPart>, String),
    /// A `:name` symbol literal.
    SymbolLiteral(String),
    /// `true`
    True,
    /// `false`
    False,
    /// `nil`
    Nil,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `**`
    StarStar,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `!`
    Bang,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `=~`
    MatchOp,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<=>`
    Spaceship,
    /// `=`
    Eq,
    /// `=>`
    FatArrow,
    /// `..`
    DotDot,
    /// `...`
    DotDotDot,
    /// `.`
    Dot,
    /// `&.`
    SafeNav,
    /// `::`
    ColonColon,
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `do`
    Do,
    /// `end`
    End,
    /// A newline. Only significant to the surrounding template tokenizer;
    /// the expression parser treats it as insignificant whitespace.
    Newline,
    /// End of input.
    Eof,
}

/// Lexes a single expression fragment, producing a one-token-lookahead
/// stream of [`Token`]s.
pub struct Lexer<'a> {
    source: &'a str,
    chars: CharIndices<'a>,
    current: Option<(usize, char)>,
    line: usize,
    column: usize,
    peeked: Option<Token>,
    last_consumed_line: usize,
    last_consumed_column: usize,
    /// Whether the most recently *consumed* token could end an operand
    /// (identifier, literal, `)`, `]`). Used to disambiguate a leading `/`
    /// between "division operator" and "start of a regex literal": Ruby-like
    /// grammars make this decision from the preceding token, since `a / b`
    /// and `a /b/` are both otherwise valid prefixes.
    prev_operand_end: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer over `source`.
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.char_indices();
        let current = chars.next();
        Lexer {
            source,
            chars,
            current,
            line: 1,
            column: 1,
            peeked: None,
            last_consumed_line: 1,
            last_consumed_column: 1,
            prev_operand_end: false,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.current?;
        self.current = self.chars.next();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_char(&self) -> Option<char> {
        self.current.map(|(_, c)| c)
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.source[self.byte_pos()..].chars().nth(offset)
    }

    fn byte_pos(&self) -> usize {
        match self.current {
            Some((pos, _)) => pos,
            None => self.source.len(),
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize, start_line: usize, start_col: usize) -> Token {
        Token {
            kind,
            start,
            end: self.byte_pos(),
            line: start_line,
            column: start_col,
        }
    }

    /// Returns the next token without consuming it. A subsequent call to
    /// [`Lexer::next_token`] returns this same token.
    pub fn peek(&mut self) -> Result<Token> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scan_token()?);
        }
        Ok(self.peeked.clone().unwrap())
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        let tok = match self.peeked.take() {
            Some(tok) => tok,
            None => self.scan_token()?,
        };
        self.last_consumed_line = tok.line;
        self.last_consumed_column = tok.column;
        self.prev_operand_end = ends_operand(&tok.kind);
        Ok(tok)
    }

    /// Pushes `tok` back so the next [`Lexer::next_token`]/[`Lexer::peek`]
    /// returns it again. Only one token of rewind is supported, matching the
    /// one-token lookahead the parser needs.
    pub fn rewind(&mut self, tok: Token) {
        self.peeked = Some(tok);
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == ' ' || c == '\t' {
                self.advance();
            } else if c == '\\' && self.peek_char_at(1) == Some('\n') {
                self.advance();
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_token(&mut self) -> Result<Token> {
        self.skip_inline_whitespace();
        let start = self.byte_pos();
        let start_line = self.line;
        let start_col = self.column;

        let Some(c) = self.peek_char() else {
            return Ok(self.make_token(TokenKind::Eof, start, start_line, start_col));
        };

        if c == '\n' {
            self.advance();
            return Ok(self.make_token(TokenKind::Newline, start, start_line, start_col));
        }
        if c == '#' {
            while let Some(c) = self.peek_char() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
            return self.scan_token();
        }
        if c.is_ascii_digit() {
            return self.scan_number(start, start_line, start_col);
        }
        if c == '\'' || c == '"' {
            return self.scan_string(c, start, start_line, start_col);
        }
        if c == ':' && (self.peek_char_at(1).map_or(false, is_ident_start)) {
            self.advance();
            let name = self.scan_identifier_text();
            return Ok(self.make_token(TokenKind::SymbolLiteral(name), start, start_line, start_col));
        }
        if c == '/' && !self.prev_operand_end {
            return self.scan_regex(start, start_line, start_col);
        }
        if c == '@' {
            self.advance();
            let name = self.scan_identifier_text();
            return Ok(self.make_token(TokenKind::Attribute(name), start, start_line, start_col));
        }
        if is_ident_start(c) {
            let name = self.scan_identifier_text();
            let kind = match name.as_str() {
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                "nil" => TokenKind::Nil,
                "do" => TokenKind::Do,
                "end" => TokenKind::End,
                _ => {
                    if name.chars().next().map_or(false, |c| c.is_uppercase()) {
                        TokenKind::Constant(name)
                    } else {
                        TokenKind::Identifier(name)
                    }
                }
            };
            return Ok(self.make_token(kind, start, start_line, start_col));
        }

        self.scan_operator(start, start_line, start_col)
    }

    fn scan_identifier_text(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        // Ruby-style trailing `?` or `!` on method-like identifiers, e.g. `empty?`, `has_key?`.
        if let Some(c) = self.peek_char() {
            if c == '?' || c == '!' {
                s.push(c);
                self.advance();
            }
        }
        s
    }

    fn scan_number(&mut self, start: usize, start_line: usize, start_col: usize) -> Result<Token> {
        if self.peek_char() == Some('0') && matches!(self.peek_char_at(1), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            let mut digits = String::new();
            while let Some(c) = self.peek_char() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                return Err(self.lex_error("invalid hex literal", start_line, start_col));
            }
            let v = i64::from_str_radix(&digits, 16)
                .map_err(|_| self.lex_error("invalid hex literal", start_line, start_col))?;
            return Ok(self.make_token(TokenKind::Integer(v), start, start_line, start_col));
        }
        if self.peek_char() == Some('0') && matches!(self.peek_char_at(1), Some('b') | Some('B')) {
            self.advance();
            self.advance();
            let mut digits = String::new();
            while let Some(c) = self.peek_char() {
                if c == '0' || c == '1' {
                    digits.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                return Err(self.lex_error("invalid binary literal", start_line, start_col));
            }
            let v = i64::from_str_radix(&digits, 2)
                .map_err(|_| self.lex_error("invalid binary literal", start_line, start_col))?;
            return Ok(self.make_token(TokenKind::Integer(v), start, start_line, start_col));
        }

        let mut digits = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()) {
            digits.push('.');
            self.advance();
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            let v: f64 = digits
                .parse()
                .map_err(|_| self.lex_error("invalid float literal", start_line, start_col))?;
            return Ok(self.make_token(TokenKind::Float(v), start, start_line, start_col));
        }
        let v: i64 = digits
            .parse()
            .map_err(|_| self.lex_error("invalid integer literal", start_line, start_col))?;
        Ok(self.make_token(TokenKind::Integer(v), start, start_line, start_col))
    }

    fn scan_string(&mut self, quote: char, start: usize, start_line: usize, start_col: usize) -> Result<Token> {
        self.advance(); // opening quote
        let mut parts = Vec::new();
        let mut literal = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.lex_error("unterminated string literal", start_line, start_col)),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        None => return Err(self.lex_error("unterminated string literal", start_line, start_col)),
                        Some(esc) => {
                            if quote == '\'' {
                                match esc {
                                    '\\' => literal.push('\\'),
                                    '\'' => literal.push('\''),
                                    other => {
                                        literal.push('\\');
                                        literal.push(other);
                                    }
                                }
                            } else {
                                match esc {
                                    '\\' => literal.push('\\'),
                                    '\'' => literal.push('\''),
                                    '"' => literal.push('"'),
                                    'r' => literal.push('\r'),
                                    'n' => literal.push('\n'),
                                    't' => literal.push('\t'),
                                    '0'..='9' => {
                                        let mut digits = String::new();
                                        while let Some(d) = self.peek_char() {
                                            if d.is_ascii_digit() && digits.len() < 3 {
                                                digits.push(d);
                                                self.advance();
                                            } else {
                                                break;
                                            }
                                        }
                                        let code: u32 = digits.parse().unwrap_or(0);
                                        if let Some(ch) = char::from_u32(code) {
                                            literal.push(ch);
                                        }
                                        continue;
                                    }
                                    other => literal.push(other),
                                }
                            }
                            self.advance();
                        }
                    }
                }
                Some('#') if quote == '"' && self.peek_char_at(1) == Some('{') => {
                    if !literal.is_empty() {
                        parts.push(StringPart::Literal(std::mem::take(&mut literal)));
                    }
                    self.advance(); // '#'
                    self.advance(); // '{'
                    let mut depth = 1usize;
                    let mut inner = String::new();
                    loop {
                        match self.peek_char() {
                            None => return Err(self.lex_error("unterminated interpolation", start_line, start_col)),
                            Some('{') => {
                                depth += 1;
                                inner.push('{');
                                self.advance();
                            }
                            Some('}') => {
                                depth -= 1;
                                self.advance();
                                if depth == 0 {
                                    break;
                                }
                                inner.push('}');
                            }
                            Some(c) => {
                                inner.push(c);
                                self.advance();
                            }
                        }
                    }
                    parts.push(StringPart::Interpolation(inner));
                }
                Some(c) => {
                    literal.push(c);
                    self.advance();
                }
            }
        }
        if !literal.is_empty() || parts.is_empty() {
            parts.push(StringPart::Literal(literal));
        }
        Ok(self.make_token(TokenKind::StringLiteral(parts), start, start_line, start_col))
    }

    fn scan_regex(&mut self, start: usize, start_line: usize, start_col: usize) -> Result<Token> {
        self.advance(); // opening '/'
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut in_class = false;
        loop {
            match self.peek_char() {
                None => return Err(self.lex_error("unterminated regex literal", start_line, start_col)),
                Some('\\') => {
                    literal.push('\\');
                    self.advance();
                    if let Some(c) = self.peek_char() {
                        literal.push(c);
                        self.advance();
                    }
                }
                Some('[') => {
                    in_class = true;
                    literal.push('[');
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    literal.push(']');
                    self.advance();
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some('#') if self.peek_char_at(1) == Some('{') => {
                    if !literal.is_empty() {
                        parts.push(StringPart::Literal(std::mem::take(&mut literal)));
                    }
                    self.advance();
                    self.advance();
                    let mut depth = 1usize;
                    let mut inner = String::new();
                    loop {
                        match self.peek_char() {
                            None => return Err(self.lex_error("unterminated interpolation", start_line, start_col)),
                            Some('{') => {
                                depth += 1;
                                inner.push('{');
                                self.advance();
                            }
                            Some('}') => {
                                depth -= 1;
                                self.advance();
                                if depth == 0 {
                                    break;
                                }
                                inner.push('}');
                            }
                            Some(c) => {
                                inner.push(c);
                                self.advance();
                            }
                        }
                    }
                    parts.push(StringPart::Interpolation(inner));
                }
                Some(c) => {
                    literal.push(c);
                    self.advance();
                }
            }
        }
        if !literal.is_empty() || parts.is_empty() {
            parts.push(StringPart::Literal(literal));
        }
        let mut flags = String::new();
        while let Some(c) = self.peek_char() {
            if c == 'i' || c == 'm' || c == 'x' {
                flags.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Ok(self.make_token(TokenKind::RegexLiteral(parts, flags), start, start_line, start_col))
    }

    fn scan_operator(&mut self, start: usize, start_line: usize, start_col: usize) -> Result<Token> {
        let c = self.advance().unwrap();
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => {
                if self.peek_char() == Some('*') {
                    self.advance();
                    TokenKind::StarStar
                } else {
                    TokenKind::Star
                }
            }
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '&' => {
                if self.peek_char() == Some('&') {
                    self.advance();
                    TokenKind::AmpAmp
                } else if self.peek_char() == Some('.') {
                    self.advance();
                    TokenKind::SafeNav
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.peek_char() == Some('|') {
                    self.advance();
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => TokenKind::Caret,
            '!' => {
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '=' => {
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::EqEq
                } else if self.peek_char() == Some('~') {
                    self.advance();
                    TokenKind::MatchOp
                } else if self.peek_char() == Some('>') {
                    self.advance();
                    TokenKind::FatArrow
                } else {
                    TokenKind::Eq
                }
            }
            '<' => {
                if self.peek_char() == Some('=') {
                    self.advance();
                    if self.peek_char() == Some('>') {
                        self.advance();
                        TokenKind::Spaceship
                    } else {
                        TokenKind::LtEq
                    }
                } else if self.peek_char() == Some('<') {
                    self.advance();
                    TokenKind::ShiftLeft
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::GtEq
                } else if self.peek_char() == Some('>') {
                    self.advance();
                    TokenKind::ShiftRight
                } else {
                    TokenKind::Gt
                }
            }
            '.' => {
                if self.peek_char() == Some('.') {
                    self.advance();
                    if self.peek_char() == Some('.') {
                        self.advance();
                        TokenKind::DotDotDot
                    } else {
                        TokenKind::DotDot
                    }
                } else {
                    TokenKind::Dot
                }
            }
            ':' => {
                if self.peek_char() == Some(':') {
                    self.advance();
                    TokenKind::ColonColon
                } else {
                    TokenKind::Colon
                }
            }
            '?' => TokenKind::Question,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            other => {
                return Err(self.lex_error(&format!("unexpected character '{other}'"), start_line, start_col));
            }
        };
        Ok(self.make_token(kind, start, start_line, start_col))
    }

    fn lex_error(&self, message: &str, line: usize, column: usize) -> ScriptError {
        tracing::trace!(line, column, message, "lex error");
        ScriptError::LexError {
            message: message.to_string(),
            line,
            column,
        }
    }
}

fn ends_operand(kind: &TokenKind) -> bool {
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
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::End
    )
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn lexes_identifiers_and_constants() {
        assert_eq!(
            kinds("foo Bar empty?"),
            vec![
                TokenKind::Identifier("foo".into()),
                TokenKind::Constant("Bar".into()),
                TokenKind::Identifier("empty?".into()),
            ]
        );
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(
            kinds("1 2.5 0x1F 0b101"),
            vec![
                TokenKind::Integer(1),
                TokenKind::Float(2.5),
                TokenKind::Integer(31),
                TokenKind::Integer(5),
            ]
        );
    }

    #[test]
    fn lexes_single_quoted_string_with_minimal_escapes() {
        let toks = kinds(r"'it\'s \\ok'");
        assert_eq!(
            toks,
            vec![TokenKind::StringLiteral(vec![StringPart::Literal("it's \\ok".into())])]
        );
    }

    #[test]
    fn lexes_double_quoted_string_with_interpolation() {
        let toks = kinds(r#""hi #{name}!""#);
        assert_eq!(
            toks,
            vec![TokenKind::StringLiteral(vec![
                StringPart::Literal("hi ".into()),
                StringPart::Interpolation("name".into()),
                StringPart::Literal("!".into()),
            ])]
        );
    }

    #[test]
    fn lexes_operators() {
        assert_eq!(
            kinds("&. <=> == != <= >= << >> && ||"),
            vec![
                TokenKind::SafeNav,
                TokenKind::Spaceship,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::ShiftLeft,
                TokenKind::ShiftRight,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
            ]
        );
    }

    #[test]
    fn lexes_fat_arrow_distinct_from_eq_and_eqeq() {
        assert_eq!(
            kinds("= == =>"),
            vec![TokenKind::Eq, TokenKind::EqEq, TokenKind::FatArrow]
        );
    }

    #[test]
    fn lexes_symbol_literal() {
        assert_eq!(kinds(":name"), vec![TokenKind::SymbolLiteral("name".into())]);
    }

    #[test]
    fn rejects_unterminated_string() {
        let mut lexer = Lexer::new("'abc");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn peek_then_next_returns_same_token() {
        let mut lexer = Lexer::new("foo bar");
        let peeked = lexer.peek().unwrap();
        let next = lexer.next_token().unwrap();
        assert_eq!(peeked, next);
    }
}
