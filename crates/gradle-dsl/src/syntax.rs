//! Build Script Syntax Tree
//!
//! A forgiving recursive-descent parser over [`crate::lexer`] tokens.
//! Statements it cannot model become [`StatementKind::Unparsed`] and keep
//! their text; only unbalanced delimiters are hard errors.

use crate::lexer::{tokenize, Span, Token, TokenKind};
use crate::parser::ParseError;

/// Kotlin calls that introduce a named child of a container block
const NAMED_CHILD_CALLS: &[&str] = &["create", "getByName", "named", "register", "maybeCreate", "getting", "creating"];

/// Kotlin collection factories parsed as list literals
const LIST_FACTORIES: &[&str] = &["listOf", "mutableListOf", "setOf", "mutableSetOf", "arrayOf", "listOfNotNull"];

/// Kotlin map factories
const MAP_FACTORIES: &[&str] = &["mapOf", "mutableMapOf", "hashMapOf"];

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    String(String),
    /// Raw text between the quotes of a string with injections
    Interpolated(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Null,
    /// Dotted or indexed identifier path such as `rootProject.ext.foo` or `deps['x']`
    Reference,
    Call { name: String, args: Vec<Expr> },
    List { items: Vec<Expr>, inner: Span },
    Map { entries: Vec<MapEntry>, inner: Span },
    /// Anything else, kept as source text
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: String,
    pub key_span: Span,
    pub value: Expr,
    pub span: Span,
}

/// A possibly dotted statement name
#[derive(Debug, Clone, PartialEq)]
pub struct NameSyntax {
    pub parts: Vec<String>,
    pub span: Span,
    /// Span of the last part only
    pub last_span: Span,
}

impl NameSyntax {
    pub fn last(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    pub fn prefix(&self) -> &[String] {
        &self.parts[..self.parts.len().saturating_sub(1)]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Assignment {
        name: NameSyntax,
        value: Expr,
        /// `def x = ...`, `val x = ...`
        variable: bool,
    },
    Call {
        name: NameSyntax,
        args: Vec<Expr>,
        /// Text between the parentheses, or the run of command arguments
        inner: Span,
        parenthesized: bool,
    },
    Block {
        name: NameSyntax,
        /// `create("staging") { }` names its block `staging`
        label: Option<(String, Span)>,
        body: Vec<Statement>,
        open: usize,
        close: usize,
    },
    Unparsed,
}

/// Parse a whole document into statements
pub fn parse_document(text: &str) -> Result<Vec<Statement>, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = SyntaxParser { text, tokens, pos: 0 };
    parser.statements(None)
}

struct Args {
    items: Vec<Expr>,
    inner: Span,
}

struct SyntaxParser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl SyntaxParser<'_> {
    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn token(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.token().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// End offset of the last consumed token
    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), TokenKind::Newline) {
            self.bump();
        }
    }

    fn is_ident(&self, offset: usize, value: &str) -> bool {
        matches!(self.peek_at(offset), TokenKind::Ident(name) if name == value)
    }

    /// Parse statements until EOF, or until the `}` closing the block opened at `open`
    fn statements(&mut self, open: Option<usize>) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            while matches!(self.peek(), TokenKind::Newline | TokenKind::Semicolon) {
                self.bump();
            }
            match self.peek() {
                TokenKind::Eof => match open {
                    Some(offset) => return Err(ParseError::UnclosedBlock { offset }),
                    None => return Ok(statements),
                },
                TokenKind::RBrace => match open {
                    Some(_) => return Ok(statements),
                    None => return Err(ParseError::UnexpectedToken { offset: self.token().span.start, found: "}".into() }),
                },
                _ => statements.push(self.statement()?),
            }
        }
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let start_pos = self.pos;
        let start = self.token().span.start;
        if let Some(kind) = self.try_statement()? {
            return Ok(Statement { kind, span: start..self.prev_end() });
        }
        self.pos = start_pos;
        self.skip_unparsed()?;
        Ok(Statement { kind: StatementKind::Unparsed, span: start..self.prev_end() })
    }

    /// Consume one statement the model does not understand, honoring nesting
    fn skip_unparsed(&mut self) -> Result<(), ParseError> {
        let mut stack: Vec<(TokenKind, usize)> = Vec::new();
        loop {
            let token = self.token().clone();
            match &token.kind {
                TokenKind::Eof => {
                    return match stack.last() {
                        Some((_, offset)) => Err(ParseError::UnclosedDelimiter { offset: *offset }),
                        None => Ok(()),
                    };
                }
                TokenKind::Newline | TokenKind::Semicolon if stack.is_empty() => return Ok(()),
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket if stack.is_empty() => {
                    if token.kind == TokenKind::RBrace {
                        return Ok(());
                    }
                    return Err(ParseError::UnexpectedToken { offset: token.span.start, found: closing_text(&token.kind).into() });
                }
                TokenKind::LBrace => stack.push((TokenKind::RBrace, token.span.start)),
                TokenKind::LParen => stack.push((TokenKind::RParen, token.span.start)),
                TokenKind::LBracket => stack.push((TokenKind::RBracket, token.span.start)),
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    match stack.pop() {
                        Some((expected, _)) if expected == token.kind => {}
                        _ => {
                            return Err(ParseError::UnexpectedToken {
                                offset: token.span.start,
                                found: closing_text(&token.kind).into(),
                            })
                        }
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    fn try_statement(&mut self) -> Result<Option<StatementKind>, ParseError> {
        // `def x = 1`, `val x = 1`, `var x: Int = 1`
        if (self.is_ident(0, "def") || self.is_ident(0, "val") || self.is_ident(0, "var"))
            && matches!(self.peek_at(1), TokenKind::Ident(_))
        {
            self.bump();
            let Some(name) = self.dotted_name() else { return Ok(None) };
            if matches!(self.peek(), TokenKind::Colon) {
                while !matches!(self.peek(), TokenKind::Assign) && !self.at_statement_end() {
                    self.bump();
                }
            }
            if !matches!(self.peek(), TokenKind::Assign) {
                return Ok(None);
            }
            self.bump();
            let Some(value) = self.expression()? else { return Ok(None) };
            if !self.at_statement_end() {
                return Ok(None);
            }
            return Ok(Some(StatementKind::Assignment { name, value, variable: true }));
        }

        if !matches!(self.peek(), TokenKind::Ident(_)) {
            return Ok(None);
        }
        let Some(name) = self.dotted_name() else { return Ok(None) };

        match self.peek() {
            TokenKind::Assign => {
                self.bump();
                let Some(value) = self.expression()? else { return Ok(None) };
                if !self.at_statement_end() {
                    return Ok(None);
                }
                Ok(Some(StatementKind::Assignment { name, value, variable: false }))
            }
            TokenKind::LBrace => {
                let (body, open, close) = self.block_body()?;
                Ok(Some(StatementKind::Block { name, label: None, body, open, close }))
            }
            TokenKind::LParen => {
                let Some(args) = self.paren_args()? else { return Ok(None) };
                if matches!(self.peek(), TokenKind::LBrace) {
                    let label = match args.items.as_slice() {
                        [Expr { kind: ExprKind::String(label), span }]
                            if name.parts.len() == 1 && NAMED_CHILD_CALLS.contains(&name.last()) =>
                        {
                            (label.clone(), span.clone())
                        }
                        _ => return Ok(None),
                    };
                    let (body, open, close) = self.block_body()?;
                    return Ok(Some(StatementKind::Block { name, label: Some(label), body, open, close }));
                }
                if !self.at_statement_end() {
                    return Ok(None);
                }
                Ok(Some(StatementKind::Call { name, args: args.items, inner: args.inner, parenthesized: true }))
            }
            _ if self.at_statement_end() => {
                let end = name.span.end;
                Ok(Some(StatementKind::Call { name, args: Vec::new(), inner: end..end, parenthesized: false }))
            }
            _ if self.starts_expression() => {
                let Some(args) = self.command_args()? else { return Ok(None) };
                if !self.at_statement_end() {
                    return Ok(None);
                }
                Ok(Some(StatementKind::Call { name, args: args.items, inner: args.inner, parenthesized: false }))
            }
            _ => Ok(None),
        }
    }

    fn block_body(&mut self) -> Result<(Vec<Statement>, usize, usize), ParseError> {
        let open = self.bump().span.start;
        let body = self.statements(Some(open))?;
        let close = self.bump().span.start;
        Ok((body, open, close))
    }

    /// `a.b.c` or `extra["name"]`
    fn dotted_name(&mut self) -> Option<NameSyntax> {
        let first = self.token().clone();
        let TokenKind::Ident(ident) = &first.kind else { return None };
        let mut parts = vec![ident.clone()];
        let mut last_span = first.span.clone();
        self.bump();
        loop {
            match (self.peek(), self.peek_at(1), self.peek_at(2)) {
                (TokenKind::Dot, TokenKind::Ident(part), _) => {
                    parts.push(part.clone());
                    self.bump();
                    last_span = self.bump().span;
                }
                (TokenKind::LBracket, TokenKind::Str { value, interpolated: false }, TokenKind::RBracket) => {
                    parts.push(value.clone());
                    self.bump();
                    last_span = self.bump().span;
                    self.bump();
                }
                _ => break,
            }
        }
        Some(NameSyntax { parts, span: first.span.start..self.prev_end(), last_span })
    }

    fn starts_expression(&self) -> bool {
        match self.peek() {
            TokenKind::Str { .. } | TokenKind::Number(_) | TokenKind::Ident(_) | TokenKind::LBracket => true,
            TokenKind::Operator(op) => op == "-" && matches!(self.peek_at(1), TokenKind::Number(_)),
            _ => false,
        }
    }

    /// Groovy command arguments: `name a, b` or `name key: value`
    fn command_args(&mut self) -> Result<Option<Args>, ParseError> {
        let start = self.token().span.start;
        let Some(items) = self.argument_list(None)? else { return Ok(None) };
        Ok(Some(Args { items, inner: start..self.prev_end() }))
    }

    /// Arguments between parentheses; the `(` is the current token
    fn paren_args(&mut self) -> Result<Option<Args>, ParseError> {
        let open = self.bump();
        self.skip_newlines();
        if matches!(self.peek(), TokenKind::RParen) {
            let close = self.bump();
            return Ok(Some(Args { items: Vec::new(), inner: open.span.end..close.span.start }));
        }
        let Some(items) = self.argument_list(Some(TokenKind::RParen))? else { return Ok(None) };
        self.skip_newlines();
        if !matches!(self.peek(), TokenKind::RParen) {
            return Ok(None);
        }
        let close = self.bump();
        Ok(Some(Args { items, inner: open.span.end..close.span.start }))
    }

    /// Comma separated arguments; named arguments are gathered into one map
    fn argument_list(&mut self, closer: Option<TokenKind>) -> Result<Option<Vec<Expr>>, ParseError> {
        let nested = closer.is_some();
        let mut items = Vec::new();
        let mut named: Vec<MapEntry> = Vec::new();
        loop {
            if nested {
                self.skip_newlines();
            }
            let is_named = matches!(self.peek(), TokenKind::Ident(_) | TokenKind::Str { interpolated: false, .. })
                && (matches!(self.peek_at(1), TokenKind::Colon)
                    || (nested && matches!(self.peek_at(1), TokenKind::Assign)));
            if is_named {
                let Some(entry) = self.map_entry()? else { return Ok(None) };
                named.push(entry);
            } else {
                let Some(expr) = self.expression()? else { return Ok(None) };
                items.push(expr);
            }
            if nested {
                self.skip_newlines();
            }
            if !matches!(self.peek(), TokenKind::Comma) {
                break;
            }
            self.bump();
            // A trailing comma before the closer, or a continuation line in command syntax
            self.skip_newlines();
            if closer.as_ref().is_some_and(|c| c == self.peek()) {
                break;
            }
        }
        if !named.is_empty() {
            let span = named[0].span.start..named[named.len() - 1].span.end;
            let map = Expr { kind: ExprKind::Map { entries: named, inner: span.clone() }, span };
            items.insert(0, map);
        }
        Ok(Some(items))
    }

    /// `key: value`, `"key": value`, or Kotlin named argument `key = value`
    fn map_entry(&mut self) -> Result<Option<MapEntry>, ParseError> {
        let key_token = self.bump();
        let key = match &key_token.kind {
            TokenKind::Ident(key) => key.clone(),
            TokenKind::Str { value, .. } => value.clone(),
            _ => return Ok(None),
        };
        self.bump();
        self.skip_newlines();
        let Some(value) = self.expression()? else { return Ok(None) };
        let span = key_token.span.start..value.span.end;
        Ok(Some(MapEntry { key, key_span: key_token.span, value, span }))
    }

    fn expression(&mut self) -> Result<Option<Expr>, ParseError> {
        let start = self.token().span.start;
        let Some(mut expr) = self.primary()? else { return Ok(None) };
        if self.continues_expression() {
            self.skip_expression_tail()?;
            expr = Expr { kind: ExprKind::Unknown, span: start..self.prev_end() };
        }
        Ok(Some(expr))
    }

    fn continues_expression(&self) -> bool {
        match self.peek() {
            TokenKind::Operator(_) | TokenKind::Dot => true,
            TokenKind::Ident(word) => matches!(word.as_str(), "as" | "in" | "is" | "instanceof" | "until" | "downTo"),
            _ => false,
        }
    }

    /// Consume operators and operands up to the end of the enclosing argument
    fn skip_expression_tail(&mut self) -> Result<(), ParseError> {
        let mut stack: Vec<(TokenKind, usize)> = Vec::new();
        loop {
            let token = self.token().clone();
            match &token.kind {
                TokenKind::Eof => {
                    return match stack.last() {
                        Some((_, offset)) => Err(ParseError::UnclosedDelimiter { offset: *offset }),
                        None => Ok(()),
                    };
                }
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Comma | TokenKind::Colon if stack.is_empty() => {
                    // Ternaries keep going past the colon
                    if token.kind != TokenKind::Colon || !self.tail_has_ternary() {
                        return Ok(());
                    }
                }
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket if stack.is_empty() => return Ok(()),
                TokenKind::LBrace => stack.push((TokenKind::RBrace, token.span.start)),
                TokenKind::LParen => stack.push((TokenKind::RParen, token.span.start)),
                TokenKind::LBracket => stack.push((TokenKind::RBracket, token.span.start)),
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => match stack.pop() {
                    Some((expected, _)) if expected == token.kind => {}
                    _ => {
                        return Err(ParseError::UnexpectedToken {
                            offset: token.span.start,
                            found: closing_text(&token.kind).into(),
                        })
                    }
                },
                TokenKind::Newline => {}
                _ => {}
            }
            self.bump();
        }
    }

    fn tail_has_ternary(&self) -> bool {
        self.tokens[..self.pos]
            .iter()
            .rev()
            .take_while(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Comma | TokenKind::Semicolon))
            .any(|t| t.kind == TokenKind::Operator("?".into()))
    }

    fn primary(&mut self) -> Result<Option<Expr>, ParseError> {
        let token = self.token().clone();
        let span = token.span.clone();
        let kind = match &token.kind {
            TokenKind::Str { value, interpolated } => {
                self.bump();
                if *interpolated {
                    ExprKind::Interpolated(value.clone())
                } else {
                    ExprKind::String(value.clone())
                }
            }
            TokenKind::Number(text) => {
                self.bump();
                number_kind(text, false)
            }
            TokenKind::Operator(op) if op == "-" => {
                let TokenKind::Number(text) = self.peek_at(1).clone() else { return Ok(None) };
                self.bump();
                let number = self.bump();
                return Ok(Some(Expr { kind: number_kind(&text, true), span: span.start..number.span.end }));
            }
            TokenKind::LBracket => return self.bracket_literal().map(Some),
            TokenKind::LParen | TokenKind::LBrace => {
                self.skip_balanced()?;
                return Ok(Some(Expr { kind: ExprKind::Unknown, span: span.start..self.prev_end() }));
            }
            TokenKind::Ident(word) => match word.as_str() {
                "true" | "false" => {
                    self.bump();
                    ExprKind::Boolean(word == "true")
                }
                "null" => {
                    self.bump();
                    ExprKind::Null
                }
                _ if matches!(self.peek_at(1), TokenKind::LParen) && LIST_FACTORIES.contains(&word.as_str()) => {
                    self.bump();
                    let Some(args) = self.paren_args()? else { return Ok(None) };
                    return Ok(Some(Expr {
                        kind: ExprKind::List { items: args.items, inner: args.inner },
                        span: span.start..self.prev_end(),
                    }));
                }
                _ if matches!(self.peek_at(1), TokenKind::LParen) && MAP_FACTORIES.contains(&word.as_str()) => {
                    self.bump();
                    return self.kotlin_map(span.start);
                }
                _ => return self.path(),
            },
            _ => return Ok(None),
        };
        Ok(Some(Expr { kind, span }))
    }

    /// Identifier path with member access, indexing and calls
    fn path(&mut self) -> Result<Option<Expr>, ParseError> {
        let start = self.token().span.start;
        self.bump();
        let mut call: Option<(String, Vec<Expr>)> = None;
        let mut opaque = false;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (TokenKind::Dot, TokenKind::Ident(_)) => {
                    if call.is_some() {
                        opaque = true;
                    }
                    self.bump();
                    self.bump();
                }
                (TokenKind::LBracket, _) => {
                    if call.is_some() {
                        opaque = true;
                    }
                    let open = self.bump();
                    self.skip_newlines();
                    if self.expression()?.is_none() {
                        return Ok(None);
                    }
                    if !matches!(self.peek(), TokenKind::RBracket) {
                        return Err(ParseError::UnclosedDelimiter { offset: open.span.start });
                    }
                    self.bump();
                }
                (TokenKind::LParen, _) => {
                    let name_end = self.prev_end();
                    let Some(args) = self.paren_args()? else { return Ok(None) };
                    if call.is_some() {
                        opaque = true;
                    }
                    call = Some((self.text[start..name_end].to_string(), args.items));
                }
                _ => break,
            }
        }
        let span = start..self.prev_end();
        let kind = match call {
            _ if opaque => ExprKind::Unknown,
            Some((name, args)) => ExprKind::Call { name, args },
            None => ExprKind::Reference,
        };
        Ok(Some(Expr { kind, span }))
    }

    /// `[a, b]`, `[k: v]` or `[:]`
    fn bracket_literal(&mut self) -> Result<Expr, ParseError> {
        let open = self.bump();
        self.skip_newlines();
        if matches!(self.peek(), TokenKind::Colon) && matches!(self.peek_at(1), TokenKind::RBracket) {
            self.bump();
            let close = self.bump();
            return Ok(Expr {
                kind: ExprKind::Map { entries: Vec::new(), inner: open.span.end..close.span.start },
                span: open.span.start..close.span.end,
            });
        }
        let is_map = matches!(self.peek(), TokenKind::Ident(_) | TokenKind::Str { interpolated: false, .. })
            && matches!(self.peek_at(1), TokenKind::Colon);

        let mut items = Vec::new();
        let mut entries = Vec::new();
        while !matches!(self.peek(), TokenKind::RBracket) {
            if is_map {
                match self.map_entry()? {
                    Some(entry) => entries.push(entry),
                    None => return self.opaque_bracket(open.span.start),
                }
            } else {
                match self.expression()? {
                    Some(item) => items.push(item),
                    None => return self.opaque_bracket(open.span.start),
                }
            }
            self.skip_newlines();
            match self.peek() {
                TokenKind::Comma => {
                    self.bump();
                    self.skip_newlines();
                }
                TokenKind::RBracket => {}
                TokenKind::Eof => return Err(ParseError::UnclosedDelimiter { offset: open.span.start }),
                _ => return self.opaque_bracket(open.span.start),
            }
        }
        let close = self.bump();
        let inner = open.span.end..close.span.start;
        let kind = if is_map { ExprKind::Map { entries, inner } } else { ExprKind::List { items, inner } };
        Ok(Expr { kind, span: open.span.start..close.span.end })
    }

    /// Give up on a bracket literal and swallow it as an opaque expression
    fn opaque_bracket(&mut self, start: usize) -> Result<Expr, ParseError> {
        let mut depth = 1usize;
        loop {
            let token = self.bump();
            match token.kind {
                TokenKind::LBracket => depth += 1,
                TokenKind::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Expr { kind: ExprKind::Unknown, span: start..token.span.end });
                    }
                }
                TokenKind::Eof => return Err(ParseError::UnclosedDelimiter { offset: start }),
                _ => {}
            }
        }
    }

    /// `mapOf("k" to v, ...)`; positioned on the `(`
    fn kotlin_map(&mut self, start: usize) -> Result<Option<Expr>, ParseError> {
        let open = self.bump();
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::RParen) {
                break;
            }
            let key_token = self.token().clone();
            let TokenKind::Str { value: key, interpolated: false } = &key_token.kind else { return Ok(None) };
            let key = key.clone();
            self.bump();
            if !self.is_ident(0, "to") {
                return Ok(None);
            }
            self.bump();
            let Some(value) = self.expression()? else { return Ok(None) };
            let span = key_token.span.start..value.span.end;
            entries.push(MapEntry { key, key_span: key_token.span, value, span });
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        self.skip_newlines();
        if !matches!(self.peek(), TokenKind::RParen) {
            return Ok(None);
        }
        let close = self.bump();
        Ok(Some(Expr {
            kind: ExprKind::Map { entries, inner: open.span.end..close.span.start },
            span: start..close.span.end,
        }))
    }

    /// Skip a `( ... )` or `{ ... }` group
    fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let open = self.bump();
        let mut stack = vec![match open.kind {
            TokenKind::LParen => TokenKind::RParen,
            _ => TokenKind::RBrace,
        }];
        while let Some(expected) = stack.last().cloned() {
            let token = self.bump();
            match token.kind {
                TokenKind::LParen => stack.push(TokenKind::RParen),
                TokenKind::LBrace => stack.push(TokenKind::RBrace),
                TokenKind::LBracket => stack.push(TokenKind::RBracket),
                TokenKind::Eof => return Err(ParseError::UnclosedDelimiter { offset: open.span.start }),
                ref kind if *kind == expected => {
                    stack.pop();
                }
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    return Err(ParseError::UnexpectedToken {
                        offset: token.span.start,
                        found: closing_text(&token.kind).into(),
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn number_kind(text: &str, negative: bool) -> ExprKind {
    let digits: String = text
        .trim_end_matches(['L', 'l', 'f', 'F', 'd', 'D', 'G', 'g'])
        .chars()
        .filter(|c| *c != '_')
        .collect();
    let signed = if negative { format!("-{}", digits) } else { digits.clone() };
    let is_decimal = digits.contains('.') || digits.contains(['e', 'E']) || text.ends_with(['f', 'F', 'd', 'D']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return match i64::from_str_radix(hex, 16) {
            Ok(value) => ExprKind::Integer(if negative { -value } else { value }),
            Err(_) => ExprKind::Unknown,
        };
    }
    if is_decimal {
        signed.parse().map(ExprKind::Decimal).unwrap_or(ExprKind::Unknown)
    } else {
        signed.parse().map(ExprKind::Integer).unwrap_or(ExprKind::Unknown)
    }
}

fn closing_text(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::RBrace => "}",
        TokenKind::RParen => ")",
        _ => "]",
    }
}
