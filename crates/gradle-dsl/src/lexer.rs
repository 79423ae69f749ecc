//! Build Script Lexer
//!
//! Splits Groovy, Kotlin and declarative build scripts into tokens that
//! carry byte spans into the original text. Whitespace and comments are
//! dropped; newlines are kept because they terminate statements.

use std::ops::Range;

use crate::parser::ParseError;

/// Byte range into the document text
pub type Span = Range<usize>;

/// Token kinds shared by all three dialects
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// String literal; `value` is unescaped unless `interpolated`, in which
    /// case it is the raw text between the quotes
    Str { value: String, interpolated: bool },
    Number(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    Assign,
    Semicolon,
    Newline,
    Operator(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// UTF-8 byte order mark some editors put at the start of a file
pub const BOM: char = '\u{FEFF}';

/// Tokenize a whole document
pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: if text.starts_with(BOM) { BOM.len_utf8() } else { 0 },
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let c = self.bytes[self.pos];
            match c {
                b' ' | b'\t' | b'\r' | 0x0c => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    // Consecutive blank lines collapse into one terminator
                    if !matches!(self.tokens.last(), Some(Token { kind: TokenKind::Newline, .. })) {
                        self.push(TokenKind::Newline, start);
                    }
                }
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                b'#' if start == 0 && self.peek_at(1) == Some(b'!') => self.skip_line_comment(),
                b'\'' | b'"' => self.lex_string(c)?,
                b'`' => self.lex_backtick_ident()?,
                b'0'..=b'9' => self.lex_number(),
                b'{' => self.single(TokenKind::LBrace),
                b'}' => self.single(TokenKind::RBrace),
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b'[' => self.single(TokenKind::LBracket),
                b']' => self.single(TokenKind::RBracket),
                b',' => self.single(TokenKind::Comma),
                b';' => self.single(TokenKind::Semicolon),
                b'.' if self.peek_at(1) == Some(b'.') => self.operator(2),
                b'.' => self.single(TokenKind::Dot),
                b':' if self.peek_at(1) == Some(b':') => self.operator(2),
                b':' => self.single(TokenKind::Colon),
                b'=' if matches!(self.peek_at(1), Some(b'=') | Some(b'~')) => self.operator(2),
                b'=' => self.single(TokenKind::Assign),
                _ if is_ident_start(c) => self.lex_ident(),
                _ if c.is_ascii() => {
                    let two = self.text.get(start..start + 2).unwrap_or("");
                    if matches!(two, "!=" | "<=" | ">=" | "&&" | "||" | "->" | "?:" | "?." | "+=" | "-=" | "*." | "<<") {
                        self.operator(2);
                    } else {
                        self.operator(1);
                    }
                }
                _ => {
                    // Non-ASCII outside strings: keep it as an opaque operator char
                    let width = self.text[start..].chars().next().map_or(1, char::len_utf8);
                    self.operator(width);
                }
            }
        }
        let end = self.bytes.len();
        self.tokens.push(Token { kind: TokenKind::Eof, span: end..end });
        Ok(self.tokens)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token { kind, span: start..self.pos });
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        self.push(kind, start);
    }

    fn operator(&mut self, width: usize) {
        let start = self.pos;
        self.pos += width;
        let op = self.text[start..self.pos].to_string();
        self.push(TokenKind::Operator(op), start);
    }

    fn skip_line_comment(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 2;
        while self.pos + 1 < self.bytes.len() {
            if self.bytes[self.pos] == b'*' && self.bytes[self.pos + 1] == b'/' {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(ParseError::UnterminatedComment { offset: start })
    }

    fn lex_ident(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_ident_part(self.bytes[self.pos]) {
            self.pos += 1;
        }
        let ident = self.text[start..self.pos].to_string();
        self.push(TokenKind::Ident(ident), start);
    }

    fn lex_backtick_ident(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'`' {
            if self.bytes[self.pos] == b'\n' {
                return Err(ParseError::UnterminatedString { offset: start });
            }
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(ParseError::UnterminatedString { offset: start });
        }
        self.pos += 1;
        let ident = self.text[start + 1..self.pos - 1].to_string();
        self.push(TokenKind::Ident(ident), start);
        Ok(())
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        if self.bytes[self.pos] == b'0' && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.pos += 2;
            while self.pos < self.bytes.len() && (self.bytes[self.pos].is_ascii_hexdigit() || self.bytes[self.pos] == b'_') {
                self.pos += 1;
            }
        } else {
            self.eat_digits();
            // A dot only continues the number when a digit follows, so `1.toString()` stays a call
            if self.peek_at(0) == Some(b'.') && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                self.pos += 1;
                self.eat_digits();
            }
            if matches!(self.peek_at(0), Some(b'e') | Some(b'E')) {
                let sign = usize::from(matches!(self.peek_at(1), Some(b'+') | Some(b'-')));
                if self.peek_at(1 + sign).is_some_and(|d| d.is_ascii_digit()) {
                    self.pos += 1 + sign;
                    self.eat_digits();
                }
            }
        }
        if matches!(self.peek_at(0), Some(b'L' | b'l' | b'f' | b'F' | b'd' | b'D' | b'G' | b'g')) {
            self.pos += 1;
        }
        let number = self.text[start..self.pos].to_string();
        self.push(TokenKind::Number(number), start);
    }

    fn eat_digits(&mut self) {
        while self.pos < self.bytes.len() && (self.bytes[self.pos].is_ascii_digit() || self.bytes[self.pos] == b'_') {
            self.pos += 1;
        }
    }

    fn lex_string(&mut self, quote: u8) -> Result<(), ParseError> {
        let start = self.pos;
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        let delimiter_len = if triple { 3 } else { 1 };
        self.pos += delimiter_len;
        let content_start = self.pos;

        let mut value = String::new();
        let mut interpolated = false;
        loop {
            let Some(&c) = self.bytes.get(self.pos) else {
                return Err(ParseError::UnterminatedString { offset: start });
            };
            if c == quote && (!triple || (self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote))) {
                break;
            }
            match c {
                b'\n' if !triple => return Err(ParseError::UnterminatedString { offset: start }),
                b'\\' => {
                    let escaped = self.peek_at(1).ok_or(ParseError::UnterminatedString { offset: start })?;
                    value.push(match escaped {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        b'b' => '\u{8}',
                        b'f' => '\u{c}',
                        b'0' => '\0',
                        _ => {
                            // Keep multi-byte characters intact
                            let ch = self.text[self.pos + 1..].chars().next().unwrap_or('\\');
                            self.pos += ch.len_utf8() - 1;
                            ch
                        }
                    });
                    self.pos += 2;
                }
                b'$' if quote == b'"' => {
                    let next = self.peek_at(1);
                    if next == Some(b'{') {
                        interpolated = true;
                        self.skip_injection(start)?;
                    } else if next.is_some_and(is_ident_start) {
                        interpolated = true;
                        self.pos += 1;
                    } else {
                        value.push('$');
                        self.pos += 1;
                    }
                }
                _ => {
                    let ch = self.text[self.pos..].chars().next().unwrap_or('\u{fffd}');
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        let content_end = self.pos;
        self.pos += delimiter_len;

        let value = if interpolated {
            self.text[content_start..content_end].to_string()
        } else {
            value
        };
        self.push(TokenKind::Str { value, interpolated }, start);
        Ok(())
    }

    fn skip_injection(&mut self, string_start: usize) -> Result<(), ParseError> {
        // Positioned on `$`; skip to the brace that closes `${`
        self.pos += 2;
        let mut depth = 1usize;
        while let Some(&c) = self.bytes.get(self.pos) {
            match c {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                b'\n' => break,
                _ => {}
            }
            self.pos += 1;
        }
        Err(ParseError::UnterminatedString { offset: string_start })
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_ident_part(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}
