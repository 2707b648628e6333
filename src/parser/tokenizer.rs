// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tokenizer for Stellar expressions
//!
//! Produces zero-copy tokens borrowing from the source text. Literal
//! bodies are kept as raw slices; numbers are converted by the compiler
//! and string escapes are resolved there as well.

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::LazyLock;
use unicode_xid::UnicodeXID;

/// Kind of a numeric literal, selected by its suffix and shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    /// Plain digits; falls back to a long when out of 32-bit range
    Integer,
    /// `l` / `L` suffix
    Long,
    /// `f` / `F` suffix
    Float,
    /// `d` / `D` suffix, a decimal point or an exponent
    Double,
}

impl NumberKind {
    /// Human readable name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            NumberKind::Integer => "integer",
            NumberKind::Long => "long",
            NumberKind::Float => "float",
            NumberKind::Double => "double",
        }
    }
}

/// Lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    // Literals
    /// Numeric literal including its suffix (e.g. `42`, `10L`, `1.5f`)
    Number {
        /// Literal text
        text: &'input str,
        /// Literal kind
        kind: NumberKind,
    },
    /// String literal body without the quotes, escapes unresolved
    String {
        /// Raw body
        body: &'input str,
        /// Delimiting quote character
        quote: char,
    },
    /// Identifier, possibly namespaced (`bar:variable`) or dotted (`ip.src`)
    Identifier(&'input str),

    // Keywords
    /// `true` / `TRUE`
    True,
    /// `false` / `FALSE`
    False,
    /// `null` / `NULL`
    Null,
    /// `and`, `AND` or `&&`
    And,
    /// `or`, `OR` or `||`
    Or,
    /// `not` / `NOT`
    Not,
    /// `in`
    In,
    /// `if` / `IF`
    If,
    /// `then` / `THEN`
    Then,
    /// `else` / `ELSE`
    Else,
    /// `exists` / `EXISTS`
    Exists,

    // Operators and punctuation
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
}

static KEYWORD_TABLE: LazyLock<FxHashMap<&'static str, Token<'static>>> = LazyLock::new(|| {
    let mut map = FxHashMap::default();
    for (words, token) in [
        (&["true", "TRUE"][..], Token::True),
        (&["false", "FALSE"][..], Token::False),
        (&["null", "NULL"][..], Token::Null),
        (&["and", "AND"][..], Token::And),
        (&["or", "OR"][..], Token::Or),
        (&["not", "NOT"][..], Token::Not),
        (&["in"][..], Token::In),
        (&["if", "IF"][..], Token::If),
        (&["then", "THEN"][..], Token::Then),
        (&["else", "ELSE"][..], Token::Else),
        (&["exists", "EXISTS"][..], Token::Exists),
    ] {
        for word in words {
            map.insert(*word, token.clone());
        }
    }
    map
});

impl<'input> Token<'input> {
    /// Look up a keyword token for a word
    pub fn from_keyword(word: &str) -> Option<Token<'static>> {
        KEYWORD_TABLE.get(word).cloned()
    }

    /// True when the word is reserved and cannot name a variable
    pub fn is_reserved_word(word: &str) -> bool {
        KEYWORD_TABLE.contains_key(word)
    }

    /// Get identifier text if this is an identifier token
    pub fn as_identifier(&self) -> Option<&'input str> {
        match self {
            Token::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Check whether this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::True
                | Token::False
                | Token::Null
                | Token::And
                | Token::Or
                | Token::Not
                | Token::In
                | Token::If
                | Token::Then
                | Token::Else
                | Token::Exists
        )
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number { text, .. } => f.write_str(text),
            Token::String { body, quote } => write!(f, "{quote}{body}{quote}"),
            Token::Identifier(name) => f.write_str(name),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Null => f.write_str("null"),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Not => f.write_str("not"),
            Token::In => f.write_str("in"),
            Token::If => f.write_str("if"),
            Token::Then => f.write_str("then"),
            Token::Else => f.write_str("else"),
            Token::Exists => f.write_str("exists"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Multiply => f.write_str("*"),
            Token::Divide => f.write_str("/"),
            Token::Equal => f.write_str("=="),
            Token::NotEqual => f.write_str("!="),
            Token::LessThan => f.write_str("<"),
            Token::LessThanOrEqual => f.write_str("<="),
            Token::GreaterThan => f.write_str(">"),
            Token::GreaterThanOrEqual => f.write_str(">="),
            Token::Question => f.write_str("?"),
            Token::Colon => f.write_str(":"),
            Token::Comma => f.write_str(","),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::LeftBracket => f.write_str("["),
            Token::RightBracket => f.write_str("]"),
            Token::LeftBrace => f.write_str("{"),
            Token::RightBrace => f.write_str("}"),
        }
    }
}

/// Tokenizer over a single source string
pub struct Tokenizer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer positioned at the start of the input
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.input.get(offset..).and_then(|rest| rest.chars().next())
    }

    fn is_id_start(ch: char) -> bool {
        ch == '_' || ch == '$' || ch.is_xid_start()
    }

    fn is_id_continue(ch: char) -> bool {
        ch == '_' || ch == '$' || ch == '.' || ch.is_xid_continue()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn parse_identifier(&mut self) -> &'input str {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if Self::is_id_continue(ch) {
                self.pos += ch.len_utf8();
            } else if ch == ':' && self.char_at(self.pos + 1).is_some_and(Self::is_id_start) {
                // namespace separator, e.g. `bar:variable`
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn consume_digits(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
    }

    fn digit_at(&self, offset: usize) -> bool {
        self.bytes.get(offset).is_some_and(u8::is_ascii_digit)
    }

    fn parse_number(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        self.consume_digits();

        let mut fractional = false;
        if self.bytes.get(self.pos) == Some(&b'.') && self.digit_at(self.pos + 1) {
            self.pos += 1;
            self.consume_digits();
            fractional = true;
        }
        if matches!(self.bytes.get(self.pos), Some(b'e' | b'E')) {
            let sign = matches!(self.bytes.get(self.pos + 1), Some(b'+' | b'-'));
            let digits_at = self.pos + 1 + usize::from(sign);
            if self.digit_at(digits_at) {
                self.pos = digits_at;
                self.consume_digits();
                fractional = true;
            }
        }

        let kind = match self.bytes.get(self.pos) {
            Some(b'l' | b'L') if !fractional => {
                self.pos += 1;
                NumberKind::Long
            }
            Some(b'f' | b'F') => {
                self.pos += 1;
                NumberKind::Float
            }
            Some(b'd' | b'D') => {
                self.pos += 1;
                NumberKind::Double
            }
            _ if fractional => NumberKind::Double,
            _ => NumberKind::Integer,
        };

        if let Some(ch) = self.peek_char() {
            if Self::is_id_continue(ch) {
                return Err(ParseError::InvalidNumber {
                    text: format!("{}{ch}", &self.input[start..self.pos]),
                    kind: kind.name(),
                });
            }
        }

        Ok(Token::Number {
            text: &self.input[start..self.pos],
            kind,
        })
    }

    fn parse_string_literal(&mut self, quote: u8) -> ParseResult<Token<'input>> {
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;

        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b if b == quote => {
                    let body = &self.input[start..self.pos];
                    self.pos += 1;
                    return Ok(Token::String {
                        body,
                        quote: quote as char,
                    });
                }
                _ => self.pos += 1,
            }
        }

        Err(ParseError::UnterminatedString { position: open })
    }

    fn single(&mut self, token: Token<'input>) -> Token<'input> {
        self.pos += 1;
        token
    }

    fn pair(
        &mut self,
        second: u8,
        double: Token<'input>,
        single: Option<Token<'input>>,
    ) -> ParseResult<Token<'input>> {
        let start = self.pos;
        if self.bytes.get(self.pos + 1) == Some(&second) {
            self.pos += 2;
            return Ok(double);
        }
        match single {
            Some(token) => Ok(self.single(token)),
            None => Err(ParseError::InvalidCharacter {
                ch: self.bytes[start] as char,
                position: start,
            }),
        }
    }

    /// Produce the next token, or `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Token<'input>>> {
        self.skip_whitespace();

        let Some(&byte) = self.bytes.get(self.pos) else {
            return Ok(None);
        };

        let token = match byte {
            b'(' => self.single(Token::LeftParen),
            b')' => self.single(Token::RightParen),
            b'[' => self.single(Token::LeftBracket),
            b']' => self.single(Token::RightBracket),
            b'{' => self.single(Token::LeftBrace),
            b'}' => self.single(Token::RightBrace),
            b',' => self.single(Token::Comma),
            b'?' => self.single(Token::Question),
            b':' => self.single(Token::Colon),
            b'+' => self.single(Token::Plus),
            b'-' => self.single(Token::Minus),
            b'*' => self.single(Token::Multiply),
            b'/' => self.single(Token::Divide),
            b'=' => self.pair(b'=', Token::Equal, None)?,
            b'!' => self.pair(b'=', Token::NotEqual, None)?,
            b'<' => self.pair(b'=', Token::LessThanOrEqual, Some(Token::LessThan))?,
            b'>' => self.pair(b'=', Token::GreaterThanOrEqual, Some(Token::GreaterThan))?,
            b'&' => self.pair(b'&', Token::And, None)?,
            b'|' => self.pair(b'|', Token::Or, None)?,
            b'\'' | b'"' => self.parse_string_literal(byte)?,
            b'0'..=b'9' => self.parse_number()?,
            _ => {
                let start = self.pos;
                let ch = self.peek_char().unwrap_or('\0');
                if !Self::is_id_start(ch) {
                    return Err(ParseError::InvalidCharacter { ch, position: start });
                }
                let word = self.parse_identifier();
                Token::from_keyword(word).unwrap_or(Token::Identifier(word))
            }
        };

        Ok(Some(token))
    }

    /// Tokenize the whole input, attaching source spans
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::with_capacity(self.input.len() / 3 + 1);
        loop {
            self.skip_whitespace();
            let start = self.pos;
            match self.next_token()? {
                Some(token) => tokens.push(Spanned::new(token, start, self.pos)),
                None => break,
            }
        }
        Ok(tokens)
    }
}

/// Tokenize a complete expression
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}
