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

//! Pratt parser for Stellar expressions
//!
//! Binary operators are handled by precedence climbing. The conditional
//! forms sit above the binary levels: a ternary binds looser than `or`
//! and is right associative, and a prefix `if ... then ... else` takes a
//! full conditional expression in every position.

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use super::tokenizer::{Token, Tokenizer};
use crate::ast::{ArithmeticOp, ComparisonOp, LogicalOp, NodeKind, SyntaxNode};

/// Binary operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// `or`, `OR`, `||`
    Or = 1,
    /// `and`, `AND`, `&&`
    And = 2,
    /// `in`, `not in` (non associative)
    Membership = 3,
    /// `==`, `!=`
    Equality = 4,
    /// `<`, `<=`, `>`, `>=`
    Relational = 5,
    /// `+`, `-`
    Additive = 6,
    /// `*`, `/`
    Multiplicative = 7,
}

impl Precedence {
    /// The next tighter level, used for the right operand of left
    /// associative operators
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Membership,
            Precedence::Membership => Precedence::Equality,
            Precedence::Equality => Precedence::Relational,
            Precedence::Relational => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Multiplicative,
        }
    }
}

/// A binary operator recognised at the current position
struct BinaryOperator {
    kind: NodeKind,
    precedence: Precedence,
    /// Tokens spanned by the operator (`not in` takes two)
    width: usize,
}

/// Parser over a pre-tokenized expression
pub struct PrattParser<'input> {
    input: &'input str,
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
}

impl<'input> PrattParser<'input> {
    /// Tokenize the input and prepare a parser over it
    pub fn new(input: &'input str) -> ParseResult<Self> {
        let tokens = Tokenizer::new(input).tokenize_all()?;
        Ok(Self {
            input,
            tokens,
            pos: 0,
        })
    }

    fn current(&self) -> Option<&Token<'input>> {
        self.tokens.get(self.pos).map(|spanned| &spanned.value)
    }

    fn peek(&self, offset: usize) -> Option<&Token<'input>> {
        self.tokens.get(self.pos + offset).map(|spanned| &spanned.value)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.input.len(), |spanned| spanned.start)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(spanned) => ParseError::UnexpectedToken {
                token: spanned.value.to_string(),
                position: spanned.start,
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }

    fn expect(&mut self, expected: Token<'static>) -> ParseResult<()> {
        match self.current() {
            Some(token) if std::mem::discriminant(token) == std::mem::discriminant(&expected) => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected(&format!("'{expected}'"))),
        }
    }

    /// Parse the complete input as a single expression
    pub fn parse(&mut self) -> ParseResult<SyntaxNode> {
        if self.tokens.is_empty() {
            return Err(ParseError::UnexpectedEof {
                expected: "an expression".to_string(),
            });
        }
        let node = self.parse_conditional()?;
        if self.pos < self.tokens.len() {
            return Err(self.unexpected("end of input"));
        }
        Ok(node)
    }

    /// Conditional level: `if c then a else b`, `c ? a : b`, or a binary expression
    fn parse_conditional(&mut self) -> ParseResult<SyntaxNode> {
        let position = self.position();
        if matches!(self.current(), Some(Token::If)) {
            self.advance();
            let condition = self.parse_conditional()?;
            self.expect(Token::Then)?;
            let then = self.parse_conditional()?;
            self.expect(Token::Else)?;
            let otherwise = self.parse_conditional()?;
            return Ok(SyntaxNode::with_children(
                NodeKind::Conditional,
                vec![condition, then, otherwise],
                position,
            ));
        }

        let condition = self.parse_binary(Precedence::Or)?;
        if !matches!(self.current(), Some(Token::Question)) {
            return Ok(condition);
        }
        self.advance();
        let then = self.parse_conditional()?;
        self.expect(Token::Colon)?;
        let otherwise = self.parse_conditional()?;
        Ok(SyntaxNode::with_children(
            NodeKind::Conditional,
            vec![condition, then, otherwise],
            position,
        ))
    }

    fn binary_operator(&self) -> Option<BinaryOperator> {
        let (kind, precedence, width) = match self.current()? {
            Token::Or => (NodeKind::Logical(LogicalOp::Or), Precedence::Or, 1),
            Token::And => (NodeKind::Logical(LogicalOp::And), Precedence::And, 1),
            Token::Equal => (
                NodeKind::Comparison(ComparisonOp::Equal),
                Precedence::Equality,
                1,
            ),
            Token::NotEqual => (
                NodeKind::Comparison(ComparisonOp::NotEqual),
                Precedence::Equality,
                1,
            ),
            Token::In => (
                NodeKind::Membership { negated: false },
                Precedence::Membership,
                1,
            ),
            Token::Not if matches!(self.peek(1), Some(Token::In)) => (
                NodeKind::Membership { negated: true },
                Precedence::Membership,
                2,
            ),
            Token::LessThan => (
                NodeKind::Comparison(ComparisonOp::LessThan),
                Precedence::Relational,
                1,
            ),
            Token::LessThanOrEqual => (
                NodeKind::Comparison(ComparisonOp::LessThanOrEqual),
                Precedence::Relational,
                1,
            ),
            Token::GreaterThan => (
                NodeKind::Comparison(ComparisonOp::GreaterThan),
                Precedence::Relational,
                1,
            ),
            Token::GreaterThanOrEqual => (
                NodeKind::Comparison(ComparisonOp::GreaterThanOrEqual),
                Precedence::Relational,
                1,
            ),
            Token::Plus => (
                NodeKind::Arithmetic(ArithmeticOp::Add),
                Precedence::Additive,
                1,
            ),
            Token::Minus => (
                NodeKind::Arithmetic(ArithmeticOp::Subtract),
                Precedence::Additive,
                1,
            ),
            Token::Multiply => (
                NodeKind::Arithmetic(ArithmeticOp::Multiply),
                Precedence::Multiplicative,
                1,
            ),
            Token::Divide => (
                NodeKind::Arithmetic(ArithmeticOp::Divide),
                Precedence::Multiplicative,
                1,
            ),
            _ => return None,
        };
        Some(BinaryOperator {
            kind,
            precedence,
            width,
        })
    }

    /// Precedence climbing over the binary operator levels
    fn parse_binary(&mut self, min_precedence: Precedence) -> ParseResult<SyntaxNode> {
        let mut left = self.parse_unary()?;

        while let Some(operator) = self.binary_operator() {
            if operator.precedence < min_precedence {
                break;
            }
            self.pos += operator.width;
            let right = self.parse_binary(operator.precedence.next_level())?;
            left = SyntaxNode::binary(operator.kind, left, right);

            if operator.precedence == Precedence::Membership
                && self
                    .binary_operator()
                    .is_some_and(|next| next.precedence == Precedence::Membership)
            {
                return Err(self.unexpected("end of membership test"));
            }
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<SyntaxNode> {
        if matches!(self.current(), Some(Token::Not)) {
            let position = self.position();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(SyntaxNode::with_children(
                NodeKind::Not,
                vec![operand],
                position,
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<SyntaxNode> {
        let position = self.position();
        let Some(token) = self.current().cloned() else {
            return Err(self.unexpected("an operand"));
        };

        match token {
            Token::Number { text, kind } => {
                self.advance();
                Ok(SyntaxNode::leaf(
                    NodeKind::Number {
                        text: text.to_string(),
                        kind,
                    },
                    position,
                ))
            }
            Token::Minus => match self.peek(1) {
                Some(Token::Number { text, kind }) => {
                    let node = NodeKind::Number {
                        text: format!("-{text}"),
                        kind: *kind,
                    };
                    self.pos += 2;
                    Ok(SyntaxNode::leaf(node, position))
                }
                _ => Err(self.unexpected("an operand")),
            },
            Token::String { body, quote } => {
                self.advance();
                Ok(SyntaxNode::leaf(
                    NodeKind::String {
                        raw: body.to_string(),
                        quote,
                    },
                    position,
                ))
            }
            Token::True | Token::False => {
                self.advance();
                Ok(SyntaxNode::leaf(
                    NodeKind::Boolean(token == Token::True),
                    position,
                ))
            }
            Token::Null => {
                self.advance();
                Ok(SyntaxNode::leaf(NodeKind::Null, position))
            }
            Token::Identifier(name) => {
                self.advance();
                if matches!(self.current(), Some(Token::LeftParen)) {
                    self.advance();
                    let arguments = self.parse_sequence(Token::RightParen)?;
                    return Ok(SyntaxNode::with_children(
                        NodeKind::FunctionCall(name.to_string()),
                        arguments,
                        position,
                    ));
                }
                Ok(SyntaxNode::leaf(
                    NodeKind::Identifier(name.to_string()),
                    position,
                ))
            }
            Token::Exists => {
                self.advance();
                self.expect(Token::LeftParen)?;
                let name = match self.current() {
                    Some(Token::Identifier(name)) => name.to_string(),
                    _ => return Err(self.unexpected("a variable name")),
                };
                self.advance();
                self.expect(Token::RightParen)?;
                Ok(SyntaxNode::leaf(NodeKind::Exists(name), position))
            }
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_conditional()?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Token::LeftBracket => {
                self.advance();
                let elements = self.parse_sequence(Token::RightBracket)?;
                Ok(SyntaxNode::with_children(NodeKind::List, elements, position))
            }
            Token::LeftBrace => {
                self.advance();
                let entries = self.parse_map_entries()?;
                Ok(SyntaxNode::with_children(NodeKind::Map, entries, position))
            }
            // Reserved words in operand position reach the compiler as
            // identifiers and are rejected there.
            Token::In | Token::And | Token::Or | Token::Then | Token::Else => {
                self.advance();
                Ok(SyntaxNode::leaf(
                    NodeKind::Identifier(token.to_string()),
                    position,
                ))
            }
            _ => Err(self.unexpected("an operand")),
        }
    }

    /// Comma separated expressions up to `close`, which is consumed
    fn parse_sequence(&mut self, close: Token<'static>) -> ParseResult<Vec<SyntaxNode>> {
        let mut items = Vec::new();
        if self.current() == Some(&close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_conditional()?);
            match self.current() {
                Some(Token::Comma) => self.advance(),
                Some(token) if *token == close => {
                    self.advance();
                    return Ok(items);
                }
                _ => return Err(self.unexpected(&format!("',' or '{close}'"))),
            }
        }
    }

    /// `key : value` pairs up to the closing brace, flattened
    fn parse_map_entries(&mut self) -> ParseResult<Vec<SyntaxNode>> {
        let mut children = Vec::new();
        if matches!(self.current(), Some(Token::RightBrace)) {
            self.advance();
            return Ok(children);
        }
        loop {
            children.push(self.parse_conditional()?);
            self.expect(Token::Colon)?;
            children.push(self.parse_conditional()?);
            match self.current() {
                Some(Token::Comma) => self.advance(),
                Some(Token::RightBrace) => {
                    self.advance();
                    return Ok(children);
                }
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
    }
}

/// Parse an expression into a syntax tree
pub fn parse_expression(input: &str) -> ParseResult<SyntaxNode> {
    PrattParser::new(input)?.parse()
}
