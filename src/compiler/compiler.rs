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

//! Parse tree to operation list compiler
//!
//! The compiler is a [`ParseTreeListener`]. Every node leaves one operation
//! fragment on a build stack when it exits; a parent pops its children's
//! fragments (it knows how many from the tree) and combines them.

use super::expression::Expression;
use super::operation::Operation;
use crate::ast::{NodeKind, ParseTreeListener, SyntaxNode, walk};
use crate::error::{Result, StellarError};
use crate::evaluator::NumberLiteralEvaluator;
use crate::model::Token;
use crate::parser::{self, ParseError, Token as LexToken};

/// Builds the operation list for one expression
#[derive(Debug, Default)]
pub struct Compiler {
    fragments: Vec<Vec<Operation>>,
}

impl Compiler {
    /// Create a compiler with an empty build stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and compile source text
    pub fn compile(source: &str) -> Result<Expression> {
        log::debug!("Compiling expression: {source}");
        let tree = parser::parse(source)?;
        let operations = Self::compile_tree(&tree)?;
        Ok(Expression::new(source, operations))
    }

    /// Compile an already parsed tree
    pub fn compile_tree(tree: &SyntaxNode) -> Result<Vec<Operation>> {
        let mut compiler = Self::new();
        walk(tree, &mut compiler)?;
        compiler.finish()
    }

    /// Take the finished operation list
    pub fn finish(mut self) -> Result<Vec<Operation>> {
        match (self.fragments.pop(), self.fragments.is_empty()) {
            (Some(operations), true) => Ok(operations),
            _ => Err(StellarError::Internal(format!(
                "compiler finished with {} fragments on the build stack",
                self.fragments.len() + 1
            ))),
        }
    }

    fn pop(&mut self) -> Result<Vec<Operation>> {
        self.fragments
            .pop()
            .ok_or_else(|| StellarError::Internal("build stack underflow".to_string()))
    }

    /// Pop `count` fragments and concatenate them in source order
    fn pop_concat(&mut self, count: usize) -> Result<Vec<Operation>> {
        let start = self
            .fragments
            .len()
            .checked_sub(count)
            .ok_or_else(|| StellarError::Internal("build stack underflow".to_string()))?;
        Ok(self.fragments.drain(start..).flatten().collect())
    }

    fn emit(&mut self, operations: Vec<Operation>) {
        self.fragments.push(operations);
    }

    fn operands_then(&mut self, count: usize, operation: Operation) -> Result<()> {
        let mut operations = self.pop_concat(count)?;
        operations.push(operation);
        self.emit(operations);
        Ok(())
    }
}

impl ParseTreeListener for Compiler {
    type Error = StellarError;

    fn exit(&mut self, node: &SyntaxNode) -> Result<()> {
        match &node.kind {
            NodeKind::Number { text, kind } => {
                let token = NumberLiteralEvaluator::evaluate(text, *kind)?;
                self.emit(vec![Operation::Push(token)]);
            }
            NodeKind::String { raw, .. } => {
                self.emit(vec![Operation::Push(Token::from(unescape(raw)))]);
            }
            NodeKind::Boolean(value) => self.emit(vec![Operation::Push(Token::boolean(*value))]),
            NodeKind::Null => self.emit(vec![Operation::Push(Token::null())]),
            NodeKind::Identifier(name) => {
                if LexToken::is_reserved_word(name) {
                    return Err(ParseError::ReservedWord { word: name.clone() }.into());
                }
                self.emit(vec![Operation::Variable(name.clone())]);
            }
            NodeKind::Exists(name) => self.emit(vec![Operation::Exists(name.clone())]),
            NodeKind::Arithmetic(op) => self.operands_then(2, Operation::Arithmetic(*op))?,
            NodeKind::Comparison(op) => self.operands_then(2, Operation::Comparison(*op))?,
            NodeKind::Membership { negated } => self.operands_then(
                2,
                Operation::Membership {
                    negated: *negated,
                },
            )?,
            NodeKind::Not => self.operands_then(1, Operation::Not)?,
            NodeKind::Logical(op) => {
                let right = self.pop()?;
                let left = self.pop()?;
                self.emit(vec![Operation::Logical {
                    op: *op,
                    left,
                    right,
                }]);
            }
            NodeKind::Conditional => {
                let otherwise = self.pop()?;
                let then = self.pop()?;
                let condition = self.pop()?;
                self.emit(vec![Operation::Branch {
                    condition,
                    then,
                    otherwise,
                }]);
            }
            NodeKind::FunctionCall(name) => {
                let arity = node.children.len();
                self.operands_then(
                    arity,
                    Operation::Call {
                        name: name.clone(),
                        arity,
                    },
                )?;
            }
            NodeKind::List => {
                let count = node.children.len();
                self.operands_then(count, Operation::List(count))?;
            }
            NodeKind::Map => {
                let count = node.children.len();
                self.operands_then(count, Operation::Map(count / 2))?;
            }
        }
        Ok(())
    }
}

/// Resolve backslash escapes in a string literal body
///
/// `\n`, `\t`, `\r`, `\b`, `\f`, `\\`, `\'`, `\"` and `\uXXXX` are
/// recognised; any other escape keeps both characters.
pub fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some(c @ ('\\' | '\'' | '"')) => out.push(c),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == 4 => {
                        out.push(decoded);
                        for _ in 0..4 {
                            chars.next();
                        }
                    }
                    _ => out.push_str("\\u"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArithmeticOp, LogicalOp};
    use pretty_assertions::assert_eq;

    fn operations(source: &str) -> Vec<Operation> {
        Compiler::compile(source).unwrap().operations().to_vec()
    }

    #[test]
    fn test_postfix_order() {
        assert_eq!(
            operations("1 + foo"),
            vec![
                Operation::Push(Token::from(1)),
                Operation::Variable("foo".to_string()),
                Operation::Arithmetic(ArithmeticOp::Add),
            ]
        );
    }

    #[test]
    fn test_function_arguments_in_order() {
        assert_eq!(
            operations("JOIN(a, ',')"),
            vec![
                Operation::Variable("a".to_string()),
                Operation::Push(Token::from(",")),
                Operation::Call {
                    name: "JOIN".to_string(),
                    arity: 2
                },
            ]
        );
        assert_eq!(
            operations("MAP_EXISTS()"),
            vec![Operation::Call {
                name: "MAP_EXISTS".to_string(),
                arity: 0
            }]
        );
    }

    #[test]
    fn test_logical_keeps_nested_operands() {
        assert_eq!(
            operations("a or b"),
            vec![Operation::Logical {
                op: LogicalOp::Or,
                left: vec![Operation::Variable("a".to_string())],
                right: vec![Operation::Variable("b".to_string())],
            }]
        );
    }

    #[test]
    fn test_map_literal() {
        assert_eq!(
            operations("{'a' : 1}"),
            vec![
                Operation::Push(Token::from("a")),
                Operation::Push(Token::from(1)),
                Operation::Map(1),
            ]
        );
    }

    #[test]
    fn test_reserved_words_rejected() {
        for source in ["in", "foo == in", "TO_UPPER(then)", "[1, else]"] {
            let err = Compiler::compile(source).unwrap_err();
            assert!(
                matches!(err, StellarError::Parse(ParseError::ReservedWord { .. })),
                "{source}: {err}"
            );
        }
    }

    #[test]
    fn test_invalid_number_is_parse_error() {
        assert!(matches!(
            Compiler::compile("99999999999999999999"),
            Err(StellarError::Parse(ParseError::InvalidNumber { .. }))
        ));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb\tc"), "a\nb\tc");
        assert_eq!(unescape(r"\'bar\'"), "'bar'");
        assert_eq!(unescape(r#"\"bar\""#), "\"bar\"");
        assert_eq!(unescape(r"back\\slash"), r"back\slash");
        assert_eq!(unescape(r"A"), "A");
        assert_eq!(unescape(r"\q"), r"\q");
        assert_eq!(unescape("plain"), "plain");
    }
}
