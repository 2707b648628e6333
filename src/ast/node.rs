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

//! Parse tree nodes

use super::operator::{ArithmeticOp, ComparisonOp, LogicalOp};
use crate::parser::NumberKind;

/// What a parse tree node represents
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Numeric literal; `text` carries any sign and suffix
    Number {
        /// Literal text
        text: String,
        /// Literal kind
        kind: NumberKind,
    },
    /// String literal with escapes still unresolved
    String {
        /// Raw body between the quotes
        raw: String,
        /// Delimiting quote
        quote: char,
    },
    /// `true` / `false`
    Boolean(bool),
    /// `null`
    Null,
    /// Variable reference
    Identifier(String),
    /// `exists(name)`
    Exists(String),
    /// Binary arithmetic; two children
    Arithmetic(ArithmeticOp),
    /// Binary comparison; two children
    Comparison(ComparisonOp),
    /// `and` / `or`; two children
    Logical(LogicalOp),
    /// `in` / `not in`; needle then container
    Membership {
        /// `not in`
        negated: bool,
    },
    /// Prefix `not`; one child
    Not,
    /// Ternary or `if/then/else`; condition, then, else
    Conditional,
    /// Function call; one child per argument
    FunctionCall(String),
    /// List literal; one child per element
    List,
    /// Map literal; children alternate key and value
    Map,
}

/// A node of the parse tree
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    /// Node kind
    pub kind: NodeKind,
    /// Child nodes in source order
    pub children: Vec<SyntaxNode>,
    /// Byte offset of the first token
    pub position: usize,
}

impl SyntaxNode {
    /// Create a node without children
    pub fn leaf(kind: NodeKind, position: usize) -> Self {
        Self {
            kind,
            children: Vec::new(),
            position,
        }
    }

    /// Create a node with children
    pub fn with_children(kind: NodeKind, children: Vec<SyntaxNode>, position: usize) -> Self {
        Self {
            kind,
            children,
            position,
        }
    }

    /// Create a two-operand node positioned at its left operand
    pub fn binary(kind: NodeKind, left: SyntaxNode, right: SyntaxNode) -> Self {
        let position = left.position;
        Self::with_children(kind, vec![left, right], position)
    }

    /// Number of nodes in this subtree
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(SyntaxNode::size).sum::<usize>()
    }
}
