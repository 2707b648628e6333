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

//! Listener-based parse tree traversal

use super::node::SyntaxNode;

/// Receives enter and exit events while a parse tree is walked
///
/// Children are visited left to right between a node's `enter` and
/// `exit`. Returning an error aborts the walk.
pub trait ParseTreeListener {
    /// Error raised by the listener
    type Error;

    /// Called before the node's children are visited
    fn enter(&mut self, _node: &SyntaxNode) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called after all of the node's children were visited
    fn exit(&mut self, node: &SyntaxNode) -> Result<(), Self::Error>;
}

/// Walk a tree depth first, notifying the listener
pub fn walk<L: ParseTreeListener>(node: &SyntaxNode, listener: &mut L) -> Result<(), L::Error> {
    listener.enter(node)?;
    for child in &node.children {
        walk(child, listener)?;
    }
    listener.exit(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArithmeticOp, NodeKind};
    use std::convert::Infallible;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ParseTreeListener for Recorder {
        type Error = Infallible;

        fn enter(&mut self, node: &SyntaxNode) -> Result<(), Infallible> {
            self.events.push(format!("enter {:?}", node.kind));
            Ok(())
        }

        fn exit(&mut self, node: &SyntaxNode) -> Result<(), Infallible> {
            self.events.push(format!("exit {:?}", node.kind));
            Ok(())
        }
    }

    #[test]
    fn test_walk_order() {
        let tree = SyntaxNode::binary(
            NodeKind::Arithmetic(ArithmeticOp::Add),
            SyntaxNode::leaf(NodeKind::Identifier("a".into()), 0),
            SyntaxNode::leaf(NodeKind::Null, 4),
        );
        let mut recorder = Recorder::default();
        walk(&tree, &mut recorder).unwrap();
        assert_eq!(
            recorder.events,
            vec![
                "enter Arithmetic(Add)",
                "enter Identifier(\"a\")",
                "exit Identifier(\"a\")",
                "enter Null",
                "exit Null",
                "exit Arithmetic(Add)",
            ]
        );
        assert_eq!(tree.size(), 3);
    }
}
