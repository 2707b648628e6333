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

//! Operations executed by a compiled expression

use crate::ast::{ArithmeticOp, ComparisonOp, LogicalOp};
use crate::model::Token;
use rustc_hash::FxHashSet;
use std::fmt;

/// One step of a compiled expression
///
/// Operations run in order against a value stack. Logical operators and
/// conditionals keep their operands as nested operation lists so that
/// only the operands actually needed are run.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Push a literal
    Push(Token),
    /// Push the value of a variable, null when unresolved
    Variable(String),
    /// Push whether a variable resolves to a non-null value
    Exists(String),
    /// Pop two operands, push the arithmetic result
    Arithmetic(ArithmeticOp),
    /// Pop two operands, push the comparison result
    Comparison(ComparisonOp),
    /// Pop needle and container, push the membership result
    Membership {
        /// `not in`
        negated: bool,
    },
    /// Pop one operand, push its negation
    Not,
    /// Pop `arity` arguments, call the named function, push its result
    Call {
        /// Function name
        name: String,
        /// Number of arguments
        arity: usize,
    },
    /// Pop `n` elements, push a list
    List(usize),
    /// Pop `n` key/value pairs, push a map
    Map(usize),
    /// Short-circuiting `and` / `or`
    Logical {
        /// Operator
        op: LogicalOp,
        /// Left operand
        left: Vec<Operation>,
        /// Right operand
        right: Vec<Operation>,
    },
    /// Conditional; exactly one branch runs
    Branch {
        /// Condition
        condition: Vec<Operation>,
        /// Taken when the condition holds
        then: Vec<Operation>,
        /// Taken otherwise
        otherwise: Vec<Operation>,
    },
}

impl Operation {
    /// The boolean constant an operand list consists of, if any
    pub fn boolean_literal(operations: &[Operation]) -> Option<bool> {
        match operations {
            [Operation::Push(token)] => token.as_bool(),
            _ => None,
        }
    }

    /// Collect every variable name read by a list of operations, including
    /// those behind short-circuits and untaken branches
    pub fn collect_variables(operations: &[Operation], names: &mut FxHashSet<String>) {
        for operation in operations {
            match operation {
                Operation::Variable(name) | Operation::Exists(name) => {
                    names.insert(name.clone());
                }
                Operation::Logical { left, right, .. } => {
                    Self::collect_variables(left, names);
                    Self::collect_variables(right, names);
                }
                Operation::Branch {
                    condition,
                    then,
                    otherwise,
                } => {
                    Self::collect_variables(condition, names);
                    Self::collect_variables(then, names);
                    Self::collect_variables(otherwise, names);
                }
                _ => {}
            }
        }
    }

    /// Collect every function name called by a list of operations
    pub fn collect_functions(operations: &[Operation], names: &mut FxHashSet<String>) {
        for operation in operations {
            match operation {
                Operation::Call { name, .. } => {
                    names.insert(name.clone());
                }
                Operation::Logical { left, right, .. } => {
                    Self::collect_functions(left, names);
                    Self::collect_functions(right, names);
                }
                Operation::Branch {
                    condition,
                    then,
                    otherwise,
                } => {
                    Self::collect_functions(condition, names);
                    Self::collect_functions(then, names);
                    Self::collect_functions(otherwise, names);
                }
                _ => {}
            }
        }
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, operations: &[Operation]) -> fmt::Result {
    f.write_str("{")?;
    for (i, operation) in operations.iter().enumerate() {
        if i > 0 {
            f.write_str("; ")?;
        }
        write!(f, "{operation}")?;
    }
    f.write_str("}")
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Push(token) => match token.value() {
                Some(value) => write!(f, "PUSH {value:?}"),
                None => f.write_str("PUSH null"),
            },
            Operation::Variable(name) => write!(f, "VAR {name}"),
            Operation::Exists(name) => write!(f, "EXISTS {name}"),
            Operation::Arithmetic(op) => write!(f, "ARITH {op}"),
            Operation::Comparison(op) => write!(f, "CMP {op}"),
            Operation::Membership { negated: false } => f.write_str("IN"),
            Operation::Membership { negated: true } => f.write_str("NOT_IN"),
            Operation::Not => f.write_str("NOT"),
            Operation::Call { name, arity } => write!(f, "CALL {name}/{arity}"),
            Operation::List(n) => write!(f, "LIST {n}"),
            Operation::Map(n) => write!(f, "MAP {n}"),
            Operation::Logical { op, left, right } => {
                write!(f, "{} ", op.symbol().to_uppercase())?;
                write_block(f, left)?;
                f.write_str(" ")?;
                write_block(f, right)
            }
            Operation::Branch {
                condition,
                then,
                otherwise,
            } => {
                f.write_str("IF ")?;
                write_block(f, condition)?;
                f.write_str(" THEN ")?;
                write_block(f, then)?;
                f.write_str(" ELSE ")?;
                write_block(f, otherwise)
            }
        }
    }
}
