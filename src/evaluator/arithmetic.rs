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

//! Arithmetic operators

use super::NumericPair;
use crate::ast::ArithmeticOp;
use crate::error::{Result, StellarError};
use crate::model::Token;

/// Evaluates `+ - * /` over promoted numeric operands
pub struct ArithmeticEvaluator;

impl ArithmeticEvaluator {
    /// Apply an arithmetic operator
    ///
    /// A null operand yields null. Integral results wrap on overflow and
    /// integral division by zero fails; floating operations follow IEEE 754.
    pub fn evaluate(op: ArithmeticOp, left: &Token, right: &Token) -> Result<Token> {
        let (Some(l), Some(r)) = (left.value(), right.value()) else {
            return Ok(Token::null());
        };
        let Some(pair) = NumericPair::promote(l, r) else {
            return Err(StellarError::type_mismatch(format!(
                "Unable to apply '{op}' to {} and {}",
                l.type_tag(),
                r.type_tag()
            )));
        };

        Ok(match pair {
            NumericPair::Integer(a, b) => Token::from(match op {
                ArithmeticOp::Add => a.wrapping_add(b),
                ArithmeticOp::Subtract => a.wrapping_sub(b),
                ArithmeticOp::Multiply => a.wrapping_mul(b),
                ArithmeticOp::Divide => {
                    if b == 0 {
                        return Err(StellarError::arithmetic("integer division by zero"));
                    }
                    a.wrapping_div(b)
                }
            }),
            NumericPair::Long(a, b) => Token::from(match op {
                ArithmeticOp::Add => a.wrapping_add(b),
                ArithmeticOp::Subtract => a.wrapping_sub(b),
                ArithmeticOp::Multiply => a.wrapping_mul(b),
                ArithmeticOp::Divide => {
                    if b == 0 {
                        return Err(StellarError::arithmetic("long division by zero"));
                    }
                    a.wrapping_div(b)
                }
            }),
            NumericPair::Float(a, b) => Token::from(match op {
                ArithmeticOp::Add => a + b,
                ArithmeticOp::Subtract => a - b,
                ArithmeticOp::Multiply => a * b,
                ArithmeticOp::Divide => a / b,
            }),
            NumericPair::Double(a, b) => Token::from(match op {
                ArithmeticOp::Add => a + b,
                ArithmeticOp::Subtract => a - b,
                ArithmeticOp::Multiply => a * b,
                ArithmeticOp::Divide => a / b,
            }),
        })
    }
}
