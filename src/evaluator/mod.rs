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

//! Operator semantics
//!
//! Stateless evaluators used by compiled expressions: literal conversion,
//! arithmetic with numeric promotion, comparison and membership.

pub mod arithmetic;
pub mod comparison;
pub mod membership;
pub mod number;

pub use arithmetic::ArithmeticEvaluator;
pub use comparison::ComparisonEvaluator;
pub use membership::MembershipEvaluator;
pub use number::NumberLiteralEvaluator;

use crate::error::{Result, StellarError};
use crate::model::{Token, Value};
use std::cmp::Ordering;

/// Two numeric operands promoted to their common kind
///
/// The widening lattice is `Integer < Long < Float < Double`; the wider
/// operand decides the result kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericPair {
    /// Both Integer
    Integer(i32, i32),
    /// Widest is Long
    Long(i64, i64),
    /// Widest is Float
    Float(f32, f32),
    /// Widest is Double
    Double(f64, f64),
}

impl NumericPair {
    /// Promote two values, `None` unless both are numeric
    pub fn promote(left: &Value, right: &Value) -> Option<Self> {
        let rank = left
            .type_tag()
            .numeric_rank()?
            .max(right.type_tag().numeric_rank()?);
        Some(match rank {
            0 => NumericPair::Integer(as_i32(left)?, as_i32(right)?),
            1 => NumericPair::Long(left.as_i64()?, right.as_i64()?),
            2 => NumericPair::Float(as_f32(left)?, as_f32(right)?),
            _ => NumericPair::Double(left.as_f64()?, right.as_f64()?),
        })
    }

    /// Numeric equality; NaN equals nothing
    pub fn equal(self) -> bool {
        self.compare() == Some(Ordering::Equal)
    }

    /// Numeric ordering; `None` when either side is NaN
    pub fn compare(self) -> Option<Ordering> {
        match self {
            NumericPair::Integer(a, b) => Some(a.cmp(&b)),
            NumericPair::Long(a, b) => Some(a.cmp(&b)),
            NumericPair::Float(a, b) => a.partial_cmp(&b),
            NumericPair::Double(a, b) => a.partial_cmp(&b),
        }
    }
}

fn as_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Integer(i) => Some(*i),
        _ => None,
    }
}

fn as_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Integer(i) => Some(*i as f32),
        Value::Long(l) => Some(*l as f32),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Read a token in a boolean context
///
/// `null` counts as false; any other non-boolean is a type mismatch.
pub fn truthiness(token: &Token, operator: &str) -> Result<bool> {
    match token.value() {
        None => Ok(false),
        Some(Value::Boolean(b)) => Ok(*b),
        Some(other) => Err(StellarError::type_mismatch(format!(
            "Unable to apply '{operator}' to a non-boolean value of kind {}",
            other.type_tag()
        ))),
    }
}
