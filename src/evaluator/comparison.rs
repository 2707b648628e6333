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

//! Comparison operators

use super::NumericPair;
use crate::ast::ComparisonOp;
use crate::error::{Result, StellarError};
use crate::model::{Token, Value};
use std::cmp::Ordering;

/// Evaluates `== != < <= > >=`
pub struct ComparisonEvaluator;

impl ComparisonEvaluator {
    /// Apply a comparison operator, producing a boolean token
    pub fn evaluate(op: ComparisonOp, left: &Token, right: &Token) -> Result<Token> {
        Self::compare(op, left.value(), right.value()).map(Token::boolean)
    }

    /// Compare two optional values
    ///
    /// `null == null` holds and `null` equals nothing else. Any ordering
    /// involving `null` is false.
    pub fn compare(op: ComparisonOp, left: Option<&Value>, right: Option<&Value>) -> Result<bool> {
        let accept: fn(Ordering) -> bool = match op {
            ComparisonOp::Equal => return Ok(Self::values_equal(left, right)),
            ComparisonOp::NotEqual => return Ok(!Self::values_equal(left, right)),
            ComparisonOp::LessThan => Ordering::is_lt,
            ComparisonOp::LessThanOrEqual => Ordering::is_le,
            ComparisonOp::GreaterThan => Ordering::is_gt,
            ComparisonOp::GreaterThanOrEqual => Ordering::is_ge,
        };

        let (Some(l), Some(r)) = (left, right) else {
            return Ok(false);
        };
        Ok(Self::ordering(l, r)?.is_some_and(accept))
    }

    /// Equality of optional values
    pub fn values_equal(left: Option<&Value>, right: Option<&Value>) -> bool {
        match (left, right) {
            (None, None) => true,
            (Some(l), Some(r)) => Self::value_equal(l, r),
            _ => false,
        }
    }

    /// Equality of two present values: numbers after promotion, all else structurally
    pub fn value_equal(left: &Value, right: &Value) -> bool {
        match NumericPair::promote(left, right) {
            Some(pair) => pair.equal(),
            None => left == right,
        }
    }

    fn ordering(left: &Value, right: &Value) -> Result<Option<Ordering>> {
        if let Some(pair) = NumericPair::promote(left, right) {
            return Ok(pair.compare());
        }
        match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Some(a.cmp(b))),
            _ => Err(StellarError::type_mismatch(format!(
                "Unable to compare {} with {}",
                left.type_tag(),
                right.type_tag()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use rstest::rstest;

    fn cmp(op: ComparisonOp, left: impl Into<Token>, right: impl Into<Token>) -> Result<bool> {
        let (left, right): (Token, Token) = (left.into(), right.into());
        ComparisonEvaluator::compare(op, left.value(), right.value())
    }

    #[rstest]
    #[case(ComparisonOp::Equal, true)]
    #[case(ComparisonOp::NotEqual, false)]
    #[case(ComparisonOp::LessThan, false)]
    #[case(ComparisonOp::LessThanOrEqual, false)]
    #[case(ComparisonOp::GreaterThan, false)]
    #[case(ComparisonOp::GreaterThanOrEqual, false)]
    fn test_null_with_null(#[case] op: ComparisonOp, #[case] expected: bool) {
        assert_eq!(cmp(op, Token::null(), Token::null()).unwrap(), expected);
    }

    #[test]
    fn test_null_with_value() {
        assert!(!cmp(ComparisonOp::Equal, Token::null(), 1).unwrap());
        assert!(cmp(ComparisonOp::NotEqual, 1, Token::null()).unwrap());
        assert!(!cmp(ComparisonOp::LessThan, Token::null(), 1).unwrap());
        assert!(!cmp(ComparisonOp::GreaterThanOrEqual, 1, Token::null()).unwrap());
    }

    #[test]
    fn test_numeric_promotion() {
        assert!(cmp(ComparisonOp::Equal, 1, 1.0).unwrap());
        assert!(cmp(ComparisonOp::Equal, 1i64, 1).unwrap());
        assert!(!cmp(ComparisonOp::Equal, 1, 1.0000001).unwrap());
        assert!(cmp(ComparisonOp::LessThan, 1, 1.5f32).unwrap());
        assert!(cmp(ComparisonOp::GreaterThanOrEqual, 2i64, 2.0).unwrap());
    }

    #[test]
    fn test_strings_and_booleans() {
        assert!(cmp(ComparisonOp::Equal, "casey", "casey").unwrap());
        assert!(cmp(ComparisonOp::LessThan, "abc", "abd").unwrap());
        assert!(cmp(ComparisonOp::LessThan, false, true).unwrap());
        assert!(!cmp(ComparisonOp::Equal, "1", 1).unwrap());
    }

    #[test]
    fn test_ordering_mismatch() {
        let err = cmp(ComparisonOp::LessThan, "a", 1).unwrap_err();
        assert_eq!(err.kind(), FailureKind::TypeMismatch);
    }
}
