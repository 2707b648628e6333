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

//! The `in` / `not in` operators

use super::comparison::ComparisonEvaluator;
use crate::error::{Result, StellarError};
use crate::model::{Token, Value};

/// Membership test dispatched on the container's runtime kind
pub struct MembershipEvaluator;

impl MembershipEvaluator {
    /// Whether `needle` is a member of `container`
    ///
    /// - String container: substring containment
    /// - List: an element equal to the needle
    /// - Map: a key equal to the needle
    /// - null container: empty
    pub fn evaluate(needle: &Token, container: &Token) -> Result<bool> {
        let Some(container) = container.value() else {
            return Ok(false);
        };
        match container {
            Value::String(haystack) => Ok(needle.as_str().is_some_and(|n| haystack.contains(n))),
            Value::List(items) => Ok(items.iter().any(|item| Self::matches(needle, item))),
            Value::Map(map) => match needle.value() {
                Some(key) if !key.type_tag().is_numeric() => Ok(map.contains_key(key)),
                _ => Ok(map.keys().any(|key| Self::matches(needle, key))),
            },
            other => Err(StellarError::type_mismatch(format!(
                "'in' expects a String, List or Map on the right, got {}",
                other.type_tag()
            ))),
        }
    }

    fn matches(needle: &Token, item: &Value) -> bool {
        match needle.value() {
            None => item.is_null(),
            Some(value) => !item.is_null() && ComparisonEvaluator::value_equal(value, item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn member(needle: impl Into<Token>, container: impl Into<Token>) -> Result<bool> {
        MembershipEvaluator::evaluate(&needle.into(), &container.into())
    }

    fn list(values: Vec<Value>) -> Token {
        Token::new(Value::List(values))
    }

    #[test]
    fn test_string_container() {
        assert!(member("case", "casey").unwrap());
        assert!(!member("zzz", "casey").unwrap());
        assert!(!member(1, "1").unwrap());
        assert!(!member(Token::null(), "casey").unwrap());
    }

    #[test]
    fn test_list_container() {
        let items = list(vec!["foo".into(), "bar".into()]);
        assert!(member("foo", items.clone()).unwrap());
        assert!(!member("baz", items.clone()).unwrap());
        assert!(!member(Token::null(), items).unwrap());
        assert!(member(Token::null(), list(vec![Value::Null, "x".into()])).unwrap());
        assert!(member(1.0, list(vec![1.into()])).unwrap());
    }

    #[test]
    fn test_map_container() {
        let map = Token::new(Value::map([
            (Value::from("foo"), Value::from(5)),
            (Value::from(2i64), Value::from(6)),
        ]));
        assert!(member("foo", map.clone()).unwrap());
        assert!(!member("bar", map.clone()).unwrap());
        assert!(member(2, map.clone()).unwrap());
        assert!(!member(Token::null(), map).unwrap());
    }

    #[test]
    fn test_null_container_is_empty() {
        assert!(!member("foo", Token::null()).unwrap());
    }

    #[test]
    fn test_scalar_container_rejected() {
        let err = member(true, true).unwrap_err();
        assert_eq!(err.kind(), FailureKind::TypeMismatch);
    }
}
