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

//! Tagged stack values

use super::value::{TypeTag, Value};

/// A runtime-tagged value flowing through the evaluation stack
///
/// A token without a value is `null`. Tokens are immutable: operators always
/// produce a fresh token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    value: Option<Value>,
    kind: TypeTag,
}

impl Token {
    /// Wrap a value, normalising `Value::Null` to an empty token
    pub fn new(value: Value) -> Self {
        match value {
            Value::Null => Self::null(),
            value => Self {
                kind: value.type_tag(),
                value: Some(value),
            },
        }
    }

    /// The null token
    #[inline]
    pub const fn null() -> Self {
        Self {
            value: None,
            kind: TypeTag::Null,
        }
    }

    /// Boolean token
    #[inline]
    pub fn boolean(value: bool) -> Self {
        Self {
            value: Some(Value::Boolean(value)),
            kind: TypeTag::Boolean,
        }
    }

    /// Borrow the wrapped value, `None` for null
    #[inline]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Runtime kind of the token
    #[inline]
    pub fn kind(&self) -> TypeTag {
        self.kind
    }

    /// Whether this token carries no value
    #[inline]
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Unwrap into a value, `Value::Null` for null
    pub fn into_value(self) -> Value {
        self.value.unwrap_or(Value::Null)
    }

    /// Borrow as string slice
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(Value::as_bool)
    }

    /// Get an integral value widened to `i64`
    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_ref().and_then(Value::as_i64)
    }

    /// Get a numeric value widened to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_ref().and_then(Value::as_f64)
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::null()
    }
}

impl From<Value> for Token {
    fn from(value: Value) -> Self {
        Token::new(value)
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Token::boolean(value)
    }
}

impl From<i32> for Token {
    fn from(value: i32) -> Self {
        Token::new(Value::Integer(value))
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token::new(Value::Long(value))
    }
}

impl From<f32> for Token {
    fn from(value: f32) -> Self {
        Token::new(Value::Float(value))
    }
}

impl From<f64> for Token {
    fn from(value: f64) -> Self {
        Token::new(Value::Double(value))
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::new(Value::from(value))
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::new(Value::String(value))
    }
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        token.into_value()
    }
}
