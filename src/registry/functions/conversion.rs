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

//! Type conversion functions
//!
//! Conversions never fail on content: null converts to null and a string
//! that does not parse converts to null as well.

use crate::model::{Context, Token, Value};
use crate::registry::function::{FunctionDescriptor, FunctionResult, StellarFunction, args};
use std::sync::LazyLock;

/// Intermediate numeric reading of a value
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Integral(i64),
    Real(f64),
}

impl Numeric {
    fn read(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(Numeric::Integral(i64::from(*i))),
            Value::Long(l) => Some(Numeric::Integral(*l)),
            Value::Float(f) => Some(Numeric::Real(f64::from(*f))),
            Value::Double(d) => Some(Numeric::Real(*d)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Numeric::Integral)
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(Numeric::Real))
            }
            _ => None,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            Numeric::Integral(i) => i,
            Numeric::Real(r) => r as i64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Numeric::Integral(i) => i as f64,
            Numeric::Real(r) => r,
        }
    }
}

fn numeric_arg(args: &[Token]) -> Option<Numeric> {
    args::value(args, 0).and_then(Numeric::read)
}

/// Renders any value as a string
pub struct ToStringFunction;

impl StellarFunction for ToStringFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "TO_STRING",
                "Transforms the first argument to a string",
                &["input - Object"],
                "String representation of the input",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(match args::value(args, 0) {
            None => Token::null(),
            Some(Value::String(s)) => Token::from(s.as_str()),
            Some(other) => Token::from(other.to_string()),
        })
    }
}

/// Converts to a 32-bit integer
pub struct ToIntegerFunction;

impl StellarFunction for ToIntegerFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "TO_INTEGER",
                "Transforms the first argument to an integer, truncating any fraction",
                &["input - Object"],
                "Integer, or null if the input cannot be converted",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(numeric_arg(args)
            .and_then(|n| i32::try_from(n.as_i64()).ok())
            .map(Token::from)
            .unwrap_or_default())
    }
}

/// Converts to a 64-bit integer
pub struct ToLongFunction;

impl StellarFunction for ToLongFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "TO_LONG",
                "Transforms the first argument to a long integer, truncating any fraction",
                &["input - Object"],
                "Long, or null if the input cannot be converted",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(numeric_arg(args)
            .map(|n| Token::from(n.as_i64()))
            .unwrap_or_default())
    }
}

/// Converts to a 32-bit float
pub struct ToFloatFunction;

impl StellarFunction for ToFloatFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "TO_FLOAT",
                "Transforms the first argument to a float",
                &["input - Object"],
                "Float, or null if the input cannot be converted",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(numeric_arg(args)
            .map(|n| Token::from(n.as_f64() as f32))
            .unwrap_or_default())
    }
}

/// Converts to a 64-bit float
pub struct ToDoubleFunction;

impl StellarFunction for ToDoubleFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "TO_DOUBLE",
                "Transforms the first argument to a double",
                &["input - Object"],
                "Double, or null if the input cannot be converted",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(numeric_arg(args)
            .map(|n| Token::from(n.as_f64()))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(function: &dyn StellarFunction, arg: impl Into<Token>) -> Token {
        function.apply(&[arg.into()], Context::empty()).unwrap()
    }

    #[test]
    fn test_to_string() {
        assert_eq!(call(&ToStringFunction, 5), Token::from("5"));
        assert_eq!(call(&ToStringFunction, 5.0), Token::from("5.0"));
        assert!(call(&ToStringFunction, Token::null()).is_null());
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(call(&ToIntegerFunction, "5"), Token::from(5));
        assert_eq!(call(&ToIntegerFunction, 5), Token::from(5));
        assert_eq!(call(&ToIntegerFunction, 10.0), Token::from(10));
        assert_eq!(call(&ToIntegerFunction, " 7 "), Token::from(7));
        assert!(call(&ToIntegerFunction, "five").is_null());
        assert!(call(&ToIntegerFunction, i64::MAX).is_null());
    }

    #[test]
    fn test_floating() {
        assert_eq!(call(&ToDoubleFunction, 5.1), Token::from(5.1));
        assert_eq!(call(&ToDoubleFunction, "5.1"), Token::from(5.1));
        assert_eq!(call(&ToFloatFunction, "2.5"), Token::from(2.5f32));
        assert_eq!(call(&ToLongFunction, "9"), Token::from(9i64));
        assert!(call(&ToDoubleFunction, true).is_null());
    }
}
