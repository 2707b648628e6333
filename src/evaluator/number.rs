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

//! Numeric literal conversion

use crate::model::Token;
use crate::parser::{NumberKind, ParseError, ParseResult};

/// Turns numeric literal text into a typed token
pub struct NumberLiteralEvaluator;

impl NumberLiteralEvaluator {
    /// Convert literal text (sign and suffix included) to a token
    ///
    /// Unsuffixed integers that overflow 32 bits become longs. Values that
    /// do not fit their kind, or floating literals that round to infinity,
    /// are rejected.
    pub fn evaluate(text: &str, kind: NumberKind) -> ParseResult<Token> {
        let invalid = || ParseError::InvalidNumber {
            text: text.to_string(),
            kind: kind.name(),
        };
        let digits = match kind {
            NumberKind::Integer => text,
            _ if text.ends_with(|c: char| c.is_ascii_alphabetic()) => &text[..text.len() - 1],
            _ => text,
        };

        match kind {
            NumberKind::Integer => digits
                .parse::<i32>()
                .map(Token::from)
                .or_else(|_| digits.parse::<i64>().map(Token::from))
                .map_err(|_| invalid()),
            NumberKind::Long => digits.parse::<i64>().map(Token::from).map_err(|_| invalid()),
            NumberKind::Float => match digits.parse::<f32>() {
                Ok(value) if value.is_finite() => Ok(Token::from(value)),
                _ => Err(invalid()),
            },
            NumberKind::Double => match digits.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Token::from(value)),
                _ => Err(invalid()),
            },
        }
    }
}
