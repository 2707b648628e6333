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

//! Parse error types

use thiserror::Error;

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while turning source text into a compiled expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A token appeared where the grammar does not allow it
    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken {
        /// Text of the offending token
        token: String,
        /// Byte offset in the source
        position: usize,
    },

    /// Input ended in the middle of a construct
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof {
        /// What the parser was looking for
        expected: String,
    },

    /// A string literal was not closed
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote
        position: usize,
    },

    /// A character that starts no token
    #[error("Invalid character '{ch}' at position {position}")]
    InvalidCharacter {
        /// The character
        ch: char,
        /// Byte offset in the source
        position: usize,
    },

    /// A numeric literal that does not fit its kind
    #[error("Invalid {kind} literal '{text}'")]
    InvalidNumber {
        /// Literal text including any suffix
        text: String,
        /// Kind selected by the suffix
        kind: &'static str,
    },

    /// A reserved word used where an identifier is expected
    #[error("Reserved word '{word}' cannot be used as an identifier")]
    ReservedWord {
        /// The word
        word: String,
    },
}
