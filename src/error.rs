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

//! Error types for compilation and evaluation

use thiserror::Error;

use crate::parser::ParseError;
use crate::registry::FunctionError;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, StellarError>;

/// Failures raised while compiling or evaluating an expression
///
/// Every failure aborts the current evaluation; no partial result is
/// returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StellarError {
    /// Malformed source text
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// An operator was applied to operands of the wrong kind
    #[error("Type mismatch: {message}")]
    TypeMismatch {
        /// Description of the mismatch
        message: String,
    },

    /// No function is registered under the called name
    #[error("Unable to resolve function '{name}'")]
    FunctionResolution {
        /// Called name
        name: String,
    },

    /// Integral division by zero
    #[error("Arithmetic error: {message}")]
    Arithmetic {
        /// Description of the failure
        message: String,
    },

    /// Raised from inside a function and propagated unchanged
    #[error(transparent)]
    Function(#[from] FunctionError),

    /// Compiler or engine invariant violated
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`StellarError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed source
    Parse,
    /// Operand kind not supported by an operator
    TypeMismatch,
    /// Unknown function name
    FunctionResolution,
    /// Integral division by zero
    Arithmetic,
    /// Function-reported failure
    Function,
    /// Function-reported illegal accumulator state
    State,
    /// Engine defect
    Internal,
}

impl StellarError {
    /// Build a type mismatch error
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            message: message.into(),
        }
    }

    /// Build an arithmetic error
    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::Arithmetic {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Parse(_) => FailureKind::Parse,
            Self::TypeMismatch { .. } => FailureKind::TypeMismatch,
            Self::FunctionResolution { .. } => FailureKind::FunctionResolution,
            Self::Arithmetic { .. } => FailureKind::Arithmetic,
            Self::Function(FunctionError::State { .. }) => FailureKind::State,
            Self::Function(_) => FailureKind::Function,
            Self::Internal(_) => FailureKind::Internal,
        }
    }
}
