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

//! Stellar expression language in Rust
//!
//! A small embedded expression language for filtering, enriching and routing
//! security events. Expressions are compiled once into an immutable
//! [`Expression`] and evaluated many times, concurrently, against per-event
//! variable bindings, a function library and an ambient [`Context`].

pub mod ast;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;

// Re-export main types
pub use compiler::{Compiler, Expression};
pub use config::EngineConfig;
pub use engine::StellarEngine;
pub use error::{FailureKind, Result, StellarError};
pub use model::{Context, Token, TypeTag, Value};
pub use parser::{ParseError, parse_expression as parse};
pub use registry::{
    FunctionRegistry, FunctionResolver, JsonVariableResolver, StellarFunction, VariableResolver,
};
