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

//! Function protocol, registry and documentation checks

use crate::model::{Context, FunctionRef, Token, TypeTag, Value};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for function operations
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Function evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// Invalid number of arguments
    #[error("Function '{name}' expects {min}-{} arguments, got {actual}", max.map_or("∞".to_string(), |n| n.to_string()))]
    InvalidArity {
        /// Function name
        name: String,
        /// Minimum arguments
        min: usize,
        /// Maximum arguments (None for unlimited)
        max: Option<usize>,
        /// Actual arguments provided
        actual: usize,
    },

    /// Invalid argument type
    #[error("Function '{name}' argument {index} expects {expected}, got {actual}")]
    InvalidArgumentType {
        /// Function name
        name: String,
        /// Argument index
        index: usize,
        /// Expected type
        expected: String,
        /// Actual type
        actual: String,
    },

    /// Runtime evaluation error
    #[error("Function '{name}' evaluation error: {message}")]
    Evaluation {
        /// Function name
        name: String,
        /// Error message
        message: String,
    },

    /// Accumulator reached a state it cannot represent
    #[error("Function '{name}' illegal state: {message}")]
    State {
        /// Function name
        name: String,
        /// Error message
        message: String,
    },
}

impl FunctionError {
    /// Build an evaluation error
    pub fn evaluation(name: &str, message: impl Into<String>) -> Self {
        Self::Evaluation {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Build an illegal state error
    pub fn state(name: &str, message: impl Into<String>) -> Self {
        Self::State {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Build an argument type error
    pub fn argument_type(name: &str, index: usize, expected: &str, actual: TypeTag) -> Self {
        Self::InvalidArgumentType {
            name: name.to_string(),
            index,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Documentation and arity metadata published by every function
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FunctionDescriptor {
    /// Name used at call sites
    pub name: String,
    /// What the function does
    pub description: String,
    /// One entry per parameter, `name - description`
    pub params: Vec<String>,
    /// What the function returns
    pub returns: String,
    /// Minimum number of arguments
    pub min_arity: usize,
    /// Maximum number of arguments (None for unlimited)
    pub max_arity: Option<usize>,
}

impl FunctionDescriptor {
    /// Create a descriptor whose arity is exactly the parameter count
    pub fn new(name: &str, description: &str, params: &[&str], returns: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params: params.iter().map(|param| (*param).to_string()).collect(),
            returns: returns.to_string(),
            min_arity: params.len(),
            max_arity: Some(params.len()),
        }
    }

    /// Override the accepted arity range
    pub fn with_arity(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_arity = min;
        self.max_arity = max;
        self
    }

    /// Check an argument count against the declared arity
    pub fn check_arity(&self, actual: usize) -> FunctionResult<()> {
        let too_many = self.max_arity.is_some_and(|max| actual > max);
        if actual < self.min_arity || too_many {
            return Err(FunctionError::InvalidArity {
                name: self.name.clone(),
                min: self.min_arity,
                max: self.max_arity,
                actual,
            });
        }
        Ok(())
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "  Description: {}", self.description)?;
        if !self.params.is_empty() {
            writeln!(f, "  Arguments:")?;
            for param in &self.params {
                writeln!(f, "    {param}")?;
            }
        }
        write!(f, "  Returns: {}", self.returns)
    }
}

/// A callable function
///
/// Implementations must be safe to call concurrently from many
/// evaluations. Arguments arrive already evaluated, in call order.
pub trait StellarFunction: Send + Sync {
    /// Documentation and arity metadata
    fn descriptor(&self) -> &FunctionDescriptor;

    /// Apply the function
    fn apply(&self, args: &[Token], context: &Context) -> FunctionResult<Token>;

    /// Name used at call sites
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Validate the argument count against the descriptor
    fn validate_args(&self, args: &[Token]) -> FunctionResult<()> {
        self.descriptor().check_arity(args.len())
    }
}

/// Looks up functions by name
pub trait FunctionResolver: Send + Sync {
    /// Find a function; `None` if nothing is registered under the name
    fn resolve(&self, name: &str) -> Option<Arc<dyn StellarFunction>>;

    /// Descriptors of every function this resolver can find
    fn functions(&self) -> Vec<FunctionDescriptor>;
}

/// Function backed by a closure
pub struct ClosureFunction<F> {
    descriptor: FunctionDescriptor,
    body: F,
}

impl<F> ClosureFunction<F>
where
    F: Fn(&[Token], &Context) -> FunctionResult<Token> + Send + Sync,
{
    /// Wrap a closure with its descriptor
    pub fn new(descriptor: FunctionDescriptor, body: F) -> Self {
        Self { descriptor, body }
    }
}

impl<F> StellarFunction for ClosureFunction<F>
where
    F: Fn(&[Token], &Context) -> FunctionResult<Token> + Send + Sync,
{
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn apply(&self, args: &[Token], context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        (self.body)(args, context)
    }
}

/// Name-keyed function registry
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, Arc<dyn StellarFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the standard library
    pub fn standard() -> Self {
        let mut registry = Self::new();
        super::functions::register_standard_functions(&mut registry);
        registry
    }

    /// Register a function; a previous function of the same name is replaced
    pub fn register<F: StellarFunction + 'static>(&mut self, function: F) {
        self.register_arc(Arc::new(function));
    }

    /// Register a shared function
    pub fn register_arc(&mut self, function: Arc<dyn StellarFunction>) {
        let name = function.name().to_string();
        if self.functions.insert(name.clone(), function).is_some() {
            log::debug!("Replaced function '{name}'");
        }
    }

    /// Register a closure under the descriptor's name
    pub fn register_fn<F>(&mut self, descriptor: FunctionDescriptor, body: F)
    where
        F: Fn(&[Token], &Context) -> FunctionResult<Token> + Send + Sync + 'static,
    {
        self.register(ClosureFunction::new(descriptor, body));
    }

    /// Check if a function is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// A first-class reference to a registered function
    pub fn reference(&self, name: &str) -> Option<Value> {
        self.functions
            .get(name)
            .map(|function| Value::Function(FunctionRef::new(function.clone())))
    }

    /// Registered function names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FunctionResolver for FunctionRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn StellarFunction>> {
        self.functions.get(name).cloned()
    }

    fn functions(&self) -> Vec<FunctionDescriptor> {
        let mut descriptors: Vec<FunctionDescriptor> = self
            .functions
            .values()
            .map(|function| function.descriptor().clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// A documentation problem found by [`validate_descriptors`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{function}: {problem}")]
pub struct DescriptorViolation {
    /// Offending function
    pub function: String,
    /// What is missing or malformed
    pub problem: String,
}

/// Check that every function carries usable documentation
///
/// Each function needs a non-empty name, description and return
/// description, at least one parameter entry, and every parameter entry
/// has the `name - description` form. Returns the number of functions checked.
pub fn validate_descriptors(
    resolver: &dyn FunctionResolver,
) -> Result<usize, Vec<DescriptorViolation>> {
    let descriptors = resolver.functions();
    let mut violations = Vec::new();

    for descriptor in &descriptors {
        let mut flag = |problem: String| {
            violations.push(DescriptorViolation {
                function: descriptor.name.clone(),
                problem,
            })
        };
        if descriptor.name.trim().is_empty() {
            flag("missing name".to_string());
        }
        if descriptor.description.trim().is_empty() {
            flag("missing description".to_string());
        }
        if descriptor.returns.trim().is_empty() {
            flag("missing return description".to_string());
        }
        if descriptor.params.is_empty() {
            flag("missing parameter documentation".to_string());
        }
        for param in &descriptor.params {
            let documented = param
                .split_once(" - ")
                .is_some_and(|(name, text)| !name.trim().is_empty() && !text.trim().is_empty());
            if !documented {
                flag(format!("parameter '{param}' lacks 'name - description' form"));
            }
        }
        if descriptor
            .max_arity
            .is_some_and(|max| max < descriptor.min_arity)
        {
            flag("maximum arity below minimum".to_string());
        }
    }

    if violations.is_empty() {
        Ok(descriptors.len())
    } else {
        Err(violations)
    }
}

/// Argument accessors shared by the built-in functions
pub(crate) mod args {
    use super::{FunctionError, FunctionResult};
    use crate::model::{Token, Value};

    /// Argument at `index`, `None` when absent or null
    pub fn value<'a>(args: &'a [Token], index: usize) -> Option<&'a Value> {
        args.get(index).and_then(Token::value)
    }

    /// String argument; null or missing yields `None`
    pub fn string<'a>(name: &str, args: &'a [Token], index: usize) -> FunctionResult<Option<&'a str>> {
        match value(args, index) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(FunctionError::argument_type(
                name,
                index,
                "String",
                other.type_tag(),
            )),
        }
    }

    /// Integral argument; null or missing yields `None`
    pub fn integer(name: &str, args: &[Token], index: usize) -> FunctionResult<Option<i64>> {
        match value(args, index) {
            None => Ok(None),
            Some(Value::Integer(n)) => Ok(Some(i64::from(*n))),
            Some(Value::Long(n)) => Ok(Some(*n)),
            Some(other) => Err(FunctionError::argument_type(
                name,
                index,
                "Integer",
                other.type_tag(),
            )),
        }
    }

    /// Numeric argument widened to f64; null or missing yields `None`
    pub fn number(name: &str, args: &[Token], index: usize) -> FunctionResult<Option<f64>> {
        match value(args, index) {
            None => Ok(None),
            Some(other) => other.as_f64().map(Some).ok_or_else(|| {
                FunctionError::argument_type(name, index, "Number", other.type_tag())
            }),
        }
    }
}
