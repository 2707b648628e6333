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

//! Stellar engine - the main entry point for compiling and evaluating rules

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashSet;

use crate::compiler::Expression;
use crate::config::EngineConfig;
use crate::error::{Result, StellarError};
use crate::model::{Context, Value};
use crate::registry::{FunctionDescriptor, FunctionRegistry, FunctionResolver, VariableResolver};

/// Compiles expressions once and evaluates them many times
///
/// The engine is `Send + Sync`; share one instance across worker threads.
pub struct StellarEngine {
    functions: Arc<dyn FunctionResolver>,
    context: Arc<Context>,
    cache: DashMap<String, Arc<Expression>>,
    config: EngineConfig,
}

impl Default for StellarEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StellarEngine {
    /// Create an engine with the standard function library and an empty context
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the standard function library and custom settings
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            functions: Arc::new(FunctionRegistry::standard()),
            context: Arc::new(Context::default()),
            cache: DashMap::new(),
            config,
        }
    }

    /// Replace the function resolver
    pub fn with_functions(mut self, functions: Arc<dyn FunctionResolver>) -> Self {
        self.functions = functions;
        self
    }

    /// Replace the ambient context
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Arc::new(context);
        self
    }

    /// Current settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The ambient context used by [`evaluate`](Self::evaluate)
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Number of memoized expressions
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every memoized expression
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Compile an expression, reusing a memoized one when available
    pub fn compile(&self, source: &str) -> Result<Arc<Expression>> {
        if !self.config.cache_enabled || self.config.max_cache_size == 0 {
            return Ok(Arc::new(Expression::compile(source)?));
        }
        if let Some(expression) = self.cache.get(source) {
            return Ok(expression.clone());
        }

        log::debug!("Expression cache miss: {source}");
        let expression = Arc::new(Expression::compile(source)?);
        if self.cache.len() >= self.config.max_cache_size {
            log::warn!(
                "Expression cache reached {} entries, clearing",
                self.config.max_cache_size
            );
            self.cache.clear();
        }
        self.cache.insert(source.to_string(), expression.clone());
        Ok(expression)
    }

    /// Compile without evaluating
    pub fn validate(&self, source: &str) -> Result<()> {
        self.compile(source).map(|_| ())
    }

    /// Evaluate against the engine's context
    pub fn evaluate(&self, source: &str, variables: &dyn VariableResolver) -> Result<Value> {
        self.evaluate_with_context(source, variables, &self.context)
    }

    /// Evaluate against an explicit context
    pub fn evaluate_with_context(
        &self,
        source: &str,
        variables: &dyn VariableResolver,
        context: &Context,
    ) -> Result<Value> {
        let expression = self.compile(source)?;
        let token = expression.evaluate(variables, self.functions.as_ref(), context)?;
        Ok(token.into_value())
    }

    /// Evaluate a rule that must produce a boolean
    ///
    /// Any other result, `null` included, is a type mismatch.
    pub fn evaluate_predicate(&self, source: &str, variables: &dyn VariableResolver) -> Result<bool> {
        match self.evaluate(source, variables)? {
            Value::Boolean(result) => Ok(result),
            _ => Err(StellarError::type_mismatch(format!(
                "The rule '{source}' does not return a boolean value."
            ))),
        }
    }

    /// Every variable the expression can read
    pub fn variables_used(&self, source: &str) -> Result<FxHashSet<String>> {
        Ok(self.compile(source)?.variables_used())
    }

    /// Descriptors of every available function, sorted by name
    pub fn functions(&self) -> Vec<FunctionDescriptor> {
        self.functions.functions()
    }
}

impl std::fmt::Debug for StellarEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StellarEngine")
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TIMEZONE;
    use crate::registry::EmptyVariableResolver;
    use std::collections::HashMap;

    #[test]
    fn test_compile_is_memoized() {
        let engine = StellarEngine::new();
        let first = engine.compile("1 + 1").unwrap();
        let second = engine.compile("1 + 1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cache_len(), 1);
    }

    #[test]
    fn test_cache_cleared_when_full() {
        let engine = StellarEngine::with_config(EngineConfig::new(true, 2));
        engine.compile("1").unwrap();
        engine.compile("2").unwrap();
        assert_eq!(engine.cache_len(), 2);
        engine.compile("3").unwrap();
        assert_eq!(engine.cache_len(), 1);
    }

    #[test]
    fn test_no_cache() {
        let engine = StellarEngine::with_config(EngineConfig::no_cache());
        engine.compile("1").unwrap();
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn test_failed_compilation_not_cached() {
        let engine = StellarEngine::new();
        assert!(engine.validate("1 +").is_err());
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn test_evaluate_predicate() {
        let engine = StellarEngine::new();
        let mut vars: HashMap<String, Value> = HashMap::new();
        vars.insert("protocol".into(), Value::from("http"));

        assert!(engine.evaluate_predicate("protocol == 'http'", &vars).unwrap());
        let err = engine.evaluate_predicate("TO_UPPER(protocol)", &vars).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type mismatch: The rule 'TO_UPPER(protocol)' does not return a boolean value."
        );
        assert!(engine.evaluate_predicate("null", &vars).is_err());
    }

    #[test]
    fn test_context_reaches_functions() {
        let engine = StellarEngine::new().with_context(Context::builder().with(TIMEZONE, "+01:00").build());
        let value = engine
            .evaluate(
                "TO_EPOCH_TIMESTAMP('1970-01-01 01:00:00', 'yyyy-MM-dd HH:mm:ss')",
                &EmptyVariableResolver,
            )
            .unwrap();
        assert_eq!(value, Value::Long(0));
    }

    #[test]
    fn test_variables_used() {
        let engine = StellarEngine::new();
        let used = engine.variables_used("foo == 'x' and exists(bar)").unwrap();
        assert!(used.contains("foo"));
        assert!(used.contains("bar"));
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StellarEngine>();
    }
}
