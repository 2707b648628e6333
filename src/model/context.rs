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

//! Ambient evaluation context

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

use super::value::Value;

/// Well-known context key holding the default zone for date functions
pub const TIMEZONE: &str = "timezone";

static EMPTY_CONTEXT: LazyLock<Context> = LazyLock::new(Context::default);

/// Immutable key/value store that is independent of the record being evaluated
///
/// Typical entries are shell variables captured in an interactive session or
/// deployment-wide defaults. The engine never mutates a context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    capabilities: FxHashMap<String, Value>,
}

impl Context {
    /// The process-wide empty context
    pub fn empty() -> &'static Context {
        &EMPTY_CONTEXT
    }

    /// Start building a context
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Look up a capability
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.capabilities.get(key)
    }

    /// Whether a capability is present
    pub fn contains(&self, key: &str) -> bool {
        self.capabilities.contains_key(key)
    }

    /// Number of capabilities
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Whether the context holds nothing
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Iterate capability names
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.capabilities.keys().map(String::as_str)
    }
}

/// Builder for [`Context`]
#[derive(Debug, Default)]
pub struct ContextBuilder {
    capabilities: FxHashMap<String, Value>,
}

impl ContextBuilder {
    /// Add or replace a capability
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.capabilities.insert(key.into(), value.into());
        self
    }

    /// Freeze into an immutable context
    pub fn build(self) -> Context {
        Context {
            capabilities: self.capabilities,
        }
    }
}
