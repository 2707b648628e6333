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

//! Variable resolution
//!
//! A resolver supplies the values of the identifiers an expression
//! references. A missing variable resolves to null; it is never an error.

use crate::model::{Token, Value};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::hash::BuildHasher;

/// Maps variable names to values for one evaluation
pub trait VariableResolver {
    /// Look up a variable; `None` when the name is unknown
    fn resolve(&self, name: &str) -> Option<Token>;
}

/// Resolver that knows no variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyVariableResolver;

impl VariableResolver for EmptyVariableResolver {
    fn resolve(&self, _name: &str) -> Option<Token> {
        None
    }
}

impl<S: BuildHasher> VariableResolver for HashMap<String, Value, S> {
    fn resolve(&self, name: &str) -> Option<Token> {
        self.get(name).cloned().map(Token::new)
    }
}

/// Resolver backed by a closure
pub struct FnVariableResolver<F>(pub F);

impl<F> VariableResolver for FnVariableResolver<F>
where
    F: Fn(&str) -> Option<Value>,
{
    fn resolve(&self, name: &str) -> Option<Token> {
        (self.0)(name).map(Token::new)
    }
}

/// Resolver over a JSON event
///
/// A flat key that matches the whole name wins; otherwise a dotted name
/// such as `ip.src` walks nested objects. When a segment yields an array
/// each element is tried in turn.
#[derive(Debug, Clone, Copy)]
pub struct JsonVariableResolver<'a> {
    event: &'a JsonValue,
}

impl<'a> JsonVariableResolver<'a> {
    /// Wrap a JSON value
    pub fn new(event: &'a JsonValue) -> Self {
        Self { event }
    }

    /// Find the JSON value a name refers to
    pub fn lookup(&self, name: &str) -> Option<&'a JsonValue> {
        if let Some(value) = self.event.as_object().and_then(|object| object.get(name)) {
            return Some(value);
        }
        if name.contains('.') {
            let parts: Vec<&str> = name.split('.').collect();
            return traverse(self.event, &parts);
        }
        None
    }
}

fn traverse<'a>(current: &'a JsonValue, parts: &[&str]) -> Option<&'a JsonValue> {
    let Some((head, rest)) = parts.split_first() else {
        return Some(current);
    };
    match current {
        JsonValue::Object(object) => traverse(object.get(*head)?, rest),
        JsonValue::Array(items) => items.iter().find_map(|item| traverse(item, parts)),
        _ => None,
    }
}

impl VariableResolver for JsonVariableResolver<'_> {
    fn resolve(&self, name: &str) -> Option<Token> {
        self.lookup(name).map(|value| Token::new(Value::from(value.clone())))
    }
}
