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

//! List and map functions

use crate::model::{Context, Token, Value};
use crate::registry::function::{
    FunctionDescriptor, FunctionError, FunctionResult, StellarFunction, args,
};
use std::sync::LazyLock;

fn list_arg<'a>(name: &str, args: &'a [Token], index: usize) -> FunctionResult<Option<&'a [Value]>> {
    match args::value(args, index) {
        None => Ok(None),
        Some(Value::List(items)) => Ok(Some(items)),
        Some(other) => Err(FunctionError::argument_type(
            name,
            index,
            "List",
            other.type_tag(),
        )),
    }
}

/// Length of a string, list or map
pub struct LengthFunction;

impl StellarFunction for LengthFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "LENGTH",
                "Returns the length of a string, list or map",
                &["input - String, List or Map"],
                "Integer length; 0 for null",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let length = match args::value(args, 0) {
            None => 0,
            Some(Value::String(s)) => s.chars().count(),
            Some(Value::List(items)) => items.len(),
            Some(Value::Map(map)) => map.len(),
            Some(other) => {
                return Err(FunctionError::argument_type(
                    self.name(),
                    0,
                    "String, List or Map",
                    other.type_tag(),
                ));
            }
        };
        Ok(i32::try_from(length).map_or_else(|_| Token::from(length as i64), Token::from))
    }
}

/// Emptiness test
pub struct IsEmptyFunction;

impl StellarFunction for IsEmptyFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "IS_EMPTY",
                "Returns true if a string, list or map is empty or null",
                &["input - Object"],
                "True when the input is null or has no elements, false otherwise",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(Token::boolean(match args::value(args, 0) {
            None => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::List(items)) => items.is_empty(),
            Some(Value::Map(map)) => map.is_empty(),
            Some(_) => false,
        }))
    }
}

/// Element at a position
pub struct GetFunction;

impl StellarFunction for GetFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "GET",
                "Returns the element at an index of a list",
                &["input - List", "i - Zero based index"],
                "Element at the index, or null when out of range",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let Some(items) = list_arg(self.name(), args, 0)? else {
            return Ok(Token::null());
        };
        let element = args::integer(self.name(), args, 1)?
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i));
        Ok(element.cloned().map(Token::new).unwrap_or_default())
    }
}

/// First element
pub struct GetFirstFunction;

impl StellarFunction for GetFirstFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "GET_FIRST",
                "Returns the first element of a list",
                &["input - List"],
                "First element, or null for an empty list",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(list_arg(self.name(), args, 0)?
            .and_then(<[Value]>::first)
            .cloned()
            .map(Token::new)
            .unwrap_or_default())
    }
}

/// Last element
pub struct GetLastFunction;

impl StellarFunction for GetLastFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "GET_LAST",
                "Returns the last element of a list",
                &["input - List"],
                "Last element, or null for an empty list",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(list_arg(self.name(), args, 0)?
            .and_then(<[Value]>::last)
            .cloned()
            .map(Token::new)
            .unwrap_or_default())
    }
}

/// Map lookup with an optional default
pub struct MapGetFunction;

impl StellarFunction for MapGetFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "MAP_GET",
                "Gets the value associated with a key from a map",
                &[
                    "key - The key",
                    "map - The map",
                    "default - Optional value returned when the key is missing",
                ],
                "The value associated with the key, else the default or null",
            )
            .with_arity(2, Some(3))
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let default = args.get(2).cloned().unwrap_or_default();
        let key = args[0].value().cloned().unwrap_or(Value::Null);
        match args::value(args, 1) {
            None => Ok(default),
            Some(Value::Map(map)) => Ok(map.get(&key).cloned().map_or(default, Token::new)),
            Some(other) => Err(FunctionError::argument_type(
                self.name(),
                1,
                "Map",
                other.type_tag(),
            )),
        }
    }
}

/// Key presence test
pub struct MapExistsFunction;

impl StellarFunction for MapExistsFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "MAP_EXISTS",
                "Checks for existence of a key in a map",
                &["key - The key to check", "map - The map"],
                "True if the map contains the key, false otherwise or when called with fewer arguments",
            )
            .with_arity(0, Some(2))
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        if args.len() < 2 {
            return Ok(Token::boolean(false));
        }
        let key = args[0].value().cloned().unwrap_or(Value::Null);
        Ok(Token::boolean(match args::value(args, 1) {
            Some(Value::Map(map)) => map.contains_key(&key),
            _ => false,
        }))
    }
}
