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

//! String manipulation functions

use crate::model::{Context, Token, Value};
use crate::registry::function::{
    FunctionDescriptor, FunctionError, FunctionResult, StellarFunction, args,
};
use dashmap::DashMap;
use regex::Regex;
use std::sync::LazyLock;

const REGEX_CACHE_LIMIT: usize = 256;

static REGEX_CACHE: LazyLock<DashMap<String, Regex>> = LazyLock::new(DashMap::new);

/// Upper-cases a string
pub struct ToUpperFunction;

impl StellarFunction for ToUpperFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "TO_UPPER",
                "Transforms the first argument to an uppercase string",
                &["input - String"],
                "Uppercase string, or null when the input is null",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(args::string(self.name(), args, 0)?
            .map(|s| Token::from(s.to_uppercase()))
            .unwrap_or_default())
    }
}

/// Lower-cases a string
pub struct ToLowerFunction;

impl StellarFunction for ToLowerFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "TO_LOWER",
                "Transforms the first argument to a lowercase string",
                &["input - String"],
                "Lowercase string, or null when the input is null",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(args::string(self.name(), args, 0)?
            .map(|s| Token::from(s.to_lowercase()))
            .unwrap_or_default())
    }
}

/// Strips surrounding whitespace
pub struct TrimFunction;

impl StellarFunction for TrimFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "TRIM",
                "Trims whitespace from both sides of a string",
                &["input - String"],
                "String without leading or trailing whitespace",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        Ok(args::string(self.name(), args, 0)?
            .map(|s| Token::from(s.trim()))
            .unwrap_or_default())
    }
}

/// Prefix test
pub struct StartsWithFunction;

impl StellarFunction for StartsWithFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "STARTS_WITH",
                "Determines whether a string starts with a prefix",
                &["string - The string to test", "prefix - The prefix"],
                "True if the string starts with the prefix, false otherwise",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let input = args::string(self.name(), args, 0)?;
        let prefix = args::string(self.name(), args, 1)?;
        Ok(Token::boolean(match (input, prefix) {
            (Some(input), Some(prefix)) => input.starts_with(prefix),
            _ => false,
        }))
    }
}

/// Suffix test
pub struct EndsWithFunction;

impl StellarFunction for EndsWithFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "ENDS_WITH",
                "Determines whether a string ends with a suffix",
                &["string - The string to test", "suffix - The suffix"],
                "True if the string ends with the suffix, false otherwise",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let input = args::string(self.name(), args, 0)?;
        let suffix = args::string(self.name(), args, 1)?;
        Ok(Token::boolean(match (input, suffix) {
            (Some(input), Some(suffix)) => input.ends_with(suffix),
            _ => false,
        }))
    }
}

/// Joins list elements with a separator
pub struct JoinFunction;

impl StellarFunction for JoinFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "JOIN",
                "Joins the components of the list with the specified delimiter",
                &["list - List of values", "delim - String delimiter"],
                "String of the non-null elements joined by the delimiter",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let separator = args::string(self.name(), args, 1)?.unwrap_or("");
        match args::value(args, 0) {
            None => Ok(Token::null()),
            Some(Value::List(items)) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(ToString::to_string)
                    .collect();
                Ok(Token::from(parts.join(separator)))
            }
            Some(other) => Err(FunctionError::argument_type(
                self.name(),
                0,
                "List",
                other.type_tag(),
            )),
        }
    }
}

/// Splits a string on a literal delimiter
pub struct SplitFunction;

impl StellarFunction for SplitFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "SPLIT",
                "Splits the string by the delimiter",
                &["input - String to split", "delim - String delimiter"],
                "List of strings",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let Some(input) = args::string(self.name(), args, 0)? else {
            return Ok(Token::null());
        };
        let parts: Vec<Value> = match args::string(self.name(), args, 1)? {
            Some(separator) if !separator.is_empty() => {
                input.split(separator).map(Value::from).collect()
            }
            _ => vec![Value::from(input)],
        };
        Ok(Token::new(Value::List(parts)))
    }
}

/// Regular expression search
pub struct RegexpMatchFunction;

impl RegexpMatchFunction {
    fn compiled(&self, pattern: &str) -> FunctionResult<Regex> {
        if let Some(regex) = REGEX_CACHE.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|e| {
            FunctionError::evaluation(self.name(), format!("invalid pattern '{pattern}': {e}"))
        })?;
        if REGEX_CACHE.len() >= REGEX_CACHE_LIMIT {
            REGEX_CACHE.clear();
        }
        REGEX_CACHE.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

impl StellarFunction for RegexpMatchFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "REGEXP_MATCH",
                "Determines whether a regex matches anywhere in a string",
                &["string - The string to test", "pattern - The regex pattern"],
                "True if the pattern matches, false otherwise",
            )
        });
        &SIG
    }

    fn apply(&self, args: &[Token], _context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let input = args::string(self.name(), args, 0)?;
        let pattern = args::string(self.name(), args, 1)?;
        match (input, pattern) {
            (Some(input), Some(pattern)) => {
                Ok(Token::boolean(self.compiled(pattern)?.is_match(input)))
            }
            _ => Ok(Token::boolean(false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(function: &dyn StellarFunction, args: &[Token]) -> FunctionResult<Token> {
        function.apply(args, Context::empty())
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(
            call(&ToUpperFunction, &["casey".into()]).unwrap(),
            Token::from("CASEY")
        );
        assert_eq!(
            call(&ToLowerFunction, &["CaSeY".into()]).unwrap(),
            Token::from("casey")
        );
        assert_eq!(
            call(&TrimFunction, &[" casey ".into()]).unwrap(),
            Token::from("casey")
        );
        assert!(call(&ToUpperFunction, &[Token::null()]).unwrap().is_null());
        assert!(matches!(
            call(&ToUpperFunction, &[5.into()]),
            Err(FunctionError::InvalidArgumentType { index: 0, .. })
        ));
    }

    #[test]
    fn test_prefix_suffix() {
        assert_eq!(
            call(&StartsWithFunction, &["casey".into(), "case".into()]).unwrap(),
            Token::boolean(true)
        );
        assert_eq!(
            call(&EndsWithFunction, &["casey".into(), "sey".into()]).unwrap(),
            Token::boolean(true)
        );
        assert_eq!(
            call(&StartsWithFunction, &[Token::null(), "case".into()]).unwrap(),
            Token::boolean(false)
        );
    }

    #[test]
    fn test_join_and_split() {
        let split = call(&SplitFunction, &["casey:bar".into(), ":".into()]).unwrap();
        assert_eq!(
            split.value(),
            Some(&Value::list([Value::from("casey"), Value::from("bar")]))
        );
        let joined = call(&JoinFunction, &[split, ",".into()]).unwrap();
        assert_eq!(joined, Token::from("casey,bar"));

        let mixed = Token::new(Value::list([Value::from("a"), Value::Null, Value::from(2)]));
        assert_eq!(
            call(&JoinFunction, &[mixed, "-".into()]).unwrap(),
            Token::from("a-2")
        );
    }

    #[test]
    fn test_regexp_match() {
        assert_eq!(
            call(&RegexpMatchFunction, &["host-42".into(), r"\d+$".into()]).unwrap(),
            Token::boolean(true)
        );
        assert_eq!(
            call(&RegexpMatchFunction, &["host".into(), r"\d+$".into()]).unwrap(),
            Token::boolean(false)
        );
        assert!(matches!(
            call(&RegexpMatchFunction, &["x".into(), "(".into()]),
            Err(FunctionError::Evaluation { .. })
        ));
    }
}
