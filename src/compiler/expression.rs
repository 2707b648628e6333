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

//! Compiled expressions and their execution

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::compiler::Compiler;
use super::operation::Operation;
use crate::ast::LogicalOp;
use crate::error::{Result, StellarError};
use crate::evaluator::{
    ArithmeticEvaluator, ComparisonEvaluator, MembershipEvaluator, truthiness,
};
use crate::model::{Context, Token, Value};
use crate::registry::{FunctionResolver, VariableResolver};

/// The immutable, reusable compiled form of one source string
///
/// An expression references no external state, so one instance can be
/// evaluated concurrently by any number of threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: Arc<str>,
    operations: Vec<Operation>,
}

impl Expression {
    pub(crate) fn new(source: &str, operations: Vec<Operation>) -> Self {
        Self {
            source: Arc::from(source),
            operations,
        }
    }

    /// Parse and compile source text
    pub fn compile(source: &str) -> Result<Self> {
        Compiler::compile(source)
    }

    /// Source text this expression was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Top-level operations
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Evaluate against one set of bindings
    pub fn evaluate(
        &self,
        variables: &dyn VariableResolver,
        functions: &dyn FunctionResolver,
        context: &Context,
    ) -> Result<Token> {
        let state = ExecutionState::new(variables, functions, context);
        let mut stack = Vec::with_capacity(8);
        state.execute(&self.operations, &mut stack)?;

        debug_assert_eq!(
            stack.len(),
            1,
            "expression '{}' left {} values on the stack",
            self.source,
            stack.len()
        );
        match (stack.pop(), stack.is_empty()) {
            (Some(result), true) => Ok(result),
            _ => Err(StellarError::Internal(format!(
                "expression '{}' did not leave exactly one value on the stack",
                self.source
            ))),
        }
    }

    /// Every variable name the expression can read, across all branches
    pub fn variables_used(&self) -> FxHashSet<String> {
        let mut names = FxHashSet::default();
        Operation::collect_variables(&self.operations, &mut names);
        names
    }

    /// Every function name the expression can call, across all branches
    pub fn functions_used(&self) -> FxHashSet<String> {
        let mut names = FxHashSet::default();
        Operation::collect_functions(&self.operations, &mut names);
        names
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Per-evaluation state: the resolvers and context of one call
pub struct ExecutionState<'a> {
    context: &'a Context,
    functions: &'a dyn FunctionResolver,
    variables: &'a dyn VariableResolver,
}

impl<'a> ExecutionState<'a> {
    /// Bundle the resolvers for one evaluation
    pub fn new(
        variables: &'a dyn VariableResolver,
        functions: &'a dyn FunctionResolver,
        context: &'a Context,
    ) -> Self {
        Self {
            context,
            functions,
            variables,
        }
    }

    /// Run operations in order against `stack`
    pub fn execute(&self, operations: &[Operation], stack: &mut Vec<Token>) -> Result<()> {
        for operation in operations {
            self.step(operation, stack)?;
        }
        Ok(())
    }

    fn step(&self, operation: &Operation, stack: &mut Vec<Token>) -> Result<()> {
        match operation {
            Operation::Push(token) => stack.push(token.clone()),
            Operation::Variable(name) => {
                let token = self.variables.resolve(name).unwrap_or_else(|| {
                    log::trace!("Variable '{name}' is not resolved, using null");
                    Token::null()
                });
                stack.push(token);
            }
            Operation::Exists(name) => {
                let exists = self
                    .variables
                    .resolve(name)
                    .is_some_and(|token| !token.is_null());
                stack.push(Token::boolean(exists));
            }
            Operation::Arithmetic(op) => {
                let (left, right) = pop_pair(stack)?;
                stack.push(ArithmeticEvaluator::evaluate(*op, &left, &right)?);
            }
            Operation::Comparison(op) => {
                let (left, right) = pop_pair(stack)?;
                stack.push(ComparisonEvaluator::evaluate(*op, &left, &right)?);
            }
            Operation::Membership { negated } => {
                let (needle, container) = pop_pair(stack)?;
                let member = MembershipEvaluator::evaluate(&needle, &container)?;
                stack.push(Token::boolean(member != *negated));
            }
            Operation::Not => {
                let operand = pop(stack)?;
                stack.push(Token::boolean(!truthiness(&operand, "not")?));
            }
            Operation::Call { name, arity } => {
                let args = pop_n(stack, *arity)?;
                stack.push(self.call(name, &args)?);
            }
            Operation::List(count) => {
                let elements = pop_n(stack, *count)?;
                let list = elements.into_iter().map(Token::into_value).collect();
                stack.push(Token::new(Value::List(list)));
            }
            Operation::Map(count) => {
                let flat = pop_n(stack, count * 2)?;
                let mut entries = IndexMap::with_capacity(*count);
                let mut iter = flat.into_iter().map(Token::into_value);
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    entries.insert(key, value);
                }
                stack.push(Token::new(Value::Map(entries)));
            }
            Operation::Logical { op, left, right } => {
                let result = self.logical(*op, left, right, stack)?;
                stack.push(Token::boolean(result));
            }
            Operation::Branch {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.evaluate_operand(condition, stack)?;
                if truthiness(&condition, "if")? {
                    self.execute(then, stack)?;
                } else {
                    self.execute(otherwise, stack)?;
                }
            }
        }
        Ok(())
    }

    fn logical(
        &self,
        op: LogicalOp,
        left: &[Operation],
        right: &[Operation],
        stack: &mut Vec<Token>,
    ) -> Result<bool> {
        let decisive = op.decisive();
        if Operation::boolean_literal(left) == Some(decisive)
            || Operation::boolean_literal(right) == Some(decisive)
        {
            return Ok(decisive);
        }
        let operator = op.symbol();
        let left = truthiness(&self.evaluate_operand(left, stack)?, operator)?;
        if left == decisive {
            return Ok(decisive);
        }
        truthiness(&self.evaluate_operand(right, stack)?, operator)
    }

    /// Run a nested operand list and take the single value it produces
    fn evaluate_operand(&self, operations: &[Operation], stack: &mut Vec<Token>) -> Result<Token> {
        let depth = stack.len();
        self.execute(operations, stack)?;
        if stack.len() != depth + 1 {
            return Err(StellarError::Internal(format!(
                "operand produced {} values instead of one",
                stack.len().saturating_sub(depth)
            )));
        }
        pop(stack)
    }

    fn call(&self, name: &str, args: &[Token]) -> Result<Token> {
        let function = self.functions.resolve(name).ok_or_else(|| {
            StellarError::FunctionResolution {
                name: name.to_string(),
            }
        })?;
        log::trace!("Calling {name} with {} arguments", args.len());
        function.validate_args(args)?;
        Ok(function.apply(args, self.context)?)
    }
}

impl fmt::Debug for ExecutionState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionState")
            .field("context", self.context)
            .finish_non_exhaustive()
    }
}

fn pop(stack: &mut Vec<Token>) -> Result<Token> {
    stack
        .pop()
        .ok_or_else(|| StellarError::Internal("evaluation stack underflow".to_string()))
}

fn pop_pair(stack: &mut Vec<Token>) -> Result<(Token, Token)> {
    let right = pop(stack)?;
    let left = pop(stack)?;
    Ok((left, right))
}

/// Pop `count` values, returned in push order
fn pop_n(stack: &mut Vec<Token>, count: usize) -> Result<SmallVec<[Token; 4]>> {
    let start = stack
        .len()
        .checked_sub(count)
        .ok_or_else(|| StellarError::Internal("evaluation stack underflow".to_string()))?;
    Ok(stack.drain(start..).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        EmptyVariableResolver, FunctionDescriptor, FunctionError, FunctionRegistry,
    };
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run(source: &str) -> Result<Token> {
        Expression::compile(source)?.evaluate(
            &EmptyVariableResolver,
            &FunctionRegistry::standard(),
            Context::empty(),
        )
    }

    fn counting_registry(calls: Arc<AtomicUsize>) -> FunctionRegistry {
        let mut registry = FunctionRegistry::standard();
        registry.register_fn(
            FunctionDescriptor::new("COUNT_CALL", "Counts its calls", &[], "true")
                .with_arity(0, Some(0)),
            move |_args, _context| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Token::boolean(true))
            },
        );
        registry.register_fn(
            FunctionDescriptor::new("FAIL", "Always fails", &[], "never returns")
                .with_arity(0, None),
            |_args, _context| Err(FunctionError::evaluation("FAIL", "boom")),
        );
        registry
    }

    #[test]
    fn test_literals() {
        assert_eq!(run("1 + 2").unwrap(), Token::from(3));
        assert_eq!(run("'abc'").unwrap(), Token::from("abc"));
        assert_eq!(run("null").unwrap(), Token::null());
        assert_eq!(
            run("[1, 'a']").unwrap().into_value(),
            Value::list([Value::Integer(1), Value::from("a")])
        );
        assert_eq!(
            run("{'a' : 1, 'b' : 2}").unwrap().into_value(),
            Value::map([
                (Value::from("a"), Value::Integer(1)),
                (Value::from("b"), Value::Integer(2)),
            ])
        );
    }

    #[test]
    fn test_variables_and_exists() {
        let mut vars: HashMap<String, Value> = HashMap::new();
        vars.insert("foo".into(), Value::from("casey"));
        vars.insert("empty".into(), Value::Null);
        let functions = FunctionRegistry::standard();
        let eval = |source: &str| {
            Expression::compile(source)
                .unwrap()
                .evaluate(&vars, &functions, Context::empty())
                .unwrap()
        };
        assert_eq!(eval("foo"), Token::from("casey"));
        assert_eq!(eval("missing"), Token::null());
        assert_eq!(eval("exists(foo)"), Token::boolean(true));
        assert_eq!(eval("exists(empty)"), Token::boolean(false));
        assert_eq!(eval("exists(missing)"), Token::boolean(false));
    }

    #[test]
    fn test_short_circuit_skips_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(calls.clone());
        for source in ["true or COUNT_CALL()", "COUNT_CALL() or true", "false and COUNT_CALL()"] {
            Expression::compile(source)
                .unwrap()
                .evaluate(&EmptyVariableResolver, &registry, Context::empty())
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let result = Expression::compile("COUNT_CALL() and COUNT_CALL()")
            .unwrap()
            .evaluate(&EmptyVariableResolver, &registry, Context::empty())
            .unwrap();
        assert_eq!(result, Token::boolean(true));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_untaken_branch_never_runs() {
        let registry = counting_registry(Arc::new(AtomicUsize::new(0)));
        let eval = |source: &str| {
            Expression::compile(source)
                .unwrap()
                .evaluate(&EmptyVariableResolver, &registry, Context::empty())
        };
        assert_eq!(eval("true ? 1 : FAIL()").unwrap(), Token::from(1));
        assert_eq!(eval("if false then FAIL() else 2").unwrap(), Token::from(2));
        assert!(matches!(
            eval("if true then FAIL() else 2"),
            Err(StellarError::Function(_))
        ));
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            run("NO_SUCH_FUNCTION(1)"),
            Err(StellarError::FunctionResolution {
                name: "NO_SUCH_FUNCTION".to_string()
            })
        );
    }

    #[test]
    fn test_boolean_contexts() {
        assert_eq!(run("not null").unwrap(), Token::boolean(true));
        assert_eq!(run("null ? 1 : 2").unwrap(), Token::from(2));
        assert!(matches!(run("not 'x'"), Err(StellarError::TypeMismatch { .. })));
        assert!(matches!(run("1 and true"), Err(StellarError::TypeMismatch { .. })));
    }

    #[test]
    fn test_membership_negation() {
        assert_eq!(run("1 in [1, 2]").unwrap(), Token::boolean(true));
        assert_eq!(run("3 not in [1, 2]").unwrap(), Token::boolean(true));
        assert_eq!(run("'ab' in 'cabd'").unwrap(), Token::boolean(true));
    }

    #[test]
    fn test_used_names_cover_both_branches() {
        let expression =
            Expression::compile("a == 1 ? TO_UPPER(b) : MAP_GET(c, {'x' : d})").unwrap();
        let mut variables: Vec<String> = expression.variables_used().into_iter().collect();
        variables.sort();
        assert_eq!(variables, vec!["a", "b", "c", "d"]);
        let mut functions: Vec<String> = expression.functions_used().into_iter().collect();
        functions.sort();
        assert_eq!(functions, vec!["MAP_GET", "TO_UPPER"]);
    }

    #[test]
    fn test_expression_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expression>();
    }
}
