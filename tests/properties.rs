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

//! Property-based tests for language invariants

use proptest::prelude::*;
use std::collections::HashMap;
use stellar::parser::Token as LexToken;
use stellar::registry::{EmptyVariableResolver, FunctionRegistry};
use stellar::{Context, Expression, FailureKind, StellarEngine, TypeTag, Value};

fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,10}".prop_filter("keywords are not identifiers", |s| {
        LexToken::from_keyword(s).is_none()
    })
}

fn arb_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1000i32..=1000).prop_map(|n| n.to_string()),
        (0.0f64..1000.0).prop_map(|f| format!("{f:.2}")),
        "[a-zA-Z0-9_ ]{0,12}".prop_map(|s| format!("'{s}'")),
        Just("true".to_string()),
        Just("false".to_string()),
        Just("null".to_string()),
    ]
}

fn arb_operand() -> impl Strategy<Value = String> {
    prop_oneof![arb_literal(), arb_ident()]
}

fn arb_binop() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("+"),
        Just("-"),
        Just("*"),
        Just("=="),
        Just("!="),
        Just("<"),
        Just(">="),
        Just("and"),
        Just("or"),
    ]
}

fn arb_expression() -> impl Strategy<Value = String> {
    let leaf = arb_operand();
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), arb_binop(), inner.clone())
                .prop_map(|(l, op, r)| format!("({l} {op} {r})")),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, a, b)| format!("({c} ? {a} : {b})")),
            prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|items| format!("[{}]", items.join(", "))),
            inner.prop_map(|e| format!("TO_STRING({e})")),
        ]
    })
}

/// A non-zero numeric operand of one of the four numeric kinds, either as
/// a suffixed literal or as a typed variable
#[derive(Debug, Clone)]
struct NumericOperand {
    kind: TypeTag,
    magnitude: i32,
    literal: bool,
}

impl NumericOperand {
    fn value(&self) -> Value {
        let n = self.magnitude;
        match self.kind {
            TypeTag::Integer => Value::Integer(n),
            TypeTag::Long => Value::Long(i64::from(n)),
            TypeTag::Float => Value::Float(n as f32),
            _ => Value::Double(f64::from(n)),
        }
    }

    fn render(&self, name: &str) -> String {
        if !self.literal {
            return name.to_string();
        }
        let n = self.magnitude;
        match self.kind {
            TypeTag::Integer => n.to_string(),
            TypeTag::Long => format!("{n}L"),
            TypeTag::Float => format!("{n}f"),
            _ => format!("{n}d"),
        }
    }
}

fn arb_numeric_operand() -> impl Strategy<Value = NumericOperand> {
    (
        prop::sample::select(vec![
            TypeTag::Integer,
            TypeTag::Long,
            TypeTag::Float,
            TypeTag::Double,
        ]),
        1i32..1000,
        any::<bool>(),
    )
        .prop_map(|(kind, magnitude, literal)| NumericOperand {
            kind,
            magnitude,
            literal,
        })
}

fn eval(source: &str) -> Value {
    Expression::compile(source)
        .unwrap()
        .evaluate(&EmptyVariableResolver, &FunctionRegistry::standard(), Context::empty())
        .unwrap()
        .into_value()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_compilation_is_deterministic(source in arb_expression()) {
        let first = Expression::compile(&source);
        let second = Expression::compile(&source);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_generated_expressions_compile(source in arb_expression()) {
        prop_assert!(Expression::compile(&source).is_ok(), "{}", source);
    }

    #[test]
    fn test_membership_negation_is_opposite(
        needle in -5i32..5,
        items in prop::collection::vec(-5i32..5, 0..6),
    ) {
        let list = items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        let member = eval(&format!("{needle} in [{list}]"));
        let not_member = eval(&format!("{needle} not in [{list}]"));
        prop_assert_eq!(member, Value::Boolean(items.contains(&needle)));
        prop_assert_eq!(not_member, Value::Boolean(!items.contains(&needle)));
    }

    #[test]
    fn test_substring_membership(haystack in "[a-z]{0,10}", start in 0usize..10, len in 0usize..4) {
        let start = start.min(haystack.len());
        let end = (start + len).min(haystack.len());
        let needle = &haystack[start..end];
        let source = format!("'{needle}' in '{haystack}'");
        prop_assert_eq!(eval(&source), Value::Boolean(true));
    }

    #[test]
    fn test_integer_arithmetic_wraps(a in any::<i32>(), b in any::<i32>()) {
        let source = "a + b * a - b";
        let engine = StellarEngine::new();
        let vars: HashMap<String, Value> =
            [("a".to_string(), Value::Integer(a)), ("b".to_string(), Value::Integer(b))].into();
        let expected = a.wrapping_add(b.wrapping_mul(a)).wrapping_sub(b);
        prop_assert_eq!(engine.evaluate(source, &vars).unwrap(), Value::Integer(expected));
    }

    #[test]
    fn test_arithmetic_result_has_widest_kind(
        left in arb_numeric_operand(),
        right in arb_numeric_operand(),
        op in prop::sample::select(vec!["+", "-", "*", "/"]),
    ) {
        let source = format!("{} {op} {}", left.render("x"), right.render("y"));
        let vars: HashMap<String, Value> =
            [("x".to_string(), left.value()), ("y".to_string(), right.value())].into();
        let result = Expression::compile(&source)
            .unwrap()
            .evaluate(&vars, &FunctionRegistry::standard(), Context::empty())
            .unwrap();
        prop_assert_eq!(result.kind(), left.kind.max(right.kind), "{}", source);
    }

    #[test]
    fn test_ordering_is_consistent(a in any::<i64>(), b in any::<i64>()) {
        let engine = StellarEngine::new();
        let vars: HashMap<String, Value> =
            [("a".to_string(), Value::Long(a)), ("b".to_string(), Value::Long(b))].into();
        let less = engine.evaluate_predicate("a < b", &vars).unwrap();
        let at_least = engine.evaluate_predicate("a >= b", &vars).unwrap();
        prop_assert_eq!(less, a < b);
        prop_assert_ne!(less, at_least);
    }

    #[test]
    fn test_short_circuit_skips_unknown_function(name in "[A-Z]{3,8}_X") {
        let engine = StellarEngine::new();
        for source in [
            format!("true or {name}()"),
            format!("{name}() or true"),
            format!("false and {name}()"),
            format!("{name}() and false"),
        ] {
            prop_assert!(engine.evaluate(&source, &EmptyVariableResolver).is_ok(), "{}", source);
        }
        let err = engine.evaluate(&format!("{name}()"), &EmptyVariableResolver).unwrap_err();
        prop_assert_eq!(err.kind(), FailureKind::FunctionResolution);
    }

    #[test]
    fn test_untaken_branch_is_never_run(condition in any::<bool>(), name in "[A-Z]{3,8}_X") {
        let source = if condition {
            format!("if true then 1 else {name}()")
        } else {
            format!("false ? {name}() : 1")
        };
        prop_assert_eq!(eval(&source), Value::Integer(1));
    }

    #[test]
    fn test_unresolved_variable_is_null(name in arb_ident()) {
        prop_assert_eq!(eval(&name), Value::Null);
        prop_assert_eq!(eval(&format!("{name} == null")), Value::Boolean(true));
        prop_assert_eq!(eval(&format!("exists({name})")), Value::Boolean(false));
    }

    #[test]
    fn test_variables_used_matches_reads(names in prop::collection::hash_set(arb_ident(), 1..5)) {
        let source = format!("[{}]", names.iter().cloned().collect::<Vec<_>>().join(", "));
        let used = StellarEngine::new().variables_used(&source).unwrap();
        prop_assert_eq!(used.len(), names.len());
        for name in &names {
            prop_assert!(used.contains(name));
        }
    }
}
