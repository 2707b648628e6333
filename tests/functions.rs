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

//! Integration tests for the standard function library

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use std::collections::HashMap;
use stellar::model::TIMEZONE;
use stellar::registry::{
    EmptyVariableResolver, FunctionDescriptor, FunctionError, FunctionRegistry,
    validate_descriptors,
};
use stellar::{
    Context, FailureKind, JsonVariableResolver, StellarEngine, StellarError, Token, Value,
};

fn run(source: &str, pairs: &[(&str, Value)]) -> Value {
    let variables: HashMap<String, Value> = pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    StellarEngine::new()
        .evaluate(source, &variables)
        .unwrap_or_else(|e| panic!("'{source}' failed: {e}"))
}

fn run_with(engine: &StellarEngine, source: &str, variables: &HashMap<String, Value>) -> Value {
    engine
        .evaluate(source, variables)
        .unwrap_or_else(|e| panic!("'{source}' failed: {e}"))
}

fn as_f64(value: &Value) -> f64 {
    value
        .as_f64()
        .unwrap_or_else(|| panic!("{value} is not numeric"))
}

#[test]
fn test_every_function_is_documented() {
    let registry = FunctionRegistry::standard();
    let documented = validate_descriptors(&registry).unwrap_or_else(|violations| {
        let report: Vec<String> = violations.iter().map(ToString::to_string).collect();
        panic!("undocumented functions:\n{}", report.join("\n"))
    });
    assert!(documented > 0);
    assert_eq!(documented, registry.len());
}

#[test]
fn test_undocumented_function_is_reported() {
    let mut registry = FunctionRegistry::new();
    registry.register_fn(
        FunctionDescriptor::new("BARE", "", &[], ""),
        |_args, _context| Ok(Token::null()),
    );
    let violations = validate_descriptors(&registry).unwrap_err();
    assert!(violations.iter().all(|v| v.function == "BARE"));
    assert!(!violations.is_empty());
}

#[test]
fn test_engine_lists_functions_sorted() {
    let names: Vec<String> = StellarEngine::new()
        .functions()
        .into_iter()
        .map(|descriptor| descriptor.name)
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    for expected in ["TO_UPPER", "MAP_GET", "IN_SUBNET", "TO_EPOCH_TIMESTAMP", "STATS_ADD"] {
        assert!(names.iter().any(|name| name == expected), "{expected} missing");
    }
}

#[test]
fn test_custom_function_registration() {
    let mut registry = FunctionRegistry::standard();
    registry.register_fn(
        FunctionDescriptor::new(
            "DOUBLE_IT",
            "Doubles a number",
            &["n - The number to double"],
            "Twice the input",
        )
        .with_arity(1, Some(1)),
        |args, _context| {
            Ok(match args[0].as_i64() {
                Some(n) => Token::from(n * 2),
                None => Token::null(),
            })
        },
    );
    let engine = StellarEngine::new().with_functions(std::sync::Arc::new(registry));
    assert_eq!(
        engine.evaluate("DOUBLE_IT(21)", &EmptyVariableResolver).unwrap(),
        Value::Long(42)
    );
    let err = engine.evaluate("DOUBLE_IT(1, 2)", &EmptyVariableResolver).unwrap_err();
    assert!(matches!(
        err,
        StellarError::Function(FunctionError::InvalidArity { .. })
    ));
    assert_eq!(err.kind(), FailureKind::Function);
}

#[rstest]
#[case("TO_UPPER(TRIM(foo))", Value::from("CASEY"))]
#[case("LENGTH(foo)", Value::Integer(6))]
#[case("JOIN( [ TO_UPPER(TRIM(foo)), 'bar' ], ',')", Value::from("CASEY,bar"))]
#[case("JOIN( SPLIT(pair, ':'), ',')", Value::from("casey,bar"))]
#[case("LENGTH(missing)", Value::Integer(0))]
#[case("LENGTH('')", Value::Integer(0))]
#[case("LENGTH([1, 2, 3, 4, 5])", Value::Integer(5))]
#[case("LENGTH([])", Value::Integer(0))]
#[case("REGEXP_MATCH(pair, '^ca.*:bar$')", Value::Boolean(true))]
#[case("STARTS_WITH(missing, 'ca')", Value::Boolean(false))]
fn test_string_functions(#[case] source: &str, #[case] expected: Value) {
    let vars = [("foo", Value::from("casey ")), ("pair", Value::from("casey:bar"))];
    assert_eq!(run(source, &vars), expected);
}

#[test]
fn test_map_get_with_default() {
    let query = "MAP_GET(dc, dc2tz, 'UTC')";
    let la = Value::map([(Value::from("la"), Value::from("PST"))]);
    let nyc = Value::map([(Value::from("nyc"), Value::from("EST"))]);
    assert_eq!(
        run(query, &[("dc", Value::from("nyc")), ("dc2tz", la)]),
        Value::from("UTC")
    );
    assert_eq!(
        run(query, &[("dc", Value::from("nyc")), ("dc2tz", nyc)]),
        Value::from("EST")
    );
}

#[test]
fn test_map_exists() {
    let my_map = Value::map([(Value::from("casey"), Value::from("apple"))]);
    assert_eq!(
        run(
            "MAP_EXISTS(foo, myMap)",
            &[("foo", Value::from("casey")), ("myMap", my_map)]
        ),
        Value::Boolean(true)
    );
}

#[rstest]
#[case("GET_FIRST(SPLIT(host, '.'))", "www")]
#[case("GET(SPLIT(host, '.'), 0)", "www")]
#[case("GET_LAST(SPLIT(host, '.'))", "uk")]
#[case("GET(SPLIT(host, '.'), 1)", "google")]
fn test_list_access(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(
        run(source, &[("host", Value::from("www.google.co.uk"))]),
        Value::from(expected)
    );
}

#[rstest]
#[case("URL_TO_HOST(foo)", Value::from("www.google.co.uk"))]
#[case("URL_TO_PORT(foo)", Value::Integer(80))]
#[case("URL_TO_PROTOCOL(foo)", Value::from("http"))]
#[case("URL_TO_PATH(foo)", Value::from("/my/path"))]
fn test_url_functions(#[case] source: &str, #[case] expected: Value) {
    assert_eq!(
        run(source, &[("foo", Value::from("http://www.google.co.uk/my/path"))]),
        expected
    );
}

#[test]
fn test_protocol_to_name() {
    let query = "PROTOCOL_TO_NAME(protocol)";
    assert_eq!(run(query, &[("protocol", Value::from("6"))]), Value::from("TCP"));
    assert_eq!(run(query, &[("protocol", Value::Integer(6))]), Value::from("TCP"));
    assert_eq!(run(query, &[("foo", Value::Integer(6))]), Value::Null);
    assert_eq!(
        run(query, &[("protocol", Value::from("chicken"))]),
        Value::from("chicken")
    );
}

#[rstest]
#[case("IN_SUBNET(ip, '192.168.0.0/24')", true)]
#[case("IN_SUBNET(ip, '192.168.0.0/24', '11.0.0.0/24')", true)]
#[case("IN_SUBNET(ip, '192.168.0.0/24', '11.0.0.0/24') in [true]", true)]
#[case("IN_SUBNET(ip_dst_addr, '192.168.0.0/24', '11.0.0.0/24')", false)]
#[case("IN_SUBNET(other_ip, '192.168.0.0/24')", false)]
#[case("IN_SUBNET(blah, '192.168.0.0/24')", false)]
#[case("true and STARTS_WITH(foo, 'ca')", true)]
#[case("true and STARTS_WITH(TO_UPPER(foo), 'CA')", true)]
#[case("(true and STARTS_WITH(TO_UPPER(foo), 'CA')) || true", true)]
#[case("true and ENDS_WITH(foo, 'sey')", true)]
#[case("not(IN_SUBNET(ip_src_addr, '192.168.0.0/24') and IN_SUBNET(ip_dst_addr, '192.168.0.0/24'))", true)]
#[case("IN_SUBNET(ip_src_addr, '192.168.0.0/24')", true)]
#[case("not(IN_SUBNET(ip_src_addr, '192.168.0.0/24'))", false)]
#[case("IN_SUBNET(ip_dst_addr, '192.168.0.0/24')", false)]
#[case("not(IN_SUBNET(ip_dst_addr, '192.168.0.0/24'))", true)]
fn test_logical_functions(#[case] source: &str, #[case] expected: bool) {
    let event = json!({
        "foo": "casey",
        "ip": "192.168.0.1",
        "ip_src_addr": "192.168.0.1",
        "ip_dst_addr": "10.0.0.1",
        "other_ip": "10.168.0.1",
        "empty": "",
        "spaced": "stellar is great",
    });
    let variables = JsonVariableResolver::new(&event);
    assert_eq!(
        StellarEngine::new().evaluate_predicate(source, &variables).unwrap(),
        expected
    );
}

#[test]
fn test_invalid_cidr() {
    let err = StellarEngine::new()
        .evaluate("IN_SUBNET('10.0.0.1', 'not-a-cidr')", &EmptyVariableResolver)
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Function);
}

#[rstest]
#[case("TO_STRING(foo)", Value::Integer(5), Value::from("5"))]
#[case("TO_INTEGER(foo)", Value::from("5"), Value::Integer(5))]
#[case("TO_INTEGER(foo)", Value::Integer(5), Value::Integer(5))]
#[case("TO_DOUBLE(foo)", Value::Double(5.1), Value::Double(5.1))]
#[case("TO_DOUBLE(foo)", Value::from("5.1"), Value::Double(5.1))]
#[case("TO_LONG(foo)", Value::from("5"), Value::Long(5))]
#[case("TO_INTEGER(foo)", Value::from("five"), Value::Null)]
fn test_conversions(#[case] source: &str, #[case] input: Value, #[case] expected: Value) {
    assert_eq!(run(source, &[("foo", input)]), expected);
}

#[test]
fn test_date_conversion() {
    let expected = 1_452_013_350_000_i64;
    let vars = [("foo", Value::from("2016-01-05 17:02:30"))];
    assert_eq!(
        run("TO_EPOCH_TIMESTAMP(foo, 'yyyy-MM-dd HH:mm:ss', 'UTC')", &vars),
        Value::Long(expected)
    );

    let local = run("TO_EPOCH_TIMESTAMP(foo, 'yyyy-MM-dd HH:mm:ss')", &vars);
    let local = local.as_i64().unwrap_or_else(|| panic!("{local} is not a long"));
    assert!((local - expected).abs() < 86_400_000);
}

#[test]
fn test_date_conversion_uses_context_timezone() {
    let engine = StellarEngine::new()
        .with_context(Context::builder().with(TIMEZONE, "+02:00").build());
    let vars: HashMap<String, Value> =
        [("foo".to_string(), Value::from("2016-01-05 19:02:30"))].into();
    assert_eq!(
        run_with(&engine, "TO_EPOCH_TIMESTAMP(foo, 'yyyy-MM-dd HH:mm:ss')", &vars),
        Value::Long(1_452_013_350_000)
    );
}

fn seven_values(window: i32) -> (StellarEngine, HashMap<String, Value>) {
    let engine = StellarEngine::new();
    let mut vars = HashMap::new();
    let stats = run_with(&engine, &format!("STATS_INIT({window})"), &vars);
    assert!(!stats.is_null());
    vars.insert("stats".to_string(), stats);
    for value in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0] {
        run_with(&engine, &format!("STATS_ADD(stats, {value:.1})"), &vars);
    }
    (engine, vars)
}

#[rstest]
#[case(0)]
#[case(100)]
fn test_statistics_summary(#[case] window: i32) {
    let (engine, vars) = seven_values(window);
    let query = |name: &str| run_with(&engine, &format!("{name}(stats)"), &vars);

    assert_eq!(query("STATS_COUNT"), Value::Long(7));
    assert!((as_f64(&query("STATS_SUM")) - 280.0).abs() < 1e-9);
    assert!((as_f64(&query("STATS_MEAN")) - 40.0).abs() < 1e-9);
    assert!((as_f64(&query("STATS_MIN")) - 10.0).abs() < 1e-9);
    assert!((as_f64(&query("STATS_MAX")) - 70.0).abs() < 1e-9);
    assert!((as_f64(&query("STATS_VARIANCE")) - 2800.0 / 6.0).abs() < 1e-6);
    assert!((as_f64(&query("STATS_SD")) - (2800.0_f64 / 6.0).sqrt()).abs() < 1e-6);
}

#[rstest]
#[case(0, "STATS_ADD(stats, 10, 20, 30, 40, 50)")]
#[case(100, "STATS_ADD(stats, 10, 20, 30, 40, 50)")]
#[case(0, "STATS_ADD(stats, 10.0, 20.0, 30.0, 40.0, 50.0)")]
#[case(100, "STATS_ADD(stats, 10.0, 20.0, 30.0, 40.0, 50.0)")]
fn test_statistics_add_many(#[case] window: i32, #[case] source: &str) {
    let (engine, vars) = seven_values(window);
    run_with(&engine, source, &vars);
    assert_eq!(run_with(&engine, "STATS_COUNT(stats)", &vars), Value::Long(12));
}

#[test]
fn test_statistics_window_keeps_recent_values() {
    let (engine, vars) = seven_values(3);
    assert_eq!(run_with(&engine, "STATS_COUNT(stats)", &vars), Value::Long(3));
    assert!((as_f64(&run_with(&engine, "STATS_MEAN(stats)", &vars)) - 60.0).abs() < 1e-9);
}

#[test]
fn test_statistics_merge() {
    let engine = StellarEngine::new();
    let mut vars = HashMap::new();
    vars.insert(
        "a".to_string(),
        run_with(&engine, "STATS_ADD(STATS_INIT(), 1, 2, 3)", &vars),
    );
    vars.insert(
        "b".to_string(),
        run_with(&engine, "STATS_ADD(null, 4, 5)", &vars),
    );
    assert_eq!(
        run_with(&engine, "STATS_COUNT(STATS_MERGE([a, b]))", &vars),
        Value::Long(5)
    );
    assert!((as_f64(&run_with(&engine, "STATS_MEAN(STATS_MERGE([a, b]))", &vars)) - 3.0).abs() < 1e-9);
}

#[test]
fn test_statistics_overflow() {
    let err = StellarEngine::new()
        .evaluate("STATS_ADD(STATS_INIT(), 1.7976931348623157e308)", &EmptyVariableResolver)
        .unwrap_err();
    assert!(matches!(err, StellarError::Function(FunctionError::State { .. })));
}

#[test]
fn test_statistics_of_missing_value() {
    assert_eq!(run("STATS_MEAN(missing)", &[]), Value::Null);
}
