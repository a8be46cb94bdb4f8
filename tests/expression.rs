//! Parsing and evaluation of condition expressions.
mod common;
use common::*;
use nagare::compiler::compile;
use nagare::config::EvaluationConfig;
use nagare::interpreter::evaluate_source;
use nagare::prelude::*;
use std::collections::BTreeSet;

fn eval(source: &str, inputs: &Payload) -> std::result::Result<Evaluation, EvaluationError> {
    let condition = compile(source).expect("condition should parse");
    evaluate(&condition.expression, inputs)
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn test_display_round_trips_simple_condition() {
        let condition = compile("input.value > 10").unwrap();
        assert_eq!(condition.to_string(), "input.value > 10");
        assert_eq!(condition.source, "input.value > 10");
    }

    #[test]
    fn test_display_keeps_needed_parentheses_only() {
        assert_eq!(compile("(1 + 2) * 3").unwrap().to_string(), "(1 + 2) * 3");
        assert_eq!(compile("1 + (2 * 3)").unwrap().to_string(), "1 + 2 * 3");
        assert_eq!(compile("1 - (2 - 3)").unwrap().to_string(), "1 - (2 - 3)");
        assert_eq!(
            compile("a - b - c").unwrap().to_string(),
            "input.a - input.b - input.c"
        );
    }

    #[test]
    fn test_strict_equality_is_accepted() {
        let strict = compile("input.role === 'admin'").unwrap();
        let loose = compile("input.role == \"admin\"").unwrap();
        assert_eq!(strict.expression, loose.expression);
        assert_eq!(
            compile("input.role !== 'x'").unwrap().expression,
            compile("input.role != 'x'").unwrap().expression
        );
    }

    #[test]
    fn test_input_roots_are_interchangeable() {
        let a = compile("input.value").unwrap().expression;
        let b = compile("inputs.value").unwrap().expression;
        let c = compile("data['value']").unwrap().expression;
        let d = compile("value").unwrap().expression;
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
    }

    #[test]
    fn test_required_inputs_lists_top_level_keys() {
        let condition =
            compile(r#"input.a.b > 1 && tags.includes("x") || data["c d"][0] == len(input.a)"#)
                .unwrap();
        let expected: BTreeSet<String> = ["a", "c d", "tags"].iter().map(|s| s.to_string()).collect();
        assert_eq!(condition.required_inputs(), expected);
    }

    #[test]
    fn test_length_property_becomes_call() {
        let condition = compile("input.items.length >= 2").unwrap();
        assert_eq!(condition.to_string(), "len(input.items) >= 2");
    }

    #[test]
    fn test_empty_condition_is_rejected() {
        assert_eq!(compile("").unwrap_err(), ParseError::Empty);
        assert_eq!(compile("   ").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_dangling_operator_is_rejected() {
        let err = compile("input.value >").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }), "{:?}", err);
    }

    #[test]
    fn test_unexpected_character_reports_position() {
        let err = compile("input.value @ 3").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedChar {
                found: '@',
                position: 12
            }
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            compile("input.name == \"abc").unwrap_err(),
            ParseError::UnterminatedString(14)
        );
    }

    #[test]
    fn test_unknown_function_is_rejected() {
        let err = compile("fetch('http://example.com')").unwrap_err();
        assert!(
            matches!(&err, ParseError::UnknownFunction { name, .. } if name == "fetch"),
            "{:?}",
            err
        );
        let err = compile("input.name.constructor('x')").unwrap_err();
        assert!(matches!(err, ParseError::UnknownFunction { .. }));
    }

    #[test]
    fn test_wrong_argument_count() {
        assert_eq!(
            compile("input.tags.includes()").unwrap_err(),
            ParseError::ArgumentCount {
                name: "includes".to_string(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_property_access_on_literal_is_rejected() {
        assert!(compile("'abc'.foo").is_err());
        assert!(compile("(1 + 2)[0]").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let compiler = Compiler::new(&EvaluationConfig {
            max_expression_length: 2048,
            max_depth: 4,
        });
        assert_eq!(
            compiler.compile("((((((1))))))").unwrap_err(),
            ParseError::TooDeep(4)
        );
        assert!(compiler.compile("(1)").is_ok());
    }

    #[test]
    fn test_long_operator_chains_hit_the_nesting_limit() {
        let sum = vec!["1"; 1000].join("+");
        assert!(sum.len() < 2048);
        assert_eq!(
            Compiler::default().compile(&sum).unwrap_err(),
            ParseError::TooDeep(64)
        );

        let conjunction = vec!["input.ok"; 100].join(" && ");
        assert_eq!(
            Compiler::default().compile(&conjunction).unwrap_err(),
            ParseError::TooDeep(64)
        );

        let trims = format!("input.name{}", ".trim()".repeat(80));
        assert_eq!(
            Compiler::default().compile(&trims).unwrap_err(),
            ParseError::TooDeep(64)
        );
    }

    #[test]
    fn test_chains_within_the_limit_still_parse() {
        let compiler = Compiler::new(&EvaluationConfig {
            max_expression_length: 2048,
            max_depth: 4,
        });
        assert!(compiler.compile("1 + 2 + 3").is_ok());
        assert_eq!(
            compiler.compile("1 + 2 + 3 + 4 + 5").unwrap_err(),
            ParseError::TooDeep(4)
        );
        assert!(Compiler::default().compile(&vec!["1"; 40].join("+")).is_ok());
    }

    #[test]
    fn test_length_limit() {
        let compiler = Compiler::new(&EvaluationConfig {
            max_expression_length: 10,
            max_depth: 64,
        });
        assert_eq!(
            compiler.compile("input.value > 10").unwrap_err(),
            ParseError::TooLong {
                length: 16,
                limit: 10
            }
        );
    }
}

#[cfg(test)]
mod evaluation_tests {
    use super::*;

    #[test]
    fn test_greater_than_true_with_reason() {
        let inputs = payload(&[("value", Value::from(11.0))]);
        let evaluation = eval("input.value > 10", &inputs).unwrap();
        assert_eq!(evaluation.value, Value::Bool(true));
        assert!(evaluation.is_truthy());
        assert_eq!(evaluation.reason(), "input.value (was 11) > 10");
    }

    #[test]
    fn test_greater_than_false() {
        let inputs = payload(&[("value", Value::from(5.0))]);
        let evaluation = eval("input.value > 10", &inputs).unwrap();
        assert_eq!(evaluation.value, Value::Bool(false));
    }

    #[test]
    fn test_missing_input_is_false_without_panicking() {
        let outcome = evaluate_source(&Compiler::default(), "input.value > 10", &Payload::new());
        assert!(!outcome.matched);
        assert!(outcome.error.is_some());
        assert!(outcome.reason.starts_with("condition failed"));
    }

    #[test]
    fn test_parse_failure_is_false_on_lenient_path() {
        let outcome = evaluate_source(&Compiler::default(), "input.value >", &Payload::new());
        assert!(!outcome.matched);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn test_overlong_chain_is_a_false_condition() {
        let sum = vec!["1"; 1000].join("+");
        let outcome = evaluate_source(&Compiler::default(), &sum, &Payload::new());
        assert!(!outcome.matched);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn test_deep_path_through_missing_value_errors() {
        let err = eval("input.user.name == 'x'", &Payload::new()).unwrap_err();
        assert_eq!(err, EvaluationError::InputNotFound("input.user".to_string()));
    }

    #[test]
    fn test_logical_and_with_method_call() {
        let inputs = payload(&[
            ("role", Value::from("admin")),
            (
                "tags",
                Value::List(vec![Value::from("beta"), Value::from("staff")]),
            ),
        ]);
        let evaluation = eval(
            r#"input.role === "admin" && input.tags.includes("beta")"#,
            &inputs,
        )
        .unwrap();
        assert_eq!(evaluation.value, Value::Bool(true));
        let reason = evaluation.reason();
        assert!(reason.contains(r#"input.role (was "admin") == "admin""#), "{}", reason);
        assert!(reason.contains("includes("), "{}", reason);
    }

    #[test]
    fn test_or_short_circuits_before_failing_operand() {
        let inputs = payload(&[("a", Value::from(5.0))]);
        let evaluation = eval("input.a > 1 || input.missing.deep", &inputs).unwrap();
        assert_eq!(evaluation.value, Value::Bool(true));
        assert_eq!(evaluation.reason(), "input.a (was 5) > 1");
    }

    #[test]
    fn test_and_short_circuits_on_falsy_left() {
        let evaluation = eval("input.flag && input.missing.deep", &Payload::new()).unwrap();
        assert_eq!(evaluation.value, Value::Bool(false));
    }

    #[test]
    fn test_truthiness_of_final_value() {
        let inputs = payload(&[("name", Value::from("ada")), ("count", Value::from(0.0))]);
        assert!(eval("input.name", &inputs).unwrap().is_truthy());
        assert!(!eval("input.count", &inputs).unwrap().is_truthy());
        assert!(eval("!input.missing", &inputs).unwrap().is_truthy());
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let inputs = payload(&[("x", Value::from(4.0))]);
        assert_eq!(
            eval("input.x / 0", &inputs).unwrap_err(),
            EvaluationError::DivisionByZero("/".to_string())
        );
        assert_eq!(
            eval("input.x % 0", &inputs).unwrap_err(),
            EvaluationError::DivisionByZero("%".to_string())
        );
    }

    #[test]
    fn test_arithmetic_and_modulo() {
        let inputs = payload(&[("n", Value::from(10.0))]);
        assert_eq!(eval("input.n % 3", &inputs).unwrap().value, Value::from(1.0));
        assert_eq!(eval("input.n * 2 - 5", &inputs).unwrap().value, Value::from(15.0));
        assert_eq!(eval("-input.n", &inputs).unwrap().value, Value::from(-10.0));
        assert_eq!(eval("-3 < input.n", &inputs).unwrap().value, Value::Bool(true));
    }

    #[test]
    fn test_string_concatenation() {
        let inputs = payload(&[("first", Value::from("Ada")), ("last", Value::from("Lovelace"))]);
        assert_eq!(
            eval("input.first + ' ' + input.last", &inputs).unwrap().value,
            Value::from("Ada Lovelace")
        );
        assert_eq!(
            eval("'v' + 2", &inputs).unwrap().value,
            Value::from("v2")
        );
    }

    #[test]
    fn test_ordering_across_types_is_a_mismatch() {
        let inputs = payload(&[("name", Value::from("bob"))]);
        let err = eval("input.name > 3", &inputs).unwrap_err();
        assert!(
            matches!(&err, EvaluationError::TypeMismatch { operation, .. } if operation == ">"),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_string_ordering() {
        let inputs = payload(&[("name", Value::from("bob"))]);
        assert_eq!(eval("input.name < 'carl'", &inputs).unwrap().value, Value::Bool(true));
    }

    #[test]
    fn test_equality_is_structural() {
        let inputs = payload(&[
            ("n", Value::from(10.0)),
            ("s", Value::from("10")),
        ]);
        assert_eq!(eval("input.n == 10.0", &inputs).unwrap().value, Value::Bool(true));
        assert_eq!(eval("input.n == input.s", &inputs).unwrap().value, Value::Bool(false));
        assert_eq!(eval("input.missing == null", &inputs).unwrap().value, Value::Bool(true));
        assert_eq!(
            eval("input.missing === undefined", &inputs).unwrap().value,
            Value::Bool(true)
        );
    }

    #[test]
    fn test_exists_tolerates_missing_paths() {
        assert_eq!(
            eval("exists(input.user.email)", &Payload::new()).unwrap().value,
            Value::Bool(false)
        );
        let user: Value = serde_json::json!({ "email": "ada@example.com" }).into();
        let inputs = payload(&[("user", user)]);
        assert_eq!(
            eval("exists(input.user.email)", &inputs).unwrap().value,
            Value::Bool(true)
        );
    }

    #[test]
    fn test_paths_with_indexes_and_quoted_keys() {
        let inputs: Payload = payload_from_json_object(serde_json::json!({
            "items": ["a", "b", "c"],
            "first name": "Ada",
        }));
        assert_eq!(eval("input.items[1] == 'b'", &inputs).unwrap().value, Value::Bool(true));
        assert_eq!(eval("input.items[9]", &inputs).unwrap().value, Value::Null);
        assert_eq!(
            eval(r#"input["first name"] == "Ada""#, &inputs).unwrap().value,
            Value::Bool(true)
        );
        assert_eq!(eval("input.items.length", &inputs).unwrap().value, Value::from(3.0));
    }

    #[test]
    fn test_string_methods() {
        let inputs = payload(&[("name", Value::from("  Ada Lovelace "))]);
        assert_eq!(
            eval("input.name.trim().toLowerCase()", &inputs).unwrap().value,
            Value::from("ada lovelace")
        );
        assert_eq!(
            eval("input.name.trim().startsWith('Ada')", &inputs).unwrap().value,
            Value::Bool(true)
        );
        assert_eq!(
            eval("input.name.trim().endsWith('Lovelace')", &inputs).unwrap().value,
            Value::Bool(true)
        );
        assert_eq!(
            eval("input.name.toUpperCase().includes('LOVE')", &inputs).unwrap().value,
            Value::Bool(true)
        );
    }

    #[test]
    fn test_method_on_wrong_type_is_a_mismatch() {
        let inputs = payload(&[("n", Value::from(3.0))]);
        assert!(matches!(
            eval("input.n.toLowerCase()", &inputs).unwrap_err(),
            EvaluationError::TypeMismatch { .. }
        ));
        assert!(matches!(
            eval("abs(input.missing)", &inputs).unwrap_err(),
            EvaluationError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_bare_input_is_the_whole_map() {
        let inputs = payload(&[("a", Value::from(1.0)), ("b", Value::from(2.0))]);
        assert_eq!(eval("len(input)", &inputs).unwrap().value, Value::from(2.0));
    }

    fn payload_from_json_object(json: serde_json::Value) -> Payload {
        nagare::workflow::payload_from_json(json).expect("a JSON object")
    }
}
