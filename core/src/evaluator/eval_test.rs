//! Unit tests for the evaluator.

use indoc::indoc;
use pretty_assertions::assert_eq;

use super::*;
use crate::{host::NoHost, parser, values::Value};

fn run(input: &str) -> Result<Value, EvalError> {
    let expr = parser::parse(input).expect("parsing failed");
    eval(&expr, &NoHost, EvaluatorOptions::default())
}

fn run_with_limits(input: &str, max_depth: usize) -> Result<Value, EvalError> {
    let expr = parser::parse(input).expect("parsing failed");
    eval(&expr, &NoHost, EvaluatorOptions { max_depth })
}

fn ok(input: &str) -> Value {
    run(input).unwrap()
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::Int).collect::<Vec<_>>())
}

#[test]
fn test_arithmetic_and_comparisons() {
    assert_eq!(ok("1 + 2 * 3"), Value::Int(7));
    assert_eq!(ok("10 / 2 + 1"), Value::Int(6));
    assert_eq!(ok("7 / 2"), Value::Number(3.5));
    assert_eq!(ok("10 div 3"), Value::Int(3));
    assert_eq!(ok("10 % 3"), Value::Int(1));
    assert_eq!(ok("10.5 % 2"), Value::Number(0.5));
    assert_eq!(ok("2 <= 2"), Value::Bool(true));
    assert_eq!(ok("3 >= 4"), Value::Bool(false));
    assert_eq!(ok("1 != 2"), Value::Bool(true));
    assert_eq!(ok("1 = 1.0"), Value::Bool(true));
}

#[test]
fn test_division_by_zero() {
    let err = run("1 / 0").unwrap_err();
    assert_eq!(err.code(), codes::DIVISION_BY_ZERO);
}

#[test]
fn test_if_and_case() {
    assert_eq!(ok("if 1 < 2 then 10 else 20"), Value::Int(10));
    assert_eq!(ok("if nil then 10 else 20"), Value::Int(20));
    assert_eq!(ok("case 1 = 2: 10, true: 20, 30"), Value::Int(20));
    assert_eq!(ok("case false: 10, false: 20, 30"), Value::Int(30));
    assert_eq!(run("if 1 then 2 else 3").unwrap_err().code(), codes::TYPE_MISMATCH);
}

#[test]
fn test_logical_operators() {
    assert_eq!(ok("true and false"), Value::Bool(false));
    assert_eq!(ok("true or false"), Value::Bool(true));
    assert_eq!(ok("nil and nil"), Value::Nil);
    assert_eq!(ok("nil or nil"), Value::Nil);
    assert_eq!(ok("nil and false"), Value::Bool(false));
    assert_eq!(ok("nil or true"), Value::Bool(true));
    assert_eq!(ok("not true"), Value::Bool(false));
    assert_eq!(ok("!false"), Value::Bool(true));
    assert!(run("not nil").is_err());
}

#[test]
fn test_short_circuit_skips_right_operand() {
    assert_eq!(ok("false and undefined_name"), Value::Bool(false));
    assert_eq!(ok("true or undefined_name"), Value::Bool(true));
}

#[test]
fn test_null_operators() {
    assert_eq!(ok("nil ?? 5"), Value::Int(5));
    assert_eq!(ok("false ?? 5"), Value::Bool(false));
    assert_eq!(ok("nil ?? nil ?? 5"), Value::Int(5));
    assert_eq!(ok("nil ?! 10"), Value::Nil);
    assert_eq!(ok("5 ?! (5 * 200)"), Value::Int(1000));
}

#[test]
fn test_in_operator() {
    assert_eq!(ok("2 in [1, 2, 3]"), Value::Bool(true));
    assert_eq!(ok("4 in [1, 2, 3]"), Value::Bool(false));
    assert_eq!(ok("nil in [2, nil]"), Value::Bool(false));
    assert_eq!(ok("3 in Range(1, 5)"), Value::Bool(true));
    assert_eq!(ok("(1 in [1]) = true"), Value::Bool(true));
    // Comparison binds tighter: `1 in ([1] = true)`.
    assert_eq!(run("1 in [1] = true").unwrap_err().code(), codes::TYPE_MISMATCH);
}

#[test]
fn test_not_applies_before_comparison() {
    assert_eq!(ok("!(1 = 2)"), Value::Bool(true));
    assert_eq!(ok("not false = true"), Value::Bool(true));
    assert_eq!(run("!1 = 2").unwrap_err().code(), codes::TYPE_MISMATCH);
}

#[test]
fn test_lambdas() {
    assert_eq!(ok("((x) => x + 1)(2)"), Value::Int(3));
    assert_eq!(ok("((x, y) => x * y)(3, 4)"), Value::Int(12));
}

#[test]
fn test_missing_arguments_are_nil() {
    let source = indoc! {r#"
        {
            name: "Esubalew";
            say_hello: (name) => "Hello " + name;
            eval say_hello();
        }
    "#};
    assert_eq!(ok(source), Value::string("Hello "));
}

#[test]
fn test_extra_arguments_are_rejected() {
    let err = run("((x) => x)(1, 2)").unwrap_err();
    assert_eq!(err.code(), codes::ARITY_MISMATCH);
}

#[test]
fn test_closures_capture_collection_scope() {
    let source = indoc! {"
        {
            a: 2;
            return [4, 5] map (x) => x + a;
        }
    "};
    assert_eq!(ok(source), ints(&[6, 7]));
}

#[test]
fn test_naked_collection_root() {
    assert_eq!(ok("a: 1; b: 2; eval a + b"), Value::Int(3));
}

#[test]
fn test_member_access() {
    assert_eq!(ok("{a: 1, b: 2}.a"), Value::Int(1));
    assert_eq!(ok("{a: 1, b: 2}.B"), Value::Int(2));
    assert_eq!(ok("{a: 1, b: 2}.missing"), Value::Nil);
    assert_eq!(ok("nil?.a"), Value::Nil);
    assert_eq!(ok("{a: 1}?.a"), Value::Int(1));
    assert_eq!(run("nil.a").unwrap_err().code(), codes::TYPE_MISMATCH);
}

#[test]
fn test_indexing_out_of_range_is_nil() {
    assert_eq!(ok("[1, 2, 3][1]"), Value::Int(2));
    assert_eq!(ok("[1, 2, 3][3]"), Value::Nil);
    assert_eq!(ok("[1, 2, 3][-1]"), Value::Nil);
    assert_eq!(ok("{a: 5}[\"A\"]"), Value::Int(5));
}

#[test]
fn test_collection_entries_are_lazy() {
    // The failing entry is never read.
    assert_eq!(ok("{a: 1, b: 1 / 0}.a"), Value::Int(1));
    assert_eq!(ok("{x: 1, y: x + 1, z: y * 10}.z"), Value::Int(20));
}

#[test]
fn test_circular_entries_are_reported() {
    let err = run("{a: b, b: a}.a").unwrap_err();
    assert!(matches!(
        err.kind,
        EvalErrorKind::Runtime(RuntimeError::CircularReference { .. })
    ));
}

#[test]
fn test_collection_merge() {
    let merged = "({a: 12, b: {c: 10, z: 10}} + {d: 13, b: {c: 12, x: 5}})";
    assert_eq!(ok(&format!("{merged}.a")), Value::Int(12));
    assert_eq!(ok(&format!("{merged}.d")), Value::Int(13));
    assert_eq!(ok(&format!("{merged}.b.c")), Value::Int(12));
    assert_eq!(ok(&format!("{merged}.b.z")), Value::Int(10));
    assert_eq!(ok(&format!("{merged}.b.x")), Value::Int(5));
    assert_eq!(ok("({x: [1, 2]} + {x: [3]}).x[0]"), Value::Int(3));
    assert_eq!(ok("({a: {x: 1, y: 2}} + {a: 5}).a"), Value::Int(5));
}

#[test]
fn test_merge_leaves_left_operand_unchanged() {
    let source = indoc! {"
        {
            a: {x: 5, y: 7};
            b: a + {x: 6};
            c: {x: 5, y: 7};
            eval a = c;
        }
    "};
    assert_eq!(ok(source), Value::Bool(true));
}

#[test]
fn test_format_strings() {
    assert_eq!(ok(r#"f"hi {1 + 2}""#), Value::string("hi 3"));
    assert_eq!(ok(r#"f'X{ "a" + "b" }Y'"#), Value::string("XabY"));
    assert_eq!(ok(r#"f"{nil}""#), Value::string("nil"));
    assert_eq!(ok(r#"f"{[1, "a"]}""#), Value::string(r#"[1, "a"]"#));
}

#[test]
fn test_big_integers() {
    assert_eq!(ok("9223372036854775807 + 1").to_string(), "9223372036854775808");
    assert_eq!(ok("(9223372036854775807 + 1) - 1"), Value::Int(i64::MAX));
    assert_eq!(ok("2 ^ 100").to_string(), "1267650600228229401496703205376");
}

#[test]
fn test_undefined_variable_has_location() {
    let err = run("1 +\n  missing").unwrap_err();
    assert_eq!(err.code(), codes::RUNTIME);
    assert_eq!(err.location(), Some((2, 3)));
}

#[test]
fn test_error_inside_lambda_reports_body_location() {
    let err = run("{f: (x) => x / 0; eval f(1)}").unwrap_err();
    assert_eq!(err.code(), codes::DIVISION_BY_ZERO);
    assert_eq!(err.location(), Some((1, 12)));
}

#[test]
fn test_stack_overflow_is_reported() {
    let source = "{f: (n) => if n = 0 then 0 else f(n - 1); eval f(1000)}";
    let err = run_with_limits(source, 100).unwrap_err();
    assert_eq!(err.code(), codes::RESOURCE_EXCEEDED);
    assert!(matches!(
        err.kind,
        EvalErrorKind::ResourceExceeded(ResourceExceeded::StackOverflow { max_depth: 100, .. })
    ));
}

#[test]
fn test_runaway_recursion_hits_the_default_limit_on_a_small_stack() {
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            run("{f: (n) => if n = 0 then 0 else f(n - 1); eval f(100000)}")
                .unwrap_err()
                .code()
        })
        .unwrap();
    assert_eq!(worker.join().unwrap(), codes::RESOURCE_EXCEEDED);
}

#[test]
fn test_nesting_close_to_the_default_limit() {
    let source = "{f: (n) => if n = 0 then 0 else n + f(n - 1); eval f(200)}";
    assert_eq!(ok(source), Value::Int(20100));
}

#[test]
fn test_recursion_within_limit() {
    let source = "{f: (n) => if n = 0 then 0 else n + f(n - 1); eval f(10)}";
    assert_eq!(ok(source), Value::Int(55));
}
