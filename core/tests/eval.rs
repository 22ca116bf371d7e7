use funcscript_core::api::{Context, ContextOptions};
use indoc::indoc;
use pretty_assertions::assert_eq;

/// Evaluate `input` in a fresh context and compare the JSON snapshot (or the
/// error code) with the expectation.
macro_rules! test_case {
    ($name:ident, input: $input:expr, json: $expected:expr $(,)?) => {
        #[test]
        fn $name() {
            let mut context = Context::new(ContextOptions::default()).unwrap();
            let result = context.eval_json($input).map_err(|e| e.code());
            let expected: Result<&str, u32> = $expected;
            assert_eq!(result.as_deref(), expected);
        }
    };
}

test_case!(
    sum_of_large_range_is_exact,
    input: "Sum(Range(1, 1000000000))",
    json: Ok("500000000500000000"),
);

test_case!(
    lambda_single_argument,
    input: "((x) => x + 1)(2)",
    json: Ok("3"),
);

test_case!(
    lambda_two_arguments,
    input: "((x, y) => x * y)(3, 4)",
    json: Ok("12"),
);

test_case!(
    bytes_from_base64,
    input: r#"ChangeType("AQID", "ByteArray")"#,
    json: Ok(r#"{"type":"bytes","base64":"AQID"}"#),
);

test_case!(
    trailing_comma_in_call_is_a_compile_error,
    input: "If(true, 1, )",
    json: Err(1000),
);

test_case!(
    negative_range_count,
    input: "Range(1, -1)",
    json: Err(1),
);

test_case!(
    too_many_lambda_arguments,
    input: "((x) => x)(1, 2)",
    json: Err(2004),
);

test_case!(
    division_by_zero,
    input: "1 / 0",
    json: Err(2005),
);

test_case!(
    nested_collections,
    input: indoc! {r#"
        {
            // comments are ignored
            name: "widget";
            tags: ["a", "b"] map (t) => upper(t);
            size: {w: 2, h: 3};
            area: size.w * size.h;
        }
    "#},
    json: Ok(r#"{"name":"widget","tags":["A","B"],"size":{"w":2,"h":3},"area":6}"#),
);

test_case!(
    eval_clause_selects_result,
    input: "x: 2; y: x * 10; eval [x, y]",
    json: Ok("[2,20]"),
);

test_case!(
    filter_and_reduce,
    input: "Reduce(Filter(Range(1, 10), (x) => x % 2 = 0), (acc, x) => acc + x, 0)",
    json: Ok("30"),
);

test_case!(
    sort_with_comparator,
    input: "Sort([3, 1, 2], (a, b) => a - b)",
    json: Ok("[1,2,3]"),
);

test_case!(
    nested_function_becomes_envelope,
    input: "{f: (a) => a}",
    json: Ok(r#"{"f":{"type":"function","name":"lambda","arity":1}}"#),
);

test_case!(
    non_finite_number_is_null,
    input: "[Sqrt(-1), 0.5]",
    json: Ok("[null,0.5]"),
);

test_case!(
    ticks_round_trip,
    input: "TicksToDate(621355968000000000)",
    json: Ok(r#"{"type":"datetime","ticks":621355968000000000}"#),
);

test_case!(
    format_string,
    input: r#"{n: 3; eval f"n={n}, sq={n * n}"}"#,
    json: Ok(r#""n=3, sq=9""#),
);

test_case!(
    text_functions,
    input: r#"join(split("a,b,c", ","), "-")"#,
    json: Ok(r#""a-b-c""#),
);

test_case!(
    math_package,
    input: "[math.Pi > 3, Abs(-2), Max(1, 5, 3), Round(2.567, 2)]",
    json: Ok("[true,2,5,2.57]"),
);

#[test]
fn test_errors_carry_locations() {
    let mut context = Context::new(ContextOptions::default()).unwrap();
    let err = context.eval("[1,\n  2 + undefined_thing]").unwrap_err();
    assert_eq!(err.code(), 1);
    assert_eq!(err.location(), Some((2, 7)));
}
