//! Math Package
//!
//! Provides numeric functions, also reachable through the `math` package
//! together with its constants (`math.Pi`, `math.E`).
//!
//! Functions: Abs, Max, Min, Sqrt, Floor, Ceiling, Round, Pow

use num_bigint::BigInt;
use num_traits::Signed;

use crate::{
    evaluator::{EvalError, Evaluator, compare},
    stdlib::{arg, invalid, type_error},
    values::{NativeFunction, Value},
};

pub(super) const FUNCTIONS: &[NativeFunction] = &[
    NativeFunction::new("Abs", Some(1), math_abs),
    NativeFunction::new("Max", None, math_max),
    NativeFunction::new("Min", None, math_min),
    NativeFunction::new("Sqrt", Some(1), math_sqrt),
    NativeFunction::new("Floor", Some(1), math_floor),
    NativeFunction::new("Ceiling", Some(1), math_ceiling),
    NativeFunction::new("Round", Some(2), math_round),
    NativeFunction::new("Pow", Some(2), math_pow),
];

pub(super) const CONSTANTS: &[(&str, f64)] = &[("Pi", core::f64::consts::PI), ("E", core::f64::consts::E)];

/// Constants visible without the `math.` prefix.
pub(super) fn constant(name: &str) -> Option<Value> {
    match name {
        "pi" => Some(Value::Number(core::f64::consts::PI)),
        _ => None,
    }
}

fn float_arg(function: &str, value: &Value) -> Result<f64, EvalError> {
    value
        .as_f64()
        .ok_or_else(|| type_error(function, "a number", value))
}

// ============================================================================
// Basic Operations
// ============================================================================

fn math_abs(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        Value::Int(i) => Ok(i
            .checked_abs()
            .map(Value::Int)
            .unwrap_or_else(|| Value::integer(BigInt::from(i).abs()))),
        Value::BigInt(b) => Ok(Value::integer(b.abs())),
        Value::Number(x) => Ok(Value::Number(x.abs())),
        other => Err(type_error("Abs", "a number", &other)),
    }
}

/// Operands of `Max`/`Min`: either the arguments or a single list argument.
fn extremum(function: &str, args: &[Value], want: core::cmp::Ordering) -> Result<Value, EvalError> {
    if let [range @ Value::Range(_)] = args {
        let mut seq = range.sequence().into_iter().flatten();
        let end = if want == core::cmp::Ordering::Greater { seq.next_back() } else { seq.next() };
        return Ok(end.unwrap_or(Value::Nil));
    }
    let items: Box<dyn Iterator<Item = Value> + '_> = match args {
        [single] => match single.sequence() {
            Some(seq) => Box::new(seq),
            None => Box::new(args.iter().cloned()),
        },
        _ => Box::new(args.iter().cloned()),
    };
    let mut best: Option<Value> = None;
    for item in items {
        if item.is_nil() {
            continue;
        }
        best = Some(match best {
            None => item,
            Some(current) => match compare(&item, &current) {
                Some(ordering) if ordering == want => item,
                Some(_) => current,
                None => {
                    return Err(invalid(
                        function,
                        format!("cannot compare {} with {}", item.type_name(), current.type_name()),
                    ));
                }
            },
        });
    }
    Ok(best.unwrap_or(Value::Nil))
}

fn math_max(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    extremum("Max", args, core::cmp::Ordering::Greater)
}

fn math_min(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    extremum("Min", args, core::cmp::Ordering::Less)
}

fn math_sqrt(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        value => Ok(Value::Number(float_arg("Sqrt", &value)?.sqrt())),
    }
}

fn math_pow(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let base = float_arg("Pow", &arg(args, 0))?;
    let exp = float_arg("Pow", &arg(args, 1))?;
    Ok(Value::Number(base.powf(exp)))
}

// ============================================================================
// Rounding Functions
// ============================================================================

/// Integers pass through unchanged; floats stay floats.
fn rounding(function: &str, args: &[Value], op: fn(f64) -> f64) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        value @ (Value::Int(_) | Value::BigInt(_)) => Ok(value),
        Value::Number(x) => Ok(Value::Number(op(x))),
        other => Err(type_error(function, "a number", &other)),
    }
}

fn math_floor(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    rounding("Floor", args, f64::floor)
}

fn math_ceiling(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    rounding("Ceiling", args, f64::ceil)
}

/// `Round(x)` or `Round(x, digits)`.
fn math_round(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 1) {
        Value::Nil => rounding("Round", args, f64::round),
        Value::Int(digits) => {
            let Value::Number(x) = arg(args, 0) else {
                return rounding("Round", args, f64::round);
            };
            let digits = i32::try_from(digits).map_err(|_| invalid("Round", "digits out of range"))?;
            let scale = 10f64.powi(digits);
            Ok(Value::Number((x * scale).round() / scale))
        }
        other => Err(type_error("Round", "an Integer digit count", &other)),
    }
}
