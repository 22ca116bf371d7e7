//! Binary and unary operator implementations.
//!
//! Integer arithmetic is checked and promotes to big integers on overflow;
//! results that fit back into 64 bits are demoted again. Floating point
//! follows IEEE 754 (produces inf/nan rather than failing).

use core::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::evaluator::RuntimeError;
use crate::parser::BinaryOp;
use crate::values::Value;

pub(super) fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(left, right).ok_or_else(|| {
                RuntimeError::type_mismatch(format!(
                    "Cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::In => match right.sequence() {
            _ if left.is_nil() => Ok(Value::Bool(false)),
            Some(mut items) => Ok(Value::Bool(items.any(|item| &item == left))),
            None if right.is_nil() => Ok(Value::Nil),
            None => Err(RuntimeError::type_mismatch(format!(
                "'in' expects a list, got {}",
                right.type_name()
            ))),
        },
        BinaryOp::Add => match (left, right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                let mut text = concat_text(left);
                text.push_str(&concat_text(right));
                Ok(Value::string(text))
            }
            (Value::List(a), Value::List(b)) => {
                Ok(Value::list(a.iter().chain(b.iter()).cloned().collect::<Vec<_>>()))
            }
            _ => eval_numeric(op, left, right),
        },
        _ => eval_numeric(op, left, right),
    }
}

/// Text used when a value takes part in string concatenation.
fn concat_text(value: &Value) -> String {
    match value {
        Value::Nil => String::new(),
        other => other.to_string(),
    }
}

fn eval_numeric(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_binary_int(op, *a, *b),
        (Value::Number(_), _) | (_, Value::Number(_)) => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(eval_binary_float(op, a, b)),
            _ => Err(operand_mismatch(op, left, right)),
        },
        _ => match (to_big(left), to_big(right)) {
            (Some(a), Some(b)) => eval_binary_big(op, a, b),
            _ => Err(operand_mismatch(op, left, right)),
        },
    }
}

fn operand_mismatch(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_mismatch(format!(
        "Operator '{}' is not defined for {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}

fn to_big(value: &Value) -> Option<BigInt> {
    match value {
        Value::Int(i) => Some(BigInt::from(*i)),
        Value::BigInt(b) => Some((**b).clone()),
        _ => None,
    }
}

/// Evaluate a binary arithmetic operation on two integers.
pub(super) fn eval_binary_int(op: BinaryOp, left: i64, right: i64) -> Result<Value, RuntimeError> {
    let promote = || eval_binary_big(op, BigInt::from(left), BigInt::from(right));
    match op {
        BinaryOp::Add => left.checked_add(right).map(Value::Int).map_or_else(promote, Ok),
        BinaryOp::Sub => left.checked_sub(right).map(Value::Int).map_or_else(promote, Ok),
        BinaryOp::Mul => left.checked_mul(right).map(Value::Int).map_or_else(promote, Ok),
        BinaryOp::Div => {
            if right == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            if left.checked_rem(right).unwrap_or(0) == 0 {
                left.checked_div(right).map(Value::Int).map_or_else(promote, Ok)
            } else {
                Ok(Value::Number(left as f64 / right as f64))
            }
        }
        BinaryOp::IntDiv => {
            if right == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            left.checked_div(right).map(Value::Int).map_or_else(promote, Ok)
        }
        BinaryOp::Mod => {
            if right == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Int(left.checked_rem(right).unwrap_or(0)))
        }
        BinaryOp::Pow => {
            if right < 0 {
                return Ok(Value::Number((left as f64).powf(right as f64)));
            }
            u32::try_from(right)
                .ok()
                .and_then(|exp| left.checked_pow(exp))
                .map(Value::Int)
                .map_or_else(promote, Ok)
        }
        _ => Err(RuntimeError::type_mismatch(format!(
            "Operator '{}' is not arithmetic",
            op
        ))),
    }
}

fn eval_binary_big(op: BinaryOp, left: BigInt, right: BigInt) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => Ok(Value::integer(left + right)),
        BinaryOp::Sub => Ok(Value::integer(left - right)),
        BinaryOp::Mul => Ok(Value::integer(left * right)),
        BinaryOp::Div => {
            if right.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            if (&left % &right).is_zero() {
                Ok(Value::integer(left / right))
            } else {
                let (a, b) = (big_to_f64(&left), big_to_f64(&right));
                Ok(Value::Number(a / b))
            }
        }
        BinaryOp::IntDiv => {
            if right.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::integer(left / right))
        }
        BinaryOp::Mod => {
            if right.is_zero() {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::integer(left % right))
        }
        BinaryOp::Pow => match right.to_u32() {
            Some(exp) => Ok(Value::integer(left.pow(exp))),
            None if right < BigInt::zero() => {
                Ok(Value::Number(big_to_f64(&left).powf(big_to_f64(&right))))
            }
            None => Err(RuntimeError::invalid_argument("^", "exponent is too large")),
        },
        _ => Err(RuntimeError::type_mismatch(format!(
            "Operator '{}' is not arithmetic",
            op
        ))),
    }
}

fn big_to_f64(value: &BigInt) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Evaluate a binary operation on two floats.
pub(super) fn eval_binary_float(op: BinaryOp, left: f64, right: f64) -> Value {
    let result = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::IntDiv => (left / right).trunc(),
        BinaryOp::Mod => left % right,
        BinaryOp::Pow => left.powf(right),
        _ => f64::NAN,
    };
    Value::Number(result)
}

pub(super) fn eval_negate(value: &Value) -> Result<Value, RuntimeError> {
    match value {
        Value::Int(i) => Ok(i
            .checked_neg()
            .map(Value::Int)
            .unwrap_or_else(|| Value::integer(-BigInt::from(*i)))),
        Value::BigInt(b) => Ok(Value::integer(-(**b).clone())),
        Value::Number(x) => Ok(Value::Number(-x)),
        other => Err(RuntimeError::type_mismatch(format!(
            "Cannot negate {}",
            other.type_name()
        ))),
    }
}

/// Order two numbers of any representation.
pub fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Number(_), _) | (_, Value::Number(_)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        _ => Some(to_big(left)?.cmp(&to_big(right)?)),
    }
}

pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (a, b) if a.is_numeric() && b.is_numeric() => compare_numbers(a, b),
        _ => None,
    }
}
