//! Text Package
//!
//! String functions. Positions and lengths count Unicode scalar values, not
//! bytes. Out of range positions clamp instead of failing.
//!
//! Functions: lower, upper, substring, find, startswith, endswith, isBlank,
//!            join, split, trim

use crate::{
    evaluator::{EvalError, Evaluator},
    stdlib::{arg, expect_int, expect_str, type_error},
    values::{NativeFunction, Value},
};

pub(super) const FUNCTIONS: &[NativeFunction] = &[
    NativeFunction::new("lower", Some(1), text_lower),
    NativeFunction::new("upper", Some(1), text_upper),
    NativeFunction::new("substring", Some(3), text_substring),
    NativeFunction::new("find", Some(2), text_find),
    NativeFunction::new("startswith", Some(2), text_starts_with),
    NativeFunction::new("endswith", Some(2), text_ends_with),
    NativeFunction::new("isBlank", Some(1), text_is_blank),
    NativeFunction::new("join", Some(2), text_join),
    NativeFunction::new("split", Some(2), text_split),
    NativeFunction::new("trim", Some(1), text_trim),
];

/// Apply `f` to a string argument; nil passes through.
fn map_str(function: &str, args: &[Value], f: impl FnOnce(&str) -> String) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        Value::String(s) => Ok(Value::string(f(&s))),
        other => Err(type_error(function, "a String", &other)),
    }
}

fn text_lower(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    map_str("lower", args, str::to_lowercase)
}

fn text_upper(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    map_str("upper", args, str::to_uppercase)
}

fn text_trim(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    map_str("trim", args, |s| s.trim().to_string())
}

/// `substring(text, start)` or `substring(text, start, length)`.
fn text_substring(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let text = arg(args, 0);
    if text.is_nil() {
        return Ok(Value::Nil);
    }
    let text = expect_str("substring", &text)?;
    let start = usize::try_from(expect_int("substring", &arg(args, 1))?.max(0)).unwrap_or(usize::MAX);
    let chars = text.chars().skip(start);
    let result: String = match arg(args, 2) {
        Value::Nil => chars.collect(),
        len => {
            let len = usize::try_from(expect_int("substring", &len)?.max(0)).unwrap_or(usize::MAX);
            chars.take(len).collect()
        }
    };
    Ok(Value::string(result))
}

/// Character position of the first occurrence, or -1.
fn text_find(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (text, needle) = (arg(args, 0), arg(args, 1));
    if text.is_nil() || needle.is_nil() {
        return Ok(Value::Int(-1));
    }
    let text = expect_str("find", &text)?;
    let needle = expect_str("find", &needle)?;
    let position = text
        .find(needle)
        .map(|byte| text[..byte].chars().count() as i64)
        .unwrap_or(-1);
    Ok(Value::Int(position))
}

fn affix(function: &str, args: &[Value], test: fn(&str, &str) -> bool) -> Result<Value, EvalError> {
    let (text, affix) = (arg(args, 0), arg(args, 1));
    if text.is_nil() || affix.is_nil() {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(test(expect_str(function, &text)?, expect_str(function, &affix)?)))
}

fn text_starts_with(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    affix("startswith", args, |s, p| s.starts_with(p))
}

fn text_ends_with(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    affix("endswith", args, |s, p| s.ends_with(p))
}

fn text_is_blank(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Bool(true)),
        Value::String(s) => Ok(Value::Bool(s.trim().is_empty())),
        other => Err(type_error("isBlank", "a String", &other)),
    }
}

/// Join the elements of a list with a separator; nil elements are skipped.
fn text_join(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let list = arg(args, 0);
    let Some(items) = list.sequence() else {
        return match list {
            Value::Nil => Ok(Value::Nil),
            other => Err(type_error("join", "a List", &other)),
        };
    };
    let separator = match arg(args, 1) {
        Value::Nil => String::new(),
        Value::String(s) => s.to_string(),
        other => return Err(type_error("join", "a String separator", &other)),
    };

    let mut parts = Vec::new();
    for item in items {
        if !item.is_nil() {
            parts.push(ev.render(&item)?);
        }
    }
    Ok(Value::string(parts.join(&separator)))
}

fn text_split(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let text = arg(args, 0);
    if text.is_nil() {
        return Ok(Value::Nil);
    }
    let text = expect_str("split", &text)?;
    let parts: Vec<Value> = match arg(args, 1) {
        Value::Nil => text.split_whitespace().map(Value::string).collect(),
        Value::String(sep) if sep.is_empty() => vec![Value::string(text)],
        Value::String(sep) => text.split(&*sep).map(Value::string).collect(),
        other => return Err(type_error("split", "a String separator", &other)),
    };
    Ok(Value::list(parts))
}
