//! Built-in Library
//!
//! This module provides the functions every evaluation starts with:
//! - Math: numeric functions and the `math` package (`math.Pi`, `math.Round`)
//! - List: sequence operations over lists and ranges
//! - Text: string manipulation
//! - Misc: conversions, constructors for bytes, GUIDs and timestamps, logging
//! - Os: file system access through the host services
//!
//! Names are case-insensitive. Built-ins see missing trailing arguments as
//! nil and reject extra ones.

use std::rc::Rc;

use hashbrown::HashMap;
use once_cell::sync::Lazy;

use crate::evaluator::{EvalError, RuntimeError};
use crate::values::{Kvc, NativeFunction, Value};

pub mod list;
pub mod math;
pub mod misc;
pub mod os;
pub mod text;


static REGISTRY: Lazy<HashMap<String, NativeFunction>> = Lazy::new(|| {
    let mut registry = HashMap::new();
    for table in [
        math::FUNCTIONS,
        list::FUNCTIONS,
        text::FUNCTIONS,
        misc::FUNCTIONS,
        os::FUNCTIONS,
    ] {
        for function in table {
            registry.insert(function.name().to_lowercase(), *function);
        }
    }
    registry
});

/// Resolve a built-in name (case-insensitive).
pub fn lookup(name: &str) -> Option<Value> {
    let key = name.to_lowercase();
    if let Some(function) = REGISTRY.get(&key) {
        return Some(Value::Function(Rc::new(*function)));
    }
    match key.as_str() {
        "math" => Some(math_package()),
        _ => math::constant(&key),
    }
}

/// Names of every built-in function, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY.values().map(NativeFunction::name).collect();
    names.sort_unstable();
    names
}

fn math_package() -> Value {
    let mut entries: Vec<(&str, Value)> = math::FUNCTIONS
        .iter()
        .map(|f| (f.name(), Value::Function(Rc::new(*f))))
        .collect();
    entries.extend(math::CONSTANTS.iter().map(|(name, x)| (*name, Value::Number(*x))));
    Value::Kvc(Rc::new(Kvc::from_values(entries)))
}

/// Argument `index`, or nil when the caller passed fewer.
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Nil)
}

pub(crate) fn type_error(function: &str, expected: &str, got: &Value) -> EvalError {
    RuntimeError::type_mismatch(format!(
        "{}: expected {}, got {}",
        function,
        expected,
        got.type_name()
    ))
    .into()
}

pub(crate) fn invalid(function: &str, message: impl Into<String>) -> EvalError {
    RuntimeError::invalid_argument(function, message).into()
}

pub(crate) fn expect_int(function: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(type_error(function, "an Integer", other)),
    }
}

pub(crate) fn expect_str<'v>(function: &str, value: &'v Value) -> Result<&'v str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(type_error(function, "a String", other)),
    }
}
