//! Callable values.
//!
//! This module defines the `Function` trait implemented by every callable
//! value: native built-ins and closures created by lambda expressions.

use crate::evaluator::{EvalError, Evaluator, RuntimeError};
use crate::values::Value;

/// Trait for callable functions.
///
/// Functions receive the evaluator so they can call back into other
/// functions (`Map`, `Filter`) or reach the host services (`file`).
pub trait Function {
    /// Name used in snapshots and error messages.
    fn name(&self) -> &str;

    /// Maximum parameter count; `None` for variadic built-ins.
    fn arity(&self) -> Option<usize>;

    /// Call the function with already evaluated arguments.
    fn call(&self, evaluator: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError>;
}

/// Type alias for native function pointers.
///
/// # Example
///
/// ```ignore
/// fn len(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
///     match args.first() {
///         Some(Value::String(s)) => Ok(Value::Int(s.chars().count() as i64)),
///         _ => Ok(Value::Nil),
///     }
/// }
/// ```
pub type NativeFn = fn(&mut Evaluator<'_>, &[Value]) -> Result<Value, EvalError>;

/// Wrapper for native Rust function pointers.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    name: &'static str,
    arity: Option<usize>,
    func: NativeFn,
}

impl NativeFunction {
    pub const fn new(name: &'static str, arity: Option<usize>, func: NativeFn) -> Self {
        Self { name, arity, func }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl Function for NativeFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Missing trailing arguments are seen as nil by the built-in; extra
    /// arguments are rejected.
    fn call(&self, evaluator: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
        if let Some(expected) = self.arity {
            if args.len() > expected {
                return Err(RuntimeError::ArityMismatch {
                    name: self.name.to_string(),
                    expected,
                    got: args.len(),
                }
                .into());
            }
        }
        (self.func)(evaluator, args)
    }
}
