//! Tree-walking evaluator for parsed expressions.
//!
//! The evaluator interprets parsed expressions (`Expr`) and produces runtime
//! values (`Value`). There is no static type checking: every operation checks
//! its operands at run time and reports a `RuntimeError` carrying the location
//! of the failing node.
//!
//! ## Design Principles
//!
//! - **Never panic**: All adversarial inputs must be handled gracefully
//! - **Stack-safe**: Depth tracking prevents stack overflow from deeply nested expressions
//! - **Lazy collections**: Key-value entries are evaluated on first read and memoized
//!
//! ## Example
//!
//! ```ignore
//! use funcscript_core::{evaluator, host::NoHost, parser};
//!
//! let expr = parser::parse("1 + 2").unwrap();
//! let result = evaluator::eval(&expr, &NoHost, EvaluatorOptions::default()).unwrap();
//! assert_eq!(result.as_i64(), Some(3));
//! ```

pub mod error;
mod eval;
mod operators;

#[cfg(test)]
mod eval_test;

pub use error::{EvalError, EvalErrorKind, ResourceExceeded, RuntimeError, codes};
pub use eval::Evaluator;
pub use operators::compare_numbers;
pub(crate) use operators::compare;

use crate::host::Host;
use crate::parser::Expr;
use crate::values::Value;

/// Limits applied while evaluating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// Maximum nesting of expression evaluation, counting lambda calls and
    /// collection entries evaluated on demand.
    pub max_depth: usize,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self { max_depth: 1000 }
    }
}

/// Evaluate a parsed expression in the root scope.
///
/// ## Example
///
/// ```ignore
/// let expr = parser::parse("Len([1, 2, 3])")?;
/// let result = eval(&expr, &StdHost, EvaluatorOptions { max_depth: 200 })?;
/// ```
pub fn eval(expr: &Expr, host: &dyn Host, options: EvaluatorOptions) -> Result<Value, EvalError> {
    Evaluator::new(options, host).eval(expr)
}
