//! Lambda function implementation for closures.
//!
//! This module defines `LambdaFunction` which represents lambda expressions
//! as callable values.

use std::rc::Rc;

use crate::evaluator::{EvalError, Evaluator, RuntimeError};
use crate::parser::Expr;
use crate::scope::Scope;
use crate::values::{Function, Value};

/// A lambda function value.
///
/// Stores the parameters, the body expression and the scope the lambda was
/// created in. When called, the body is evaluated in a new frame chained to
/// that scope.
///
/// Missing arguments are bound to nil; passing more arguments than declared
/// parameters is an arity error.
pub struct LambdaFunction {
    params: Rc<[String]>,
    body: Rc<Expr>,
    /// Captured enclosing scope
    scope: Rc<Scope>,
}

impl LambdaFunction {
    pub fn new(params: Rc<[String]>, body: Rc<Expr>, scope: Rc<Scope>) -> Self {
        Self {
            params,
            body,
            scope,
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

impl Function for LambdaFunction {
    fn name(&self) -> &str {
        "lambda"
    }

    fn arity(&self) -> Option<usize> {
        Some(self.params.len())
    }

    fn call(&self, evaluator: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() > self.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: self.name().to_string(),
                expected: self.params.len(),
                got: args.len(),
            }
            .into());
        }

        let bindings = self
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), args.get(i).cloned().unwrap_or(Value::Nil)))
            .collect();
        let frame = Rc::new(Scope::Frame {
            bindings,
            parent: self.scope.clone(),
        });

        evaluator.eval_in(&self.body, frame)
    }
}
