//! Core evaluation logic.

use std::rc::Rc;

use crate::{
    evaluator::{
        EvalError, EvaluatorOptions,
        ResourceExceeded::StackOverflow,
        RuntimeError::{self, *},
        operators,
    },
    host::Host,
    parser::{BinaryOp, Expr, ExprKind, FormatSegment, Literal, LogicalOp, UnaryOp},
    scope::{Binding, Scope},
    values::{Kvc, LambdaFunction, Value, kvc::Slot},
};

/// Stack left when a node starts evaluating below which a new segment is
/// allocated, and the size of that segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 2 * 1024 * 1024;

/// Tree-walking evaluator.
///
/// An evaluator is cheap to create; the context builds one per evaluation or
/// marshaller call. Values it produces keep their own scopes, so they stay
/// usable after the evaluator is dropped.
pub struct Evaluator<'a> {
    options: EvaluatorOptions,
    host: &'a dyn Host,
    scope: Rc<Scope>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(options: EvaluatorOptions, host: &'a dyn Host) -> Self {
        Self {
            options,
            host,
            scope: Rc::new(Scope::Root),
            depth: 0,
        }
    }

    /// Host services for built-ins that touch the outside world.
    pub fn host(&self) -> &'a dyn Host {
        self.host
    }

    /// Evaluate a parsed expression in the root scope.
    pub fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.eval_in(expr, Rc::new(Scope::Root))
    }

    /// Evaluate `expr` with `scope` as the innermost scope.
    pub(crate) fn eval_in(&mut self, expr: &Expr, scope: Rc<Scope>) -> Result<Value, EvalError> {
        let saved = core::mem::replace(&mut self.scope, scope);
        let result = self.eval_expr(expr);
        self.scope = saved;
        result
    }

    /// Evaluate an expression node.
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        // Check depth before recursing
        if self.depth >= self.options.max_depth {
            return Err(EvalError::from(StackOverflow {
                depth: self.depth,
                max_depth: self.options.max_depth,
            })
            .or_span(&expr.span));
        }

        self.depth += 1;
        // Debug builds spend several kilobytes of native stack per level.
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_expr_inner(expr));
        self.depth -= 1;

        result.map_err(|e| e.or_span(&expr.span))
    }

    /// Inner evaluation logic (no depth tracking).
    fn eval_expr_inner(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::Nil => Value::Nil,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::BigInt(b) => Value::BigInt(b.clone()),
                Literal::Float(x) => Value::Number(*x),
                Literal::Str(s) => Value::string(s.as_str()),
            }),

            ExprKind::Ident(name) => self.lookup(name),

            ExprKind::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_expr(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(values))
            }

            ExprKind::Kvc { entries, result } => {
                let kvc = Rc::new(Kvc::lazy(entries, self.scope.clone()));
                match result {
                    Some(result) => {
                        let scope = Rc::new(Scope::Kvc {
                            kvc,
                            parent: self.scope.clone(),
                        });
                        self.eval_in(result, scope)
                    }
                    None => Ok(Value::Kvc(kvc)),
                }
            }

            ExprKind::FormatStr(segments) => {
                let mut text = String::new();
                for segment in segments {
                    match segment {
                        FormatSegment::Text(s) => text.push_str(s),
                        FormatSegment::Expr(e) => {
                            let value = self.eval_expr(e)?;
                            text.push_str(&self.render(&value)?);
                        }
                    }
                }
                Ok(Value::string(text))
            }

            ExprKind::Unary { op, expr: operand } => {
                let value = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Neg => Ok(operators::eval_negate(&value)?),
                    UnaryOp::Not => match value {
                        Value::Bool(b) => Ok(Value::Bool(!b)),
                        other => Err(RuntimeError::type_mismatch(format!(
                            "'not' expects a Boolean, got {}",
                            other.type_name()
                        ))
                        .into()),
                    },
                }
            }

            ExprKind::Binary { op, left, right } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                match (op, &left, &right) {
                    (BinaryOp::Eq, _, _) => Ok(Value::Bool(self.equals(&left, &right)?)),
                    (BinaryOp::NotEq, _, _) => Ok(Value::Bool(!self.equals(&left, &right)?)),
                    (BinaryOp::Add, Value::Kvc(a), Value::Kvc(b)) => self.merge(a, b),
                    _ => Ok(operators::eval_binary(*op, &left, &right)?),
                }
            }

            ExprKind::Logical { op, left, right } => {
                let left = self.eval_expr(left)?;
                match op {
                    LogicalOp::And => match left {
                        Value::Bool(false) => Ok(Value::Bool(false)),
                        Value::Bool(true) | Value::Nil => {
                            let right = self.eval_expr(right)?;
                            match (left, right) {
                                (_, Value::Bool(false)) => Ok(Value::Bool(false)),
                                (Value::Bool(true), Value::Bool(true)) => Ok(Value::Bool(true)),
                                (_, Value::Bool(_) | Value::Nil) => Ok(Value::Nil),
                                (_, other) => Err(logical_operand("and", &other)),
                            }
                        }
                        other => Err(logical_operand("and", &other)),
                    },
                    LogicalOp::Or => match left {
                        Value::Bool(true) => Ok(Value::Bool(true)),
                        Value::Bool(false) | Value::Nil => {
                            let right = self.eval_expr(right)?;
                            match (left, right) {
                                (_, Value::Bool(true)) => Ok(Value::Bool(true)),
                                (Value::Bool(false), Value::Bool(false)) => Ok(Value::Bool(false)),
                                (_, Value::Bool(_) | Value::Nil) => Ok(Value::Nil),
                                (_, other) => Err(logical_operand("or", &other)),
                            }
                        }
                        other => Err(logical_operand("or", &other)),
                    },
                    LogicalOp::Coalesce => match left {
                        Value::Nil => self.eval_expr(right),
                        other => Ok(other),
                    },
                    LogicalOp::Chain => match left {
                        Value::Nil => Ok(Value::Nil),
                        _ => self.eval_expr(right),
                    },
                }
            }

            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.condition(cond)? {
                    self.eval_expr(then_branch)
                } else {
                    self.eval_expr(else_branch)
                }
            }

            ExprKind::Case { arms, default } => {
                for (cond, value) in arms {
                    if self.condition(cond)? {
                        return self.eval_expr(value);
                    }
                }
                match default {
                    Some(default) => self.eval_expr(default),
                    None => Ok(Value::Nil),
                }
            }

            ExprKind::Lambda { params, body } => Ok(Value::function(LambdaFunction::new(
                params.clone(),
                body.clone(),
                self.scope.clone(),
            ))),

            ExprKind::Call { callable, args } => {
                let callable = self.eval_expr(callable)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(&callable, &args)
            }

            ExprKind::Index { value, index } => {
                let value = self.eval_expr(value)?;
                let index = self.eval_expr(index)?;
                self.index(&value, &index)
            }

            ExprKind::Member { value, key, safe } => match self.eval_expr(value)? {
                Value::Nil if *safe => Ok(Value::Nil),
                Value::Kvc(kvc) => Ok(self.kvc_get(&kvc, key)?.unwrap_or(Value::Nil)),
                other => Err(RuntimeError::type_mismatch(format!(
                    "Cannot read member '{}' of {}",
                    key,
                    other.type_name()
                ))
                .into()),
            },
        }
    }

    fn lookup(&mut self, name: &str) -> Result<Value, EvalError> {
        let scope = self.scope.clone();
        match scope.lookup(name) {
            Some(Binding::Value(value)) => Ok(value),
            Some(Binding::Entry(kvc)) => Ok(self.kvc_get(&kvc, name)?.unwrap_or(Value::Nil)),
            None => Err(UndefinedVariable {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// `if`/`case` conditions: nil counts as false.
    fn condition(&mut self, cond: &Expr) -> Result<bool, EvalError> {
        match self.eval_expr(cond)? {
            Value::Bool(b) => Ok(b),
            Value::Nil => Ok(false),
            other => Err(EvalError::from(RuntimeError::type_mismatch(format!(
                "Condition must be a Boolean, got {}",
                other.type_name()
            )))
            .or_span(&cond.span)),
        }
    }

    /// Call a function value with evaluated arguments.
    pub fn call(&mut self, callable: &Value, args: &[Value]) -> Result<Value, EvalError> {
        match callable {
            Value::Function(function) => {
                let function = function.clone();
                function.call(self, args)
            }
            other => Err(RuntimeError::type_mismatch(format!(
                "Value of type {} is not callable",
                other.type_name()
            ))
            .into()),
        }
    }

    /// Call with at most as many arguments as the function declares.
    ///
    /// Used by the list built-ins, which offer `(item, index)` but accept
    /// callbacks that only take `(item)`.
    pub fn call_fitted(&mut self, callable: &Value, args: &[Value]) -> Result<Value, EvalError> {
        let count = match callable {
            Value::Function(f) => f.arity().map_or(args.len(), |n| n.min(args.len())),
            _ => args.len(),
        };
        self.call(callable, &args[..count])
    }

    /// Language-level indexing: out of range reads yield nil.
    fn index(&mut self, value: &Value, index: &Value) -> Result<Value, EvalError> {
        match (value, index) {
            (Value::Nil, _) => Ok(Value::Nil),
            (Value::List(items), Value::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Nil)),
            (Value::Range(range), Value::Int(i)) => Ok(u64::try_from(*i)
                .ok()
                .and_then(|i| range.get(i))
                .map_or(Value::Nil, Value::Int)),
            (Value::String(s), Value::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map_or(Value::Nil, |c| Value::string(c.to_string()))),
            (Value::Kvc(kvc), Value::String(key)) => {
                Ok(self.kvc_get(kvc, key)?.unwrap_or(Value::Nil))
            }
            (value, index) => Err(RuntimeError::type_mismatch(format!(
                "Cannot index {} with {}",
                value.type_name(),
                index.type_name()
            ))
            .into()),
        }
    }

    /// Read an entry of a collection, evaluating it on first access.
    ///
    /// Returns `Ok(None)` when the key is absent. Reading an entry while it is
    /// being evaluated is a circular reference; an entry whose evaluation
    /// failed is left pending so a later read reports the error again.
    pub fn kvc_get(&mut self, kvc: &Rc<Kvc>, key: &str) -> Result<Option<Value>, EvalError> {
        let Some(entry) = kvc.entry(key) else {
            return Ok(None);
        };
        if let Some(value) = entry.ready() {
            return Ok(Some(value));
        }

        match entry.take_slot() {
            Slot::Ready(value) => {
                entry.set_slot(Slot::Ready(value.clone()));
                Ok(Some(value))
            }
            Slot::Evaluating => Err(CircularReference {
                key: entry.name().to_string(),
            }
            .into()),
            Slot::Pending(expr) => {
                let parent = kvc.parent().cloned().unwrap_or_else(|| Rc::new(Scope::Root));
                let scope = Rc::new(Scope::Kvc {
                    kvc: kvc.clone(),
                    parent,
                });
                match self.eval_in(&expr, scope) {
                    Ok(value) => {
                        entry.set_slot(Slot::Ready(value.clone()));
                        Ok(Some(value))
                    }
                    Err(e) => {
                        entry.set_slot(Slot::Pending(expr));
                        Err(e)
                    }
                }
            }
        }
    }

    /// Evaluate every entry reachable from `value`.
    ///
    /// Fails when a collection (transitively) contains itself.
    pub fn force_deep(&mut self, value: &Value) -> Result<(), EvalError> {
        let mut path = Vec::new();
        self.force_on_path(value, &mut path)
    }

    fn force_on_path(&mut self, value: &Value, path: &mut Vec<Rc<Kvc>>) -> Result<(), EvalError> {
        match value {
            Value::List(items) => {
                for item in items.iter() {
                    self.force_on_path(item, path)?;
                }
            }
            Value::Kvc(kvc) => {
                if path.iter().any(|seen| Rc::ptr_eq(seen, kvc)) {
                    return Err(CircularReference {
                        key: kvc.keys().next().unwrap_or_default().to_string(),
                    }
                    .into());
                }
                path.push(kvc.clone());
                let names: Vec<String> = kvc.keys().map(str::to_string).collect();
                for name in names {
                    if let Some(entry) = self.kvc_get(kvc, &name)? {
                        self.force_on_path(&entry, path)?;
                    }
                }
                path.pop();
            }
            _ => {}
        }
        Ok(())
    }

    /// Text of a value as it appears inside format strings.
    pub fn render(&mut self, value: &Value) -> Result<String, EvalError> {
        self.force_deep(value)?;
        Ok(value.to_string())
    }

    /// Equality for `=` and `!=`: collections compare by content.
    pub fn equals(&mut self, left: &Value, right: &Value) -> Result<bool, EvalError> {
        match (left, right) {
            (Value::Kvc(a), Value::Kvc(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                if a.len() != b.len() {
                    return Ok(false);
                }
                let names: Vec<String> = a.keys().map(str::to_string).collect();
                for name in names {
                    if !b.contains_key(&name) {
                        return Ok(false);
                    }
                    let x = self.kvc_get(a, &name)?.unwrap_or(Value::Nil);
                    let y = self.kvc_get(b, &name)?.unwrap_or(Value::Nil);
                    if !self.equals(&x, &y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !self.equals(x, y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(left == right),
        }
    }

    /// `{..} + {..}`: right entries win, nested collections merge.
    fn merge(&mut self, left: &Rc<Kvc>, right: &Rc<Kvc>) -> Result<Value, EvalError> {
        let mut merged: Vec<(String, Value)> = Vec::with_capacity(left.len() + right.len());
        let left_names: Vec<String> = left.keys().map(str::to_string).collect();
        for name in left_names {
            let value = self.kvc_get(left, &name)?.unwrap_or(Value::Nil);
            merged.push((name, value));
        }

        let right_names: Vec<String> = right.keys().map(str::to_string).collect();
        for name in right_names {
            let value = self.kvc_get(right, &name)?.unwrap_or(Value::Nil);
            match merged
                .iter()
                .position(|(existing, _)| existing.to_lowercase() == name.to_lowercase())
            {
                Some(pos) => {
                    let combined = match (&merged[pos].1, value) {
                        (Value::Kvc(a), Value::Kvc(b)) => {
                            let a = a.clone();
                            self.merge(&a, &b)?
                        }
                        (_, value) => value,
                    };
                    merged[pos].1 = combined;
                }
                None => merged.push((name, value)),
            }
        }

        Ok(Value::Kvc(Rc::new(Kvc::from_values(merged))))
    }
}

fn logical_operand(op: &str, value: &Value) -> EvalError {
    RuntimeError::type_mismatch(format!(
        "'{}' expects Boolean operands, got {}",
        op,
        value.type_name()
    ))
    .into()
}
