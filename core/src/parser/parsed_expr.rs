use core::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::parser::{BinaryOp, LogicalOp, Span, UnaryOp};

/// A parsed expression node together with the span it was parsed from.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Ident(String),
    List(Vec<Expr>),
    /// `{ key: value, ...; eval result }`. Entry bodies are shared with the
    /// lazy collections built from them.
    Kvc {
        entries: Vec<(String, Rc<Expr>)>,
        result: Option<Box<Expr>>,
    },
    FormatStr(Vec<FormatSegment>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Case {
        arms: Vec<(Expr, Expr)>,
        default: Option<Box<Expr>>,
    },
    Lambda {
        params: Rc<[String]>,
        body: Rc<Expr>,
    },
    Call {
        callable: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        value: Box<Expr>,
        key: String,
        safe: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    BigInt(Rc<BigInt>),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone)]
pub enum FormatSegment {
    Text(String),
    Expr(Expr),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Fully parenthesized rendering, used to inspect how a source text was
/// grouped.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{}", lit),
            ExprKind::Ident(name) => f.write_str(name),
            ExprKind::List(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            ExprKind::Kvc { entries, result } => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                if let Some(result) = result {
                    if !entries.is_empty() {
                        f.write_str("; ")?;
                    }
                    write!(f, "eval {}", result)?;
                }
                f.write_str("}")
            }
            ExprKind::FormatStr(segments) => {
                f.write_str("f\"")?;
                for segment in segments {
                    match segment {
                        FormatSegment::Text(text) => f.write_str(text)?,
                        FormatSegment::Expr(expr) => write!(f, "{{{}}}", expr)?,
                    }
                }
                f.write_str("\"")
            }
            ExprKind::Unary { op, expr } => write!(f, "({}{})", op, expr),
            ExprKind::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            ExprKind::Logical { op, left, right } => write!(f, "({} {} {})", left, op, right),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => write!(
                f,
                "(if {} then {} else {})",
                cond, then_branch, else_branch
            ),
            ExprKind::Case { arms, default } => {
                f.write_str("(case ")?;
                for (i, (cond, value)) in arms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", cond, value)?;
                }
                if let Some(default) = default {
                    write!(f, ", {}", default)?;
                }
                f.write_str(")")
            }
            ExprKind::Lambda { params, body } => {
                f.write_str("((")?;
                write_list(f, params)?;
                write!(f, ") => {})", body)
            }
            ExprKind::Call { callable, args } => {
                write!(f, "{}(", callable)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            ExprKind::Index { value, index } => write!(f, "{}[{}]", value, index),
            ExprKind::Member { value, key, safe } => {
                write!(f, "{}{}{}", value, if *safe { "?." } else { "." }, key)
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nil => f.write_str("nil"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::BigInt(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Str(s) => write!(f, "{:?}", s),
        }
    }
}
