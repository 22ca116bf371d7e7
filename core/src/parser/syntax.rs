// Common syntax structures shared by the parser and the evaluator.

use core::fmt;
use core::ops::Range;

/// Byte range of a node in its source text, plus the 1-based line/column of
/// its first character.
///
/// Closures outlive the source they were parsed from, so the location is
/// resolved at parse time instead of being recomputed from the text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub range: Range<usize>,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(range: Range<usize>, line: usize, column: usize) -> Self {
        Self {
            range,
            line,
            column,
        }
    }

    pub fn str_of<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }
}

impl From<pest::Span<'_>> for Span {
    fn from(s: pest::Span<'_>) -> Self {
        let (line, column) = s.start_pos().line_col();
        Self::new(s.start()..s.end(), line, column)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

/// Operators whose right operand is only evaluated on demand.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    /// `a ?? b`: `a` unless it is nil.
    Coalesce,
    /// `a ?! b`: nil when `a` is nil, otherwise `b`.
    Chain,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "div",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
        };
        f.write_str(s)
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Coalesce => "??",
            LogicalOp::Chain => "?!",
        };
        f.write_str(s)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => f.write_str("-"),
            UnaryOp::Not => f.write_str("not "),
        }
    }
}
