mod parsed_expr;
pub mod parser;
mod syntax;
pub mod error;

// Re-export the parser and rule enum for external use
pub use parser::ExpressionParser;
pub use parser::Rule;
pub use parser::parse;

pub use parsed_expr::{Expr, ExprKind, FormatSegment, Literal};
pub use syntax::{BinaryOp, LogicalOp, Span, UnaryOp};
pub use error::{ParseError, ParseErrorKind};
