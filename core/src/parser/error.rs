use crate::parser::{Rule, Span};

/// Parser error with the 1-based position it was raised at.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

/// Specific kinds of parse errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("Empty expression")]
    Empty,
    /// Other parse errors (catch-all for Pest errors we don't specifically handle)
    #[error("{message}")]
    Other { message: String },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self {
            line: span.line,
            column: span.column,
            kind,
            span,
        }
    }

    pub(crate) fn empty(source: &str) -> Self {
        Self::new(ParseErrorKind::Empty, Span::new(0..source.len(), 1, 1))
    }

    /// Message without the position suffix.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Convert Pest error to human-readable ParseError
pub fn convert_pest_error(err: pest::error::Error<Rule>, source: &str) -> ParseError {
    use pest::error::{ErrorVariant, InputLocation, LineColLocation};

    let range = match err.location {
        InputLocation::Pos(pos) => pos..pos,
        InputLocation::Span((start, end)) => start..end,
    };
    let range = range.start.min(source.len())..range.end.min(source.len());
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };

    let kind = match err.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => ParseErrorKind::UnexpectedToken {
            expected: format_expected_rules(&positives),
            found: format_found(source, range.start, &negatives),
        },
        ErrorVariant::CustomError { message } => ParseErrorKind::Other { message },
    };

    ParseError::new(kind, Span::new(range, line.max(1), column.max(1)))
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    if rules.is_empty() {
        return "something else".to_string();
    }

    // Group related rules into higher-level concepts
    let mut concepts: Vec<&str> = Vec::new();
    for rule in rules {
        let concept = match rule {
            Rule::integer | Rule::float | Rule::boolean | Rule::nil_lit | Rule::string => {
                "literal"
            }
            Rule::ident => "identifier",
            Rule::EOI => "end of input",
            Rule::kw_then => "'then'",
            Rule::kw_else => "'else'",
            Rule::call_op | Rule::grouped => "'('",
            _ => "expression",
        };
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    }

    match concepts.split_last() {
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
        None => "something else".to_string(),
    }
}

/// Describe what sits at the failure position.
fn format_found(source: &str, pos: usize, rules: &[Rule]) -> String {
    if let Some(rule) = rules.first() {
        return format!("{:?}", rule);
    }
    match source[pos..].chars().next() {
        Some(c) => format!("'{}'", c),
        None => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_format_expected_rules() {
        let rules = vec![Rule::integer, Rule::float];
        assert_eq!(format_expected_rules(&rules), "literal");

        let rules = vec![Rule::ident, Rule::EOI];
        assert_eq!(format_expected_rules(&rules), "identifier or end of input");
    }

    #[test]
    fn test_incomplete_if_reports_position() {
        let err = parse("if true then 1").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.column >= 1);
        assert!(err.message().contains("Expected"), "{}", err);
    }

    #[test]
    fn test_error_on_second_line() {
        let err = parse("1 +\n  * 2").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 3);
        assert_eq!(err.span.line, 2);
    }

    #[test]
    fn test_empty_source() {
        let err = parse("   ").unwrap_err();
        assert_eq!(err.line, 1);
    }
}
