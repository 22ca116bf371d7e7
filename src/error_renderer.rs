//! Error rendering using ariadne
//!
//! Located errors are drawn against the source they came from; the rest are
//! printed as a single line.

use crate::Error;
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render an error to stderr.
///
/// # Example
/// ```no_run
/// use funcscript::{Vm, render_error};
///
/// let vm = Vm::new().unwrap();
/// let source = "1 +";
/// if let Err(e) = vm.eval(source) {
///     render_error(&e, source);
/// }
/// ```
pub fn render_error(error: &Error, source: &str) {
    render_error_to_writer(error, source, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer.
pub fn render_error_to(error: &Error, source: &str, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, source, writer, true)
}

pub fn render_error_to_string(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Same as `render_error_to_string` but without ANSI color codes.
pub fn render_error_to_string_no_color(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Char offset of a 1-based `(line, column)`, clamped to the source.
fn char_offset(source: &str, line: i32, column: i32) -> usize {
    let mut offset = 0;
    for (i, text) in source.split('\n').enumerate() {
        let width = text.chars().count();
        if i + 1 == line as usize {
            return offset + (column.max(1) as usize - 1).min(width);
        }
        offset += width + 1;
    }
    source.chars().count()
}

fn render_error_to_writer(
    error: &Error,
    source: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let Some((line, column)) = error.location() else {
        let code = error.code();
        return if code == 0 {
            writeln!(writer, "Error: {error}")
        } else {
            writeln!(writer, "Error[{code}]: {error}")
        };
    };

    let start = char_offset(source, line, column);
    let end = (start + 1).min(source.chars().count()).max(start);
    let kind = match error {
        Error::Compile { .. } => "syntax error",
        Error::Callback { .. } => "host error",
        _ => "runtime error",
    };

    Report::build(ReportKind::Error, ("<input>", start..end))
        .with_code(error.code())
        .with_message(kind)
        .with_config(ariadne::Config::default().with_color(use_color))
        .with_label(
            Label::new(("<input>", start..end))
                .with_message(error.to_string())
                .with_color(Color::Red),
        )
        .finish()
        .write(("<input>", Source::from(source)), writer)
}
