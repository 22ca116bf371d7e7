//! Errors reported by the host binding.
//!
//! Native failures arrive as error records (code, message, location); they
//! are mapped onto the variants below by code. Binding-side failures (values
//! that cannot be written as literals, malformed snapshots) get their own
//! variants.

use funcscript_core::evaluator::codes;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The source did not parse. Always located.
    #[error("{message}")]
    Compile {
        message: String,
        line: i32,
        column: i32,
    },

    /// Evaluation failed (undefined name, division by zero, bad argument to a
    /// built-in, ...).
    #[error("{message}")]
    Runtime {
        code: u32,
        message: String,
        line: i32,
        column: i32,
    },

    /// Invalid use of the API: null or non-UTF-8 input, host registration
    /// after the first evaluation, use after close.
    #[error("{message}")]
    Argument { code: u32, message: String },

    #[error("{message}")]
    ArityMismatch { message: String },

    #[error("{message}")]
    InvalidHandle { message: String },

    #[error("{message}")]
    TypeMismatch { code: u32, message: String },

    #[error("{message}")]
    IndexOutOfRange { message: String },

    #[error("{message}")]
    KeyNotFound { message: String },

    #[error("{message}")]
    ResourceExceeded { message: String },

    /// A host service failed.
    #[error("{message}")]
    Callback {
        code: u32,
        message: String,
        line: i32,
        column: i32,
    },

    #[error("{message}")]
    Internal { message: String },

    /// A host value that has no literal spelling (non-finite float, function
    /// descriptor).
    #[error("cannot write {0} as a literal")]
    InvalidLiteral(String),

    #[error("malformed snapshot: {0}")]
    Snapshot(String),

    #[error("could not create an evaluation context")]
    ContextCreation,
}

impl Error {
    /// Build the variant matching a native error record.
    pub fn from_record(code: u32, line: i32, column: i32, message: String) -> Self {
        match code {
            codes::COMPILE => Error::Compile {
                message,
                line,
                column,
            },
            codes::NULL_CONTEXT
            | codes::NULL_ARGUMENT
            | codes::INVALID_UTF8
            | codes::NULL_KEY
            | codes::KEY_NOT_UTF8
            | codes::NULL_ARGV
            | codes::INVALID_STATE => Error::Argument { code, message },
            codes::ARITY_MISMATCH => Error::ArityMismatch { message },
            codes::INVALID_HANDLE => Error::InvalidHandle { message },
            codes::TYPE_MISMATCH | codes::LEN_UNSUPPORTED => Error::TypeMismatch { code, message },
            codes::INDEX_OUT_OF_RANGE => Error::IndexOutOfRange { message },
            codes::KEY_NOT_FOUND => Error::KeyNotFound { message },
            codes::RESOURCE_EXCEEDED => Error::ResourceExceeded { message },
            codes::INTERNAL => Error::Internal { message },
            codes::RUNTIME | codes::DIVISION_BY_ZERO => Error::Runtime {
                code,
                message,
                line,
                column,
            },
            _ => Error::Callback {
                code,
                message,
                line,
                column,
            },
        }
    }

    /// Numeric code; binding-side failures report 0.
    pub fn code(&self) -> u32 {
        match self {
            Error::Compile { .. } => codes::COMPILE,
            Error::Runtime { code, .. }
            | Error::Argument { code, .. }
            | Error::TypeMismatch { code, .. }
            | Error::Callback { code, .. } => *code,
            Error::ArityMismatch { .. } => codes::ARITY_MISMATCH,
            Error::InvalidHandle { .. } => codes::INVALID_HANDLE,
            Error::IndexOutOfRange { .. } => codes::INDEX_OUT_OF_RANGE,
            Error::KeyNotFound { .. } => codes::KEY_NOT_FOUND,
            Error::ResourceExceeded { .. } => codes::RESOURCE_EXCEEDED,
            Error::Internal { .. } => codes::INTERNAL,
            Error::InvalidLiteral(_) | Error::Snapshot(_) | Error::ContextCreation => 0,
        }
    }

    /// 1-based `(line, column)` when the error points into the source.
    pub fn location(&self) -> Option<(i32, i32)> {
        match self {
            Error::Compile { line, column, .. }
            | Error::Runtime { line, column, .. }
            | Error::Callback { line, column, .. }
                if *line >= 1 =>
            {
                Some((*line, (*column).max(1)))
            }
            _ => None,
        }
    }
}
