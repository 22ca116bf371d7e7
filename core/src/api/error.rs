//! Public error type for the context and marshaller API.
//!
//! Every failure carries the numeric code reported across the C boundary
//! (see `evaluator::codes`) and, for compile and runtime errors, the 1-based
//! source location when known.

use crate::evaluator::{EvalError, codes};
use crate::parser::ParseError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Invalid API usage (null pointer, invalid UTF-8).
    #[error("{message}")]
    Api { code: u32, message: String },

    /// The source text did not parse. Always located.
    #[error(transparent)]
    Compilation(#[from] ParseError),

    /// Evaluation failed, including failures reported by host callbacks.
    #[error(transparent)]
    Runtime(#[from] EvalError),

    #[error("invalid handle {0:#x}")]
    InvalidHandle(u64),

    #[error("{0}")]
    TypeMismatch(String),

    /// `len` on a value without a length.
    #[error("{0}")]
    LenUnsupported(String),

    #[error("Index {index} out of range (length: {len})")]
    IndexOutOfRange { index: i64, len: u64 },

    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    ResourceExceeded(String),

    /// A panic caught at the ABI boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn api(code: u32, message: impl Into<String>) -> Self {
        Error::Api {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Error::Api { code, .. } => *code,
            Error::Compilation(_) => codes::COMPILE,
            Error::Runtime(e) => e.code(),
            Error::InvalidHandle(_) => codes::INVALID_HANDLE,
            Error::TypeMismatch(_) => codes::TYPE_MISMATCH,
            Error::LenUnsupported(_) => codes::LEN_UNSUPPORTED,
            Error::IndexOutOfRange { .. } => codes::INDEX_OUT_OF_RANGE,
            Error::KeyNotFound(_) => codes::KEY_NOT_FOUND,
            Error::InvalidState(_) => codes::INVALID_STATE,
            Error::ResourceExceeded(_) => codes::RESOURCE_EXCEEDED,
            Error::Internal(_) => codes::INTERNAL,
        }
    }

    /// 1-based `(line, column)`, if the error is tied to a source position.
    pub fn location(&self) -> Option<(i32, i32)> {
        match self {
            Error::Compilation(e) => Some((to_i32(e.line), to_i32(e.column))),
            Error::Runtime(e) => e.location(),
            _ => None,
        }
    }

    /// Message without location suffixes.
    pub fn message(&self) -> String {
        match self {
            Error::Compilation(e) => e.message(),
            other => other.to_string(),
        }
    }
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
