//! Runtime evaluation errors.
//!
//! # Error Categories
//!
//! - **Runtime errors**: failures of a single construct (type mismatch,
//!   division by zero, a host callback refusing a file read). Each carries the
//!   numeric code reported across the C boundary.
//!
//! - **Resource exceeded errors**: evaluation depth exhausted, or a built-in
//!   asked to build a list past its length limit.

use crate::parser::Span;

/// Evaluation error with the location of the node that raised it, when known.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalErrorKind {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    ResourceExceeded(#[from] ResourceExceeded),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },

    #[error("{message}")]
    TypeMismatch { message: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Index {index} out of range (length: {len})")]
    IndexOutOfRange { index: i64, len: u64 },

    #[error("Key '{key}' not found")]
    KeyNotFound { key: String },

    #[error("Call arity mismatch for '{name}': expected {expected} arguments but got {got}.")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("{function}: {message}")]
    InvalidArgument { function: String, message: String },

    #[error("Circular reference while evaluating '{key}'")]
    CircularReference { key: String },

    /// A host service failed or vetoed the operation.
    #[error("{message}")]
    Callback {
        code: u32,
        message: String,
        line: i32,
        column: i32,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceExceeded {
    #[error("Evaluation stack overflow: depth {depth} exceeds maximum of {max_depth}")]
    StackOverflow { depth: usize, max_depth: usize },

    #[error("{function}: {len} elements exceed the maximum list length of {max_len}")]
    ListTooLong {
        function: String,
        len: u64,
        max_len: u64,
    },
}

/// Numeric error codes shared by the native API and the C header.
pub mod codes {
    pub const RUNTIME: u32 = 1;
    pub const COMPILE: u32 = 1000;
    pub const NULL_CONTEXT: u32 = 2001;
    pub const NULL_ARGUMENT: u32 = 2002;
    pub const INVALID_UTF8: u32 = 2003;
    pub const ARITY_MISMATCH: u32 = 2004;
    pub const DIVISION_BY_ZERO: u32 = 2005;
    pub const INVALID_HANDLE: u32 = 2006;
    pub const TYPE_MISMATCH: u32 = 2007;
    pub const LEN_UNSUPPORTED: u32 = 2008;
    pub const NULL_KEY: u32 = 2009;
    pub const KEY_NOT_UTF8: u32 = 2010;
    pub const NULL_ARGV: u32 = 2011;
    pub const INDEX_OUT_OF_RANGE: u32 = 2012;
    pub const KEY_NOT_FOUND: u32 = 2013;
    pub const INVALID_STATE: u32 = 2014;
    pub const RESOURCE_EXCEEDED: u32 = 2015;
    pub const INTERNAL: u32 = 2099;
    pub const HOST_FILE: u32 = 2601;
    pub const HOST_FILE_EXISTS: u32 = 2602;
    pub const HOST_IS_FILE: u32 = 2603;
    pub const HOST_DIR_LIST: u32 = 2604;
}

impl RuntimeError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn invalid_argument(function: &str, message: impl Into<String>) -> Self {
        RuntimeError::InvalidArgument {
            function: function.to_string(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            RuntimeError::UndefinedVariable { .. }
            | RuntimeError::InvalidArgument { .. }
            | RuntimeError::CircularReference { .. } => codes::RUNTIME,
            RuntimeError::TypeMismatch { .. } => codes::TYPE_MISMATCH,
            RuntimeError::DivisionByZero => codes::DIVISION_BY_ZERO,
            RuntimeError::IndexOutOfRange { .. } => codes::INDEX_OUT_OF_RANGE,
            RuntimeError::KeyNotFound { .. } => codes::KEY_NOT_FOUND,
            RuntimeError::ArityMismatch { .. } => codes::ARITY_MISMATCH,
            RuntimeError::Callback { code, .. } => *code,
        }
    }
}

impl EvalError {
    pub fn code(&self) -> u32 {
        match &self.kind {
            EvalErrorKind::Runtime(e) => e.code(),
            EvalErrorKind::ResourceExceeded(_) => codes::RESOURCE_EXCEEDED,
        }
    }

    /// 1-based `(line, column)` of the failure, if known.
    pub fn location(&self) -> Option<(i32, i32)> {
        if let EvalErrorKind::Runtime(RuntimeError::Callback { line, column, .. }) = &self.kind {
            if *line >= 1 {
                return Some((*line, *column));
            }
        }
        self.span
            .as_ref()
            .map(|span| (span.line as i32, span.column as i32))
    }

    /// Attach `span` unless a more precise one is already present.
    pub fn or_span(mut self, span: &Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span.clone());
        }
        self
    }
}

impl From<RuntimeError> for EvalError {
    fn from(e: RuntimeError) -> Self {
        EvalError {
            kind: EvalErrorKind::Runtime(e),
            span: None,
        }
    }
}

impl From<ResourceExceeded> for EvalError {
    fn from(e: ResourceExceeded) -> Self {
        EvalError {
            kind: EvalErrorKind::ResourceExceeded(e),
            span: None,
        }
    }
}
