//! Host services reachable from expressions (`file`, `dirlist`, `log`, ...).

use funcscript_core::evaluator::RuntimeError;
use funcscript_core::host::{Host, StdHost};

/// Failure reported by a service.
///
/// A `code` of 0 lets the engine pick the per-service default (2601 for
/// `file`, 2602 `fileexists`, 2603 `isfile`, 2604 `dirlist`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub code: u32,
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
        }
    }

    pub fn with_code(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<RuntimeError> for ServiceError {
    fn from(error: RuntimeError) -> Self {
        match error {
            RuntimeError::Callback { code, message, .. } => ServiceError { code, message },
            other => ServiceError::with_code(other.code(), other.to_string()),
        }
    }
}

/// Services a `Vm` offers to the expressions it evaluates.
///
/// Calls are synchronous and happen on the thread that is evaluating.
pub trait HostServices {
    fn file_read_text(&self, path: &str) -> Result<String, ServiceError>;

    fn file_exists(&self, path: &str) -> Result<bool, ServiceError>;

    fn is_file(&self, path: &str) -> Result<bool, ServiceError>;

    /// Absolute paths of the entries of `path`, sorted.
    fn dir_list(&self, path: &str) -> Result<Vec<String>, ServiceError>;

    fn log_line(&self, text: &str);
}

/// Services backed by the local file system.
///
/// Reads are capped at `max_file_bytes`; log lines go to `tracing` under the
/// `funcscript::log` target.
#[derive(Debug, Clone, Copy)]
pub struct StdFsServices {
    host: StdHost,
}

impl Default for StdFsServices {
    fn default() -> Self {
        Self::new(StdHost::default().max_file_bytes)
    }
}

impl StdFsServices {
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            host: StdHost { max_file_bytes },
        }
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.host.max_file_bytes
    }
}

impl HostServices for StdFsServices {
    fn file_read_text(&self, path: &str) -> Result<String, ServiceError> {
        Ok(self.host.file_read_text(path)?)
    }

    fn file_exists(&self, path: &str) -> Result<bool, ServiceError> {
        Ok(self.host.file_exists(path)?)
    }

    fn is_file(&self, path: &str) -> Result<bool, ServiceError> {
        Ok(self.host.is_file(path)?)
    }

    fn dir_list(&self, path: &str) -> Result<Vec<String>, ServiceError> {
        Ok(self.host.dir_list(path)?)
    }

    fn log_line(&self, text: &str) {
        self.host.log_line(text);
    }
}
