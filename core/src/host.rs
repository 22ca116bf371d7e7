//! Host services reachable from expressions.
//!
//! The `file`, `fileexists`, `isfile`, `dirlist` and `log` built-ins never
//! touch the outside world directly; they go through the `Host` installed on
//! the evaluation context. Over the C ABI the host is a table of callbacks
//! (see `ffi::callbacks`); in Rust it is any implementation of this trait.

use std::fs;
use std::path::Path;

use crate::evaluator::{RuntimeError, codes};

/// Services a host provides to a running evaluation.
///
/// Every call happens synchronously on the evaluation thread. A failure
/// aborts only the construct that triggered it.
pub trait Host {
    fn file_read_text(&self, path: &str) -> Result<String, RuntimeError>;

    fn file_exists(&self, path: &str) -> Result<bool, RuntimeError>;

    fn is_file(&self, path: &str) -> Result<bool, RuntimeError>;

    /// Absolute paths of the entries of `path`, sorted.
    fn dir_list(&self, path: &str) -> Result<Vec<String>, RuntimeError>;

    /// Fire-and-forget diagnostic output.
    fn log_line(&self, text: &str);
}

/// Build a callback failure without location.
pub fn callback_error(code: u32, message: impl Into<String>) -> RuntimeError {
    RuntimeError::Callback {
        code,
        message: message.into(),
        line: -1,
        column: -1,
    }
}

fn not_registered(code: u32) -> RuntimeError {
    callback_error(code, "host callback not registered")
}

/// Host with no services; every service call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHost;

impl Host for NoHost {
    fn file_read_text(&self, _path: &str) -> Result<String, RuntimeError> {
        Err(not_registered(codes::HOST_FILE))
    }

    fn file_exists(&self, _path: &str) -> Result<bool, RuntimeError> {
        Err(not_registered(codes::HOST_FILE_EXISTS))
    }

    fn is_file(&self, _path: &str) -> Result<bool, RuntimeError> {
        Err(not_registered(codes::HOST_IS_FILE))
    }

    fn dir_list(&self, _path: &str) -> Result<Vec<String>, RuntimeError> {
        Err(not_registered(codes::HOST_DIR_LIST))
    }

    fn log_line(&self, _text: &str) {}
}

/// Host backed by `std::fs`, with a cap on the size of files read.
#[derive(Debug, Clone, Copy)]
pub struct StdHost {
    pub max_file_bytes: u64,
}

impl Default for StdHost {
    fn default() -> Self {
        Self {
            max_file_bytes: 1_000_000,
        }
    }
}

impl Host for StdHost {
    fn file_read_text(&self, path: &str) -> Result<String, RuntimeError> {
        let meta = fs::metadata(path)
            .map_err(|e| callback_error(codes::HOST_FILE, format!("file '{}': {}", path, e)))?;
        if !meta.is_file() {
            return Err(callback_error(
                codes::HOST_FILE,
                format!("file '{}' is not a regular file", path),
            ));
        }
        if meta.len() > self.max_file_bytes {
            return Err(callback_error(
                codes::HOST_FILE,
                format!(
                    "file '{}' is larger than {} bytes",
                    path, self.max_file_bytes
                ),
            ));
        }
        fs::read_to_string(path)
            .map_err(|e| callback_error(codes::HOST_FILE, format!("file '{}': {}", path, e)))
    }

    fn file_exists(&self, path: &str) -> Result<bool, RuntimeError> {
        Ok(Path::new(path).exists())
    }

    fn is_file(&self, path: &str) -> Result<bool, RuntimeError> {
        Ok(Path::new(path).is_file())
    }

    fn dir_list(&self, path: &str) -> Result<Vec<String>, RuntimeError> {
        let fail = |e: std::io::Error| {
            callback_error(codes::HOST_DIR_LIST, format!("dirlist '{}': {}", path, e))
        };
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(fail)? {
            let entry = entry.map_err(fail)?;
            let full = std::path::absolute(entry.path()).map_err(fail)?;
            entries.push(full.to_string_lossy().into_owned());
        }
        entries.sort();
        Ok(entries)
    }

    fn log_line(&self, text: &str) {
        tracing::info!(target: "funcscript::log", "{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_host_rejects_every_service() {
        let err = NoHost.file_read_text("x").unwrap_err();
        assert_eq!(err.code(), codes::HOST_FILE);
        assert_eq!(err.to_string(), "host callback not registered");
        assert_eq!(NoHost.dir_list("x").unwrap_err().code(), codes::HOST_DIR_LIST);
    }

    #[test]
    fn test_std_host_reads_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("b.txt");
        std::fs::write(&file, "hello").unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();

        let host = StdHost::default();
        let file = file.to_string_lossy().into_owned();
        assert_eq!(host.file_read_text(&file).unwrap(), "hello");
        assert!(host.is_file(&file).unwrap());

        let listed = host.dir_list(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].ends_with("a"));
        assert!(listed[1].ends_with("b.txt"));
    }

    #[test]
    fn test_std_host_enforces_size_cap() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "0123456789").unwrap();

        let host = StdHost { max_file_bytes: 4 };
        let err = host.file_read_text(&file.to_string_lossy()).unwrap_err();
        assert_eq!(err.code(), codes::HOST_FILE);
    }
}
