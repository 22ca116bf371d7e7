//! `Host` implementation that forwards to C callbacks.

use core::ffi::{CStr, c_void};
use std::ffi::CString;

use crate::evaluator::{RuntimeError, codes};
use crate::ffi::types::{FsError, FsHostCallbacks, FsHostQueryFn, FsHostStreamFn};
use crate::host::{Host, callback_error};

/// Trampoline from the `Host` trait to a `FsHostCallbacks` table.
pub(crate) struct CallbackHost {
    callbacks: FsHostCallbacks,
}

impl CallbackHost {
    pub(crate) fn new(callbacks: FsHostCallbacks) -> Self {
        Self { callbacks }
    }

    fn stream(
        &self,
        slot: Option<FsHostStreamFn>,
        service: &'static str,
        fallback: u32,
        path: &str,
    ) -> Result<String, RuntimeError> {
        let callback = slot.ok_or_else(|| not_registered(fallback))?;
        let c_path = c_path(path, service, fallback)?;
        let mut buffer: Vec<u8> = Vec::new();
        let mut error = FsError::empty();
        // SAFETY: the buffer and error record outlive the call; the host only
        // writes through `write_into_vec` while the callback runs.
        let status = unsafe {
            callback(
                self.callbacks.user_data,
                c_path.as_ptr(),
                (&mut buffer as *mut Vec<u8>).cast::<c_void>(),
                write_into_vec,
                &mut error,
            )
        };
        if status != 0 {
            return Err(host_failure(&error, service, fallback));
        }
        String::from_utf8(buffer)
            .map_err(|_| callback_error(fallback, format!("{service}: host returned invalid UTF-8")))
    }

    fn query(
        &self,
        slot: Option<FsHostQueryFn>,
        service: &'static str,
        fallback: u32,
        path: &str,
    ) -> Result<bool, RuntimeError> {
        let callback = slot.ok_or_else(|| not_registered(fallback))?;
        let c_path = c_path(path, service, fallback)?;
        let mut flag: i32 = 0;
        let mut error = FsError::empty();
        // SAFETY: see `stream`.
        let status = unsafe {
            callback(
                self.callbacks.user_data,
                c_path.as_ptr(),
                &mut flag,
                &mut error,
            )
        };
        if status != 0 {
            return Err(host_failure(&error, service, fallback));
        }
        Ok(flag != 0)
    }
}

impl Host for CallbackHost {
    fn file_read_text(&self, path: &str) -> Result<String, RuntimeError> {
        self.stream(self.callbacks.file_read_text, "file", codes::HOST_FILE, path)
    }

    fn file_exists(&self, path: &str) -> Result<bool, RuntimeError> {
        self.query(
            self.callbacks.file_exists,
            "fileexists",
            codes::HOST_FILE_EXISTS,
            path,
        )
    }

    fn is_file(&self, path: &str) -> Result<bool, RuntimeError> {
        self.query(self.callbacks.is_file, "isfile", codes::HOST_IS_FILE, path)
    }

    fn dir_list(&self, path: &str) -> Result<Vec<String>, RuntimeError> {
        let text = self.stream(
            self.callbacks.dir_list,
            "dirlist",
            codes::HOST_DIR_LIST,
            path,
        )?;
        Ok(text
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn log_line(&self, text: &str) {
        let Some(callback) = self.callbacks.log_line else {
            return;
        };
        let Ok(text) = CString::new(text.replace('\0', " ")) else {
            return;
        };
        // SAFETY: `text` is a valid C string for the duration of the call.
        unsafe { callback(self.callbacks.user_data, text.as_ptr()) };
    }
}

/// Appends `len` bytes to the `Vec<u8>` behind `out_ctx`.
unsafe extern "C" fn write_into_vec(out_ctx: *mut c_void, bytes: *const u8, len: u64) {
    if out_ctx.is_null() || bytes.is_null() || len == 0 {
        return;
    }
    let Ok(len) = usize::try_from(len) else {
        return;
    };
    // SAFETY: `out_ctx` is the buffer passed by `CallbackHost::stream`, and
    // the host guarantees `bytes` points to `len` readable bytes.
    unsafe {
        let buffer = &mut *out_ctx.cast::<Vec<u8>>();
        buffer.extend_from_slice(core::slice::from_raw_parts(bytes, len));
    }
}

fn not_registered(code: u32) -> RuntimeError {
    callback_error(code, "host callback not registered")
}

fn c_path(path: &str, service: &str, fallback: u32) -> Result<CString, RuntimeError> {
    CString::new(path)
        .map_err(|_| callback_error(fallback, format!("{service}: path contains a NUL byte")))
}

fn normalize_position(n: i32) -> i32 {
    if n == 0 { -1 } else { n }
}

/// Convert a record filled by a failing callback.
fn host_failure(error: &FsError, service: &str, fallback: u32) -> RuntimeError {
    let code = if error.code == 0 { fallback } else { error.code };
    let message = if error.message.is_null() {
        format!("{service}: host error")
    } else {
        // SAFETY: the host promises a NUL-terminated string that stays valid
        // until the callback's caller returns.
        unsafe { CStr::from_ptr(error.message) }
            .to_string_lossy()
            .into_owned()
    };
    tracing::warn!(service, code, %message, "host callback failed");
    RuntimeError::Callback {
        code,
        message,
        line: normalize_position(error.line),
        column: normalize_position(error.column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ffi::c_char;
    use pretty_assertions::assert_eq;

    unsafe extern "C" fn read_hello(
        _user_data: *mut c_void,
        _path: *const c_char,
        out_ctx: *mut c_void,
        out_write: crate::ffi::FsHostWriteFn,
        _out_error: *mut FsError,
    ) -> i32 {
        let (a, b) = (b"hel", b"lo");
        unsafe {
            out_write(out_ctx, a.as_ptr(), a.len() as u64);
            out_write(out_ctx, b.as_ptr(), b.len() as u64);
        }
        0
    }

    unsafe extern "C" fn read_invalid_utf8(
        _user_data: *mut c_void,
        _path: *const c_char,
        out_ctx: *mut c_void,
        out_write: crate::ffi::FsHostWriteFn,
        _out_error: *mut FsError,
    ) -> i32 {
        let bytes = [0xff_u8, 0xfe];
        unsafe { out_write(out_ctx, bytes.as_ptr(), 2) };
        0
    }

    unsafe extern "C" fn fail_without_code(
        _user_data: *mut c_void,
        _path: *const c_char,
        _out_flag: *mut i32,
        out_error: *mut FsError,
    ) -> i32 {
        unsafe {
            (*out_error).message = c"disk on fire".as_ptr().cast_mut();
        }
        1
    }

    unsafe extern "C" fn list_two(
        _user_data: *mut c_void,
        _path: *const c_char,
        out_ctx: *mut c_void,
        out_write: crate::ffi::FsHostWriteFn,
        _out_error: *mut FsError,
    ) -> i32 {
        let text = b"/a\n/b\n";
        unsafe { out_write(out_ctx, text.as_ptr(), text.len() as u64) };
        0
    }

    #[test]
    fn test_streamed_chunks_are_joined() {
        let host = CallbackHost::new(FsHostCallbacks {
            file_read_text: Some(read_hello),
            dir_list: Some(list_two),
            ..FsHostCallbacks::default()
        });
        assert_eq!(host.file_read_text("/x").unwrap(), "hello");
        assert_eq!(host.dir_list("/").unwrap(), vec!["/a", "/b"]);
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let host = CallbackHost::new(FsHostCallbacks {
            file_read_text: Some(read_invalid_utf8),
            ..FsHostCallbacks::default()
        });
        let err = host.file_read_text("/x").unwrap_err();
        assert_eq!(err.code(), codes::HOST_FILE);
    }

    #[test]
    fn test_failure_falls_back_to_service_code() {
        let host = CallbackHost::new(FsHostCallbacks {
            is_file: Some(fail_without_code),
            ..FsHostCallbacks::default()
        });
        assert_eq!(
            host.is_file("/x").unwrap_err(),
            RuntimeError::Callback {
                code: codes::HOST_IS_FILE,
                message: "disk on fire".to_string(),
                line: -1,
                column: -1,
            }
        );
    }

    #[test]
    fn test_empty_slots() {
        let host = CallbackHost::new(FsHostCallbacks::default());
        let err = host.file_exists("/x").unwrap_err();
        assert_eq!(err.code(), codes::HOST_FILE_EXISTS);
        assert_eq!(err.to_string(), "host callback not registered");
        // Logging without a slot is silently dropped.
        host.log_line("ignored");
    }
}
