//! `#[repr(C)]` types shared with `funcscript.h`.

use core::ffi::{c_char, c_void};
use core::ptr;

use crate::api::{Context, Handle};

/// Opaque evaluation context handed to C callers.
pub struct FsContext {
    pub(crate) context: Context,
}

/// A value handle. Id 0 never names a live value.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FsValue {
    pub id: u64,
}

impl From<Handle> for FsValue {
    fn from(handle: Handle) -> Self {
        FsValue { id: handle.id() }
    }
}

impl From<FsValue> for Handle {
    fn from(value: FsValue) -> Self {
        Handle(value.id)
    }
}

/// Error record filled by failing calls.
///
/// `line` and `column` are 1-based, or -1 when the error has no source
/// location. A non-null `message` is owned by the library and must be
/// released with `fs_error_free` (or taken with `fs_error_take_message`).
///
/// When a host callback fills this record, `message` stays owned by the host;
/// the library copies it before the callback's caller returns.
#[repr(C)]
#[derive(Debug)]
pub struct FsError {
    pub code: u32,
    pub line: i32,
    pub column: i32,
    pub message: *mut c_char,
}

impl FsError {
    pub const fn empty() -> Self {
        Self {
            code: 0,
            line: 0,
            column: 0,
            message: ptr::null_mut(),
        }
    }
}

impl Default for FsError {
    fn default() -> Self {
        Self::empty()
    }
}

/// Sink for bytes produced by `file_read_text` and `dir_list`. May be called
/// any number of times; chunks are concatenated.
pub type FsHostWriteFn = unsafe extern "C" fn(out_ctx: *mut c_void, bytes: *const u8, len: u64);

/// `file_read_text` and `dir_list`: stream the result through `out_write`.
pub type FsHostStreamFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    path: *const c_char,
    out_ctx: *mut c_void,
    out_write: FsHostWriteFn,
    out_error: *mut FsError,
) -> i32;

/// `file_exists` and `is_file`: store 0 or 1 in `out_flag`.
pub type FsHostQueryFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    path: *const c_char,
    out_flag: *mut i32,
    out_error: *mut FsError,
) -> i32;

pub type FsHostLogFn = unsafe extern "C" fn(user_data: *mut c_void, text: *const c_char);

/// Host services installed with `fs_context_set_host_callbacks`.
///
/// Every slot is optional; an empty slot makes the matching built-in fail
/// with "host callback not registered". Callbacks run synchronously on the
/// evaluating thread and must not call back into the same context.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FsHostCallbacks {
    pub user_data: *mut c_void,
    pub file_read_text: Option<FsHostStreamFn>,
    pub file_exists: Option<FsHostQueryFn>,
    pub is_file: Option<FsHostQueryFn>,
    pub dir_list: Option<FsHostStreamFn>,
    pub log_line: Option<FsHostLogFn>,
}

impl Default for FsHostCallbacks {
    fn default() -> Self {
        Self {
            user_data: ptr::null_mut(),
            file_read_text: None,
            file_exists: None,
            is_file: None,
            dir_list: None,
            log_line: None,
        }
    }
}
