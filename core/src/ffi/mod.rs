//! C ABI for embedding FuncScript. See `include/funcscript.h`.
//!
//! Conventions shared by every entry point:
//!
//! - Out-params are zeroed before anything else happens.
//! - Return value `0` is success, `1` is failure with `out_error` filled,
//!   and `2` means a required out-pointer was null.
//! - Panics never cross the boundary; they are reported as code 2099.
//! - Strings returned through out-params belong to the library and must be
//!   released with `fs_free_string`.

mod callbacks;
mod types;

use core::any::Any;
use core::ffi::{CStr, c_char};
use core::ptr;
use std::ffi::CString;
use std::panic::{self, AssertUnwindSafe};

use crate::api::{Context, ContextOptions, Error, Handle};
use crate::evaluator::codes;

use callbacks::CallbackHost;
pub use types::{
    FsContext, FsError, FsHostCallbacks, FsHostLogFn, FsHostQueryFn, FsHostStreamFn,
    FsHostWriteFn, FsValue,
};

/// Version of the surface described by `funcscript.h`.
pub const ABI_VERSION: u32 = 3;

const OK: i32 = 0;
const FAILED: i32 = 1;
const NULL_OUT: i32 = 2;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

fn into_c_string(text: &str) -> *mut c_char {
    match CString::new(text) {
        Ok(s) => s.into_raw(),
        Err(_) => CString::new(text.replace('\0', "\u{fffd}"))
            .map(CString::into_raw)
            .unwrap_or(ptr::null_mut()),
    }
}

unsafe fn clear_error(out_error: *mut FsError) {
    if let Some(record) = unsafe { out_error.as_mut() } {
        *record = FsError::empty();
    }
}

unsafe fn set_error(out_error: *mut FsError, error: &Error) {
    let Some(record) = (unsafe { out_error.as_mut() }) else {
        return;
    };
    let (line, column) = error.location().unwrap_or((-1, -1));
    *record = FsError {
        code: error.code(),
        line,
        column,
        message: into_c_string(&error.message()),
    };
}

/// Borrow a UTF-8 argument string.
unsafe fn text_arg<'a>(
    ptr: *const c_char,
    null_code: u32,
    utf8_code: u32,
    what: &str,
) -> Result<&'a str, Error> {
    if ptr.is_null() {
        return Err(Error::api(null_code, format!("{what} pointer is null")));
    }
    // SAFETY: the caller passes a NUL-terminated string.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| Error::api(utf8_code, format!("{what} is not valid UTF-8")))
}

/// Resolve the context, run `body` with panics caught and report the outcome
/// through `out_error`.
unsafe fn with_context<F>(ctx: *mut FsContext, out_error: *mut FsError, body: F) -> i32
where
    F: FnOnce(&mut Context) -> Result<(), Error>,
{
    let Some(ctx) = (unsafe { ctx.as_mut() }) else {
        let error = Error::api(codes::NULL_CONTEXT, "context pointer is null");
        unsafe { set_error(out_error, &error) };
        return FAILED;
    };
    let error = match panic::catch_unwind(AssertUnwindSafe(|| body(&mut ctx.context))) {
        Ok(Ok(())) => return OK,
        Ok(Err(error)) => error,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(%message, "panic caught at the C boundary");
            Error::Internal(message)
        }
    };
    tracing::debug!(code = error.code(), %error, "call failed");
    unsafe { set_error(out_error, &error) };
    FAILED
}

#[unsafe(no_mangle)]
pub extern "C" fn fs_abi_version() -> u32 {
    ABI_VERSION
}

/// Create a context. `max_depth` 0 selects the default limit.
///
/// Returns null when every context tag is in use. The returned pointer is released with `fs_context_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fs_context_new(max_depth: u32) -> *mut FsContext {
    let mut options = ContextOptions::default();
    if max_depth != 0 {
        options.max_depth = max_depth as usize;
    }
    match panic::catch_unwind(|| Context::new(options)) {
        Ok(Ok(context)) => Box::into_raw(Box::new(FsContext { context })),
        Ok(Err(error)) => {
            tracing::warn!(%error, "context creation failed");
            ptr::null_mut()
        }
        Err(_) => ptr::null_mut(),
    }
}

/// Close and release a context. Null is ignored.
///
/// # Safety
/// `ctx` must come from `fs_context_new` and not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_context_free(ctx: *mut FsContext) {
    if ctx.is_null() {
        return;
    }
    // SAFETY: ownership returns to us exactly once.
    let mut boxed = unsafe { Box::from_raw(ctx) };
    let _ = panic::catch_unwind(AssertUnwindSafe(|| boxed.context.close()));
}

/// Install host callbacks. Allowed until the first evaluation; afterwards
/// the call fails with code 2014.
///
/// # Safety
/// `callbacks` must point to a valid table; it is copied. `user_data` must
/// stay valid for the lifetime of the context.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_context_set_host_callbacks(
    ctx: *mut FsContext,
    callbacks: *const FsHostCallbacks,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    // SAFETY: checked for null; the table is plain data.
    let Some(callbacks) = (unsafe { callbacks.as_ref() }).copied() else {
        return NULL_OUT;
    };
    unsafe {
        with_context(ctx, out_error, |context| {
            context.register_host(Box::new(CallbackHost::new(callbacks)))
        })
    }
}

/// Evaluate `source` and return its JSON snapshot in `out_json`.
///
/// # Safety
/// Pointers must be null or valid; `source` is a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_context_eval(
    ctx: *mut FsContext,
    source: *const c_char,
    out_json: *mut *mut c_char,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    if out_json.is_null() {
        return NULL_OUT;
    }
    unsafe { *out_json = ptr::null_mut() };
    unsafe {
        with_context(ctx, out_error, |context| {
            let source = text_arg(source, codes::NULL_ARGUMENT, codes::INVALID_UTF8, "source")?;
            let json = context.eval_json(source)?;
            *out_json = into_c_string(&json);
            Ok(())
        })
    }
}

/// Evaluate `source` and return a handle to the result.
///
/// # Safety
/// Pointers must be null or valid; `source` is a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_context_eval_value(
    ctx: *mut FsContext,
    source: *const c_char,
    out_value: *mut FsValue,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    if out_value.is_null() {
        return NULL_OUT;
    }
    unsafe { *out_value = FsValue::default() };
    unsafe {
        with_context(ctx, out_error, |context| {
            let source = text_arg(source, codes::NULL_ARGUMENT, codes::INVALID_UTF8, "source")?;
            *out_value = context.eval_to_handle(source)?.into();
            Ok(())
        })
    }
}

/// Release a handle. Freeing an unknown or already freed handle is a no-op
/// and still returns 0; a null context returns 2.
///
/// # Safety
/// `ctx` must be null or a live context.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_value_free(ctx: *mut FsContext, value: FsValue) -> i32 {
    let Some(ctx) = (unsafe { ctx.as_mut() }) else {
        return NULL_OUT;
    };
    let _ = panic::catch_unwind(AssertUnwindSafe(|| ctx.context.free(value.into())));
    OK
}

/// Kind code of a value, or 0 for a null context or unknown handle.
///
/// # Safety
/// `ctx` must be null or a live context.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_value_type(ctx: *mut FsContext, value: FsValue) -> u32 {
    let Some(ctx) = (unsafe { ctx.as_mut() }) else {
        return 0;
    };
    panic::catch_unwind(AssertUnwindSafe(|| ctx.context.type_of(value.into())))
        .ok()
        .and_then(Result::ok)
        .map_or(0, |kind| kind.code())
}

/// Deep JSON snapshot of a value.
///
/// # Safety
/// Pointers must be null or valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_value_to_json(
    ctx: *mut FsContext,
    value: FsValue,
    out_json: *mut *mut c_char,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    if out_json.is_null() {
        return NULL_OUT;
    }
    unsafe { *out_json = ptr::null_mut() };
    unsafe {
        with_context(ctx, out_error, |context| {
            *out_json = into_c_string(&context.to_snapshot(value.into())?);
            Ok(())
        })
    }
}

/// # Safety
/// Pointers must be null or valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_value_len(
    ctx: *mut FsContext,
    value: FsValue,
    out_len: *mut u64,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    if out_len.is_null() {
        return NULL_OUT;
    }
    unsafe { *out_len = 0 };
    unsafe {
        with_context(ctx, out_error, |context| {
            *out_len = context.len(value.into())?;
            Ok(())
        })
    }
}

/// Element of a list; negative indices count from the end.
///
/// # Safety
/// Pointers must be null or valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_value_index(
    ctx: *mut FsContext,
    receiver: FsValue,
    index: i64,
    out_value: *mut FsValue,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    if out_value.is_null() {
        return NULL_OUT;
    }
    unsafe { *out_value = FsValue::default() };
    unsafe {
        with_context(ctx, out_error, |context| {
            *out_value = context.index(receiver.into(), index)?.into();
            Ok(())
        })
    }
}

/// Case-insensitive entry lookup in a key-value collection.
///
/// # Safety
/// Pointers must be null or valid; `key` is a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_value_get_key(
    ctx: *mut FsContext,
    receiver: FsValue,
    key: *const c_char,
    out_value: *mut FsValue,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    if out_value.is_null() {
        return NULL_OUT;
    }
    unsafe { *out_value = FsValue::default() };
    unsafe {
        with_context(ctx, out_error, |context| {
            let key = text_arg(key, codes::NULL_KEY, codes::KEY_NOT_UTF8, "key")?;
            *out_value = context.get_key(receiver.into(), key)?.into();
            Ok(())
        })
    }
}

/// Keys of a key-value collection as a JSON array.
///
/// # Safety
/// Pointers must be null or valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_value_keys_json(
    ctx: *mut FsContext,
    receiver: FsValue,
    out_json: *mut *mut c_char,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    if out_json.is_null() {
        return NULL_OUT;
    }
    unsafe { *out_json = ptr::null_mut() };
    unsafe {
        with_context(ctx, out_error, |context| {
            *out_json = into_c_string(&context.keys(receiver.into())?);
            Ok(())
        })
    }
}

/// # Safety
/// Pointers must be null or valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_value_range_info(
    ctx: *mut FsContext,
    value: FsValue,
    out_start: *mut i64,
    out_count: *mut u64,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    if out_start.is_null() || out_count.is_null() {
        return NULL_OUT;
    }
    unsafe {
        *out_start = 0;
        *out_count = 0;
    }
    unsafe {
        with_context(ctx, out_error, |context| {
            let (start, count) = context.range_info(value.into())?;
            *out_start = start;
            *out_count = count;
            Ok(())
        })
    }
}

/// Call a function value. Argument handles are not consumed.
///
/// # Safety
/// `argv` must point to `argc` values (it may be null when `argc` is 0).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_value_call(
    ctx: *mut FsContext,
    callee: FsValue,
    argc: u64,
    argv: *const FsValue,
    out_value: *mut FsValue,
    out_error: *mut FsError,
) -> i32 {
    unsafe { clear_error(out_error) };
    if out_value.is_null() {
        return NULL_OUT;
    }
    unsafe { *out_value = FsValue::default() };
    unsafe {
        with_context(ctx, out_error, |context| {
            let args: Vec<Handle> = if argc == 0 {
                Vec::new()
            } else if argv.is_null() {
                return Err(Error::api(codes::NULL_ARGV, "argv pointer is null"));
            } else {
                let argc = usize::try_from(argc)
                    .map_err(|_| Error::api(codes::NULL_ARGV, "argc is too large"))?;
                core::slice::from_raw_parts(argv, argc)
                    .iter()
                    .map(|&v| Handle::from(v))
                    .collect()
            };
            *out_value = context.call_handle(callee.into(), &args)?.into();
            Ok(())
        })
    }
}

/// Release a string returned by this library. Null is ignored.
///
/// # Safety
/// `ptr` must come from this library and not be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: produced by `CString::into_raw`.
    drop(unsafe { CString::from_raw(ptr) });
}

/// Release the message of an error record and reset it.
///
/// # Safety
/// `err` must be null or a record filled by this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_error_free(err: *mut FsError) {
    let Some(record) = (unsafe { err.as_mut() }) else {
        return;
    };
    unsafe { fs_free_string(record.message) };
    *record = FsError::empty();
}

/// Move the message out of an error record; the record keeps code and
/// location. The caller frees the result with `fs_free_string`.
///
/// # Safety
/// `err` must be null or a record filled by this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_error_take_message(err: *mut FsError) -> *mut c_char {
    match unsafe { err.as_mut() } {
        Some(record) => core::mem::replace(&mut record.message, ptr::null_mut()),
        None => ptr::null_mut(),
    }
}
