//! The `Vm`: one native evaluation context plus the host services it calls.

use core::ffi::{CStr, c_char, c_void};
use core::ptr::{self, NonNull};
use std::cell::RefCell;
use std::ffi::CString;
use std::panic::{self, AssertUnwindSafe};

use funcscript_core::api::Kind;
use funcscript_core::evaluator::codes;
use funcscript_core::ffi::{self, FsContext, FsError, FsHostCallbacks, FsHostWriteFn, FsValue};

use crate::proxy::{Function, KeyValueCollection, List, not_a_function};
use crate::services::{HostServices, ServiceError, StdFsServices};
use crate::{Arg, Error, Literal, Value, snapshot};

/// Configuration options for a `Vm`.
///
/// # Example
///
/// ```
/// use funcscript::VmOptions;
///
/// let options = VmOptions {
///     max_file_bytes: 64 * 1024,
///     ..VmOptions::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// Largest file `file(path)` may read with the default services.
    ///
    /// Default: 1_000_000
    pub max_file_bytes: u64,

    /// Maximum evaluation depth (for recursion protection).
    ///
    /// Default: 1000
    pub max_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: 1_000_000,
            max_depth: 1000,
        }
    }
}

/// State reachable from the C trampolines through `user_data`.
struct HostBridge {
    services: Box<dyn HostServices>,
    /// Keeps the last failure message alive until the engine has copied it.
    message: RefCell<Option<CString>>,
}

impl HostBridge {
    unsafe fn fail(&self, out_error: *mut FsError, error: ServiceError) -> i32 {
        tracing::debug!(code = error.code, message = %error.message, "host service failed");
        let message = CString::new(error.message.replace('\0', " ")).unwrap_or_default();
        let record = FsError {
            code: error.code,
            line: 0,
            column: 0,
            message: message.as_ptr().cast_mut(),
        };
        *self.message.borrow_mut() = Some(message);
        if let Some(out) = unsafe { out_error.as_mut() } {
            *out = record;
        }
        1
    }
}

fn guarded<T>(service: impl FnOnce() -> Result<T, ServiceError>) -> Result<T, ServiceError> {
    panic::catch_unwind(AssertUnwindSafe(service))
        .unwrap_or_else(|_| Err(ServiceError::new("host service panicked")))
}

unsafe fn path_arg<'a>(path: *const c_char) -> Result<&'a str, ServiceError> {
    if path.is_null() {
        return Err(ServiceError::new("path is null"));
    }
    // SAFETY: the engine passes a NUL-terminated string valid for the call.
    unsafe { CStr::from_ptr(path) }
        .to_str()
        .map_err(|_| ServiceError::new("path is not valid UTF-8"))
}

unsafe fn stream(
    user_data: *mut c_void,
    path: *const c_char,
    out_ctx: *mut c_void,
    out_write: FsHostWriteFn,
    out_error: *mut FsError,
    service: impl FnOnce(&dyn HostServices, &str) -> Result<String, ServiceError>,
) -> i32 {
    // SAFETY: `user_data` is the `HostBridge` owned by the `Vm`.
    let bridge = unsafe { &*user_data.cast::<HostBridge>() };
    let result = unsafe { path_arg(path) }
        .and_then(|path| guarded(|| service(bridge.services.as_ref(), path)));
    match result {
        Ok(text) => {
            unsafe { out_write(out_ctx, text.as_ptr(), text.len() as u64) };
            0
        }
        Err(error) => unsafe { bridge.fail(out_error, error) },
    }
}

unsafe fn query(
    user_data: *mut c_void,
    path: *const c_char,
    out_flag: *mut i32,
    out_error: *mut FsError,
    service: impl FnOnce(&dyn HostServices, &str) -> Result<bool, ServiceError>,
) -> i32 {
    // SAFETY: see `stream`.
    let bridge = unsafe { &*user_data.cast::<HostBridge>() };
    let result = unsafe { path_arg(path) }
        .and_then(|path| guarded(|| service(bridge.services.as_ref(), path)));
    match result {
        Ok(flag) => {
            if let Some(out) = unsafe { out_flag.as_mut() } {
                *out = i32::from(flag);
            }
            0
        }
        Err(error) => unsafe { bridge.fail(out_error, error) },
    }
}

unsafe extern "C" fn file_read_text_trampoline(
    user_data: *mut c_void,
    path: *const c_char,
    out_ctx: *mut c_void,
    out_write: FsHostWriteFn,
    out_error: *mut FsError,
) -> i32 {
    unsafe {
        stream(user_data, path, out_ctx, out_write, out_error, |s, p| {
            s.file_read_text(p)
        })
    }
}

unsafe extern "C" fn dir_list_trampoline(
    user_data: *mut c_void,
    path: *const c_char,
    out_ctx: *mut c_void,
    out_write: FsHostWriteFn,
    out_error: *mut FsError,
) -> i32 {
    unsafe {
        stream(user_data, path, out_ctx, out_write, out_error, |s, p| {
            s.dir_list(p).map(|entries| entries.join("\n"))
        })
    }
}

unsafe extern "C" fn file_exists_trampoline(
    user_data: *mut c_void,
    path: *const c_char,
    out_flag: *mut i32,
    out_error: *mut FsError,
) -> i32 {
    unsafe { query(user_data, path, out_flag, out_error, |s, p| s.file_exists(p)) }
}

unsafe extern "C" fn is_file_trampoline(
    user_data: *mut c_void,
    path: *const c_char,
    out_flag: *mut i32,
    out_error: *mut FsError,
) -> i32 {
    unsafe { query(user_data, path, out_flag, out_error, |s, p| s.is_file(p)) }
}

unsafe extern "C" fn log_line_trampoline(user_data: *mut c_void, text: *const c_char) {
    if text.is_null() {
        return;
    }
    // SAFETY: see `stream`.
    let bridge = unsafe { &*user_data.cast::<HostBridge>() };
    let text = unsafe { CStr::from_ptr(text) }.to_string_lossy();
    let _ = panic::catch_unwind(AssertUnwindSafe(|| bridge.services.log_line(&text)));
}

/// Convert a failed call's error record and release its message.
fn take_error(record: &mut FsError) -> Error {
    // SAFETY: the record was filled by the engine.
    let message = unsafe { ffi::fs_error_take_message(record) };
    let text = if message.is_null() {
        String::new()
    } else {
        let text = unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned();
        unsafe { ffi::fs_free_string(message) };
        text
    };
    let error = Error::from_record(record.code, record.line, record.column, text);
    unsafe { ffi::fs_error_free(record) };
    error
}

fn check(rc: i32, record: &mut FsError) -> Result<(), Error> {
    match rc {
        0 => Ok(()),
        2 => Err(Error::Internal {
            message: "null out-pointer passed to the engine".to_string(),
        }),
        _ => Err(take_error(record)),
    }
}

fn take_string(text: *mut c_char) -> String {
    if text.is_null() {
        return String::new();
    }
    // SAFETY: returned by the engine and released exactly once here.
    let owned = unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned();
    unsafe { ffi::fs_free_string(text) };
    owned
}

fn source_arg(source: &str) -> Result<CString, Error> {
    CString::new(source).map_err(|_| Error::Argument {
        code: codes::INVALID_UTF8,
        message: "source contains a NUL byte".to_string(),
    })
}

/// An evaluation context with its host services.
///
/// Values returned by [`Vm::eval`] borrow the `Vm`: lists, collections and
/// functions stay inside the engine and are reached through proxies. A `Vm`
/// is tied to the thread that created it.
pub struct Vm {
    ctx: NonNull<FsContext>,
    bridge: Box<HostBridge>,
}

impl Vm {
    /// A `Vm` with the default options and file-system services.
    pub fn new() -> Result<Self, Error> {
        Self::with_options(VmOptions::default())
    }

    pub fn with_options(options: VmOptions) -> Result<Self, Error> {
        Self::with_services(StdFsServices::new(options.max_file_bytes), options)
    }

    pub fn with_services(
        services: impl HostServices + 'static,
        options: VmOptions,
    ) -> Result<Self, Error> {
        let max_depth = u32::try_from(options.max_depth).unwrap_or(u32::MAX);
        let ctx = NonNull::new(ffi::fs_context_new(max_depth)).ok_or(Error::ContextCreation)?;
        let vm = Vm {
            ctx,
            bridge: Box::new(HostBridge {
                services: Box::new(services),
                message: RefCell::new(None),
            }),
        };
        let callbacks = FsHostCallbacks {
            user_data: (&*vm.bridge as *const HostBridge).cast_mut().cast::<c_void>(),
            file_read_text: Some(file_read_text_trampoline),
            file_exists: Some(file_exists_trampoline),
            is_file: Some(is_file_trampoline),
            dir_list: Some(dir_list_trampoline),
            log_line: Some(log_line_trampoline),
        };
        let mut record = FsError::empty();
        let rc = unsafe { ffi::fs_context_set_host_callbacks(vm.ctx(), &callbacks, &mut record) };
        check(rc, &mut record)?;
        tracing::debug!(max_depth, "vm created");
        Ok(vm)
    }

    fn ctx(&self) -> *mut FsContext {
        self.ctx.as_ptr()
    }

    /// Evaluate `source`.
    ///
    /// Scalars and ranges are copied out; lists, key-value collections and
    /// functions come back as proxies.
    pub fn eval(&self, source: &str) -> Result<Value<'_>, Error> {
        let handle = self.eval_handle(source)?;
        self.adopt(handle)
    }

    /// Evaluate `source` and return a deep JSON snapshot of the result.
    pub fn eval_json(&self, source: &str) -> Result<serde_json::Value, Error> {
        let source = source_arg(source)?;
        let mut json: *mut c_char = ptr::null_mut();
        let mut record = FsError::empty();
        let rc = unsafe { ffi::fs_context_eval(self.ctx(), source.as_ptr(), &mut json, &mut record) };
        check(rc, &mut record)?;
        let text = take_string(json);
        serde_json::from_str(&text).map_err(|e| Error::Snapshot(e.to_string()))
    }

    /// Evaluate `expr` to a function and call it with `args`.
    ///
    /// ```
    /// let vm = funcscript::Vm::new().unwrap();
    /// let product = vm.call("(x, y) => x * y", &[3i64.into(), 4i64.into()]).unwrap();
    /// assert_eq!(product, funcscript::Value::Int(12));
    /// ```
    pub fn call(&self, expr: &str, args: &[Arg<'_, '_>]) -> Result<Value<'_>, Error> {
        let callee = self.eval_handle(expr)?;
        let result = if self.kind(callee) == Some(Kind::Function) {
            self.call_handle(callee, args)
        } else {
            Err(not_a_function(expr))
        };
        self.free(callee);
        result
    }

    /// Snapshot of a plain value with no proxies.
    pub fn eval_literal(&self, source: &str) -> Result<Literal, Error> {
        snapshot::decode(&self.eval_json(source)?)
    }

    pub(crate) fn eval_handle(&self, source: &str) -> Result<FsValue, Error> {
        let source = source_arg(source)?;
        let mut value = FsValue::default();
        let mut record = FsError::empty();
        let rc = unsafe {
            ffi::fs_context_eval_value(self.ctx(), source.as_ptr(), &mut value, &mut record)
        };
        check(rc, &mut record)?;
        Ok(value)
    }

    /// Wrap a fresh handle. Handles of copied-out values are freed here.
    pub(crate) fn adopt(&self, handle: FsValue) -> Result<Value<'_>, Error> {
        let Some(kind) = self.kind(handle) else {
            return Err(Error::InvalidHandle {
                message: format!("invalid handle {:#x}", handle.id),
            });
        };
        match kind {
            Kind::List => Ok(Value::List(List::new(self, handle))),
            Kind::KeyValueCollection => {
                Ok(Value::KeyValueCollection(KeyValueCollection::new(self, handle)))
            }
            Kind::Function => Ok(Value::Function(Function::new(self, handle))),
            Kind::Range => {
                let range = self.range_info(handle);
                self.free(handle);
                let (start, count) = range?;
                Ok(Value::Range { start, count })
            }
            _ => {
                let json = self.to_json(handle);
                self.free(handle);
                Value::from_literal(snapshot::decode_str(&json?)?)
            }
        }
    }

    pub(crate) fn free(&self, handle: FsValue) {
        if handle.id != 0 {
            unsafe { ffi::fs_value_free(self.ctx(), handle) };
        }
    }

    pub(crate) fn kind(&self, handle: FsValue) -> Option<Kind> {
        Kind::from_code(unsafe { ffi::fs_value_type(self.ctx(), handle) })
    }

    pub(crate) fn to_json(&self, handle: FsValue) -> Result<String, Error> {
        let mut json: *mut c_char = ptr::null_mut();
        let mut record = FsError::empty();
        let rc = unsafe { ffi::fs_value_to_json(self.ctx(), handle, &mut json, &mut record) };
        check(rc, &mut record)?;
        Ok(take_string(json))
    }

    pub(crate) fn len(&self, handle: FsValue) -> Result<u64, Error> {
        let mut len: u64 = 0;
        let mut record = FsError::empty();
        let rc = unsafe { ffi::fs_value_len(self.ctx(), handle, &mut len, &mut record) };
        check(rc, &mut record)?;
        Ok(len)
    }

    pub(crate) fn index(&self, handle: FsValue, index: i64) -> Result<FsValue, Error> {
        let mut value = FsValue::default();
        let mut record = FsError::empty();
        let rc =
            unsafe { ffi::fs_value_index(self.ctx(), handle, index, &mut value, &mut record) };
        check(rc, &mut record)?;
        Ok(value)
    }

    pub(crate) fn get_key(&self, handle: FsValue, key: &str) -> Result<FsValue, Error> {
        let key = CString::new(key).map_err(|_| Error::Argument {
            code: codes::KEY_NOT_UTF8,
            message: "key contains a NUL byte".to_string(),
        })?;
        let mut value = FsValue::default();
        let mut record = FsError::empty();
        let rc = unsafe {
            ffi::fs_value_get_key(self.ctx(), handle, key.as_ptr(), &mut value, &mut record)
        };
        check(rc, &mut record)?;
        Ok(value)
    }

    pub(crate) fn keys(&self, handle: FsValue) -> Result<Vec<String>, Error> {
        let mut json: *mut c_char = ptr::null_mut();
        let mut record = FsError::empty();
        let rc = unsafe { ffi::fs_value_keys_json(self.ctx(), handle, &mut json, &mut record) };
        check(rc, &mut record)?;
        serde_json::from_str(&take_string(json)).map_err(|e| Error::Snapshot(e.to_string()))
    }

    pub(crate) fn range_info(&self, handle: FsValue) -> Result<(i64, u64), Error> {
        let (mut start, mut count): (i64, u64) = (0, 0);
        let mut record = FsError::empty();
        let rc = unsafe {
            ffi::fs_value_range_info(self.ctx(), handle, &mut start, &mut count, &mut record)
        };
        check(rc, &mut record)?;
        Ok((start, count))
    }

    /// Call the function behind `callee`.
    ///
    /// Proxy arguments pass their handle; plain arguments are written as
    /// literals and evaluated into temporary handles, which are freed again
    /// whatever the outcome.
    pub(crate) fn call_handle(&self, callee: FsValue, args: &[Arg<'_, '_>]) -> Result<Value<'_>, Error> {
        let mut handles = Vec::with_capacity(args.len());
        let mut temporaries = Vec::new();
        let prepared = args.iter().try_for_each(|arg| {
            let handle = match arg.handle()? {
                Some(handle) => handle,
                None => {
                    let handle = self.eval_handle(&arg.to_literal()?.to_source()?)?;
                    temporaries.push(handle);
                    handle
                }
            };
            handles.push(handle);
            Ok::<(), Error>(())
        });

        let result = prepared.and_then(|()| {
            let mut value = FsValue::default();
            let mut record = FsError::empty();
            let argv = if handles.is_empty() {
                ptr::null()
            } else {
                handles.as_ptr()
            };
            let rc = unsafe {
                ffi::fs_value_call(
                    self.ctx(),
                    callee,
                    handles.len() as u64,
                    argv,
                    &mut value,
                    &mut record,
                )
            };
            check(rc, &mut record)?;
            Ok(value)
        });

        for handle in temporaries {
            self.free(handle);
        }
        self.adopt(result?)
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        tracing::debug!("vm dropped");
        unsafe { ffi::fs_context_free(self.ctx()) };
    }
}
