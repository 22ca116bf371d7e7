//! Handle-level operations exposed to hosts.
//!
//! A `Marshaller` pairs a context's handle table with an evaluator for the
//! duration of one call. Operations either copy a value out (`to_snapshot`,
//! `keys`, `range_info`) or issue a fresh handle (`index`, `get_key`, `call`).
//! Input handles are never consumed.

use crate::api::Error;
use crate::bridge::{Handle, HandleTable, Kind, snapshot};
use crate::evaluator::Evaluator;
use crate::values::Value;

pub struct Marshaller<'t, 'a> {
    table: &'t mut HandleTable,
    evaluator: Evaluator<'a>,
}

impl<'t, 'a> Marshaller<'t, 'a> {
    pub fn new(table: &'t mut HandleTable, evaluator: Evaluator<'a>) -> Self {
        Self { table, evaluator }
    }

    fn value(&self, handle: Handle) -> Result<Value, Error> {
        self.table.get(handle).cloned()
    }

    pub fn type_of(&self, handle: Handle) -> Result<Kind, Error> {
        self.table.get(handle).map(Kind::of)
    }

    /// Deep JSON copy of the value behind `handle`.
    pub fn to_snapshot(&mut self, handle: Handle) -> Result<String, Error> {
        tracing::trace!(handle = handle.0, "snapshot");
        let value = self.value(handle)?;
        snapshot::to_json_string(&mut self.evaluator, &value)
    }

    pub fn len(&self, handle: Handle) -> Result<u64, Error> {
        let len = match self.table.get(handle)? {
            Value::List(items) => items.len() as u64,
            Value::Kvc(kvc) => kvc.len() as u64,
            Value::String(s) => s.chars().count() as u64,
            Value::Bytes(bytes) => bytes.len() as u64,
            Value::Range(range) => range.count,
            other => {
                return Err(Error::LenUnsupported(format!(
                    "Length is not defined for {}",
                    Kind::of(other)
                )));
            }
        };
        Ok(len)
    }

    /// Element `index` of a list; negative indices count from the end.
    pub fn index(&mut self, handle: Handle, index: i64) -> Result<Handle, Error> {
        tracing::trace!(handle = handle.0, index, "index");
        let items = match self.table.get(handle)? {
            Value::List(items) => items.clone(),
            other => {
                return Err(Error::TypeMismatch(format!(
                    "Cannot index a {}; expected List",
                    Kind::of(other)
                )));
            }
        };
        let len = items.len() as u64;
        let position = if index < 0 {
            i64::try_from(len).ok().and_then(|n| n.checked_add(index))
        } else {
            Some(index)
        };
        let item = position
            .and_then(|p| usize::try_from(p).ok())
            .and_then(|p| items.get(p))
            .cloned()
            .ok_or(Error::IndexOutOfRange { index, len })?;
        self.table.allocate(item)
    }

    /// Case-insensitive entry lookup; the entry is evaluated if still lazy.
    pub fn get_key(&mut self, handle: Handle, key: &str) -> Result<Handle, Error> {
        tracing::trace!(handle = handle.0, key, "get_key");
        let kvc = match self.table.get(handle)? {
            Value::Kvc(kvc) => kvc.clone(),
            other => {
                return Err(Error::TypeMismatch(format!(
                    "Cannot look up keys in a {}; expected KeyValueCollection",
                    Kind::of(other)
                )));
            }
        };
        let value = self
            .evaluator
            .kvc_get(&kvc, key)?
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))?;
        self.table.allocate(value)
    }

    /// Keys as a JSON array of strings, in insertion order.
    pub fn keys(&self, handle: Handle) -> Result<String, Error> {
        match self.table.get(handle)? {
            Value::Kvc(kvc) => {
                let keys: Vec<&str> = kvc.keys().collect();
                serde_json::to_string(&keys).map_err(|e| Error::Internal(e.to_string()))
            }
            other => Err(Error::TypeMismatch(format!(
                "{} has no keys; expected KeyValueCollection",
                Kind::of(other)
            ))),
        }
    }

    pub fn range_info(&self, handle: Handle) -> Result<(i64, u64), Error> {
        match self.table.get(handle)? {
            Value::Range(range) => Ok((range.start, range.count)),
            other => Err(Error::TypeMismatch(format!(
                "Expected Range but got {}",
                Kind::of(other)
            ))),
        }
    }

    /// Invoke the function behind `handle`. The result gets a new handle.
    pub fn call(&mut self, handle: Handle, args: &[Handle]) -> Result<Handle, Error> {
        tracing::trace!(handle = handle.0, argc = args.len(), "call");
        let function = self.value(handle)?;
        if !matches!(function, Value::Function(_)) {
            return Err(Error::TypeMismatch(format!(
                "Cannot call a {}; expected Function",
                Kind::of(&function)
            )));
        }
        let args = args
            .iter()
            .map(|&arg| self.value(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let result = self.evaluator.call(&function, &args)?;
        self.table.allocate(result)
    }
}
