use chrono::{DateTime, Utc};
use funcscript_core::ffi::FsValue;
use indexmap::IndexMap;
use num_bigint::BigInt;
use uuid::Uuid;

use crate::proxy::{Function, KeyValueCollection, List};
use crate::{Error, Literal};

/// A result handed back by a [`Vm`](crate::Vm).
///
/// Scalars and ranges are copies. Lists, key-value collections and functions
/// are proxies over values that stay inside the engine; they borrow the `Vm`
/// and release their handle when closed or dropped.
#[derive(Debug, PartialEq)]
pub enum Value<'vm> {
    Nil,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Guid(Uuid),
    DateTime(DateTime<Utc>),
    Range { start: i64, count: u64 },
    List(List<'vm>),
    KeyValueCollection(KeyValueCollection<'vm>),
    Function(Function<'vm>),
}

impl<'vm> Value<'vm> {
    pub(crate) fn from_literal(literal: Literal) -> Result<Self, Error> {
        Ok(match literal {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => Value::Int(i),
            Literal::BigInt(b) => Value::BigInt(b),
            Literal::Number(x) => Value::Number(x),
            Literal::String(s) => Value::String(s),
            Literal::Bytes(b) => Value::Bytes(b),
            Literal::Guid(g) => Value::Guid(g),
            Literal::DateTime(dt) => Value::DateTime(dt),
            Literal::Range { start, count } => Value::Range { start, count },
            other @ (Literal::List(_) | Literal::Map(_) | Literal::Function { .. }) => {
                return Err(Error::Snapshot(format!(
                    "expected a scalar snapshot, got {other:?}"
                )));
            }
        })
    }

    /// Name of the value's type, as FuncScript spells it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::BigInt(_) => "BigInt",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Guid(_) => "Guid",
            Value::DateTime(_) => "DateTime",
            Value::Range { .. } => "Range",
            Value::List(_) => "List",
            Value::KeyValueCollection(_) => "KeyValueCollection",
            Value::Function(_) => "Function",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as a float; integers convert.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List<'vm>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&KeyValueCollection<'vm>> {
        match self {
            Value::KeyValueCollection(kvc) => Some(kvc),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function<'vm>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Deep copy. Proxies are snapshotted, so a top-level function fails
    /// with a type mismatch while nested ones become descriptors.
    pub fn to_literal(&self) -> Result<Literal, Error> {
        Ok(match self {
            Value::Nil => Literal::Nil,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Int(i) => Literal::Int(*i),
            Value::BigInt(b) => Literal::BigInt(b.clone()),
            Value::Number(x) => Literal::Number(*x),
            Value::String(s) => Literal::String(s.clone()),
            Value::Bytes(b) => Literal::Bytes(b.clone()),
            Value::Guid(g) => Literal::Guid(*g),
            Value::DateTime(dt) => Literal::DateTime(*dt),
            Value::Range { start, count } => Literal::Range {
                start: *start,
                count: *count,
            },
            Value::List(list) => list.snapshot()?,
            Value::KeyValueCollection(kvc) => kvc.snapshot()?,
            Value::Function(f) => f.snapshot()?,
        })
    }

    /// Handle of a proxy, `None` for copied values.
    pub(crate) fn handle(&self) -> Result<Option<FsValue>, Error> {
        match self {
            Value::List(list) => list.handle().map(Some),
            Value::KeyValueCollection(kvc) => kvc.handle().map(Some),
            Value::Function(f) => f.handle().map(Some),
            _ => Ok(None),
        }
    }
}

/// Argument to a FuncScript function.
///
/// Proxies pass through by handle. Everything else is written as a literal
/// and evaluated into a temporary value for the duration of the call.
#[derive(Debug)]
pub enum Arg<'a, 'vm> {
    Value(&'a Value<'vm>),
    Literal(Literal),
}

impl Arg<'_, '_> {
    pub(crate) fn handle(&self) -> Result<Option<FsValue>, Error> {
        match self {
            Arg::Value(value) => value.handle(),
            Arg::Literal(_) => Ok(None),
        }
    }

    pub(crate) fn to_literal(&self) -> Result<Literal, Error> {
        match self {
            Arg::Value(value) => value.to_literal(),
            Arg::Literal(literal) => Ok(literal.clone()),
        }
    }
}

impl<'a, 'vm> From<&'a Value<'vm>> for Arg<'a, 'vm> {
    fn from(value: &'a Value<'vm>) -> Self {
        Arg::Value(value)
    }
}

macro_rules! literal_args {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Arg<'_, '_> {
                fn from(value: $t) -> Self {
                    Arg::Literal(value.into())
                }
            }
        )*
    };
}

literal_args!(bool, i32, i64, f64, String, BigInt, Uuid, DateTime<Utc>, IndexMap<String, Literal>);

impl From<&str> for Arg<'_, '_> {
    fn from(value: &str) -> Self {
        Arg::Literal(value.into())
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Arg<'_, '_> {
    fn from(items: Vec<T>) -> Self {
        Arg::Literal(items.into())
    }
}

impl From<Literal> for Arg<'_, '_> {
    fn from(literal: Literal) -> Self {
        Arg::Literal(literal)
    }
}
