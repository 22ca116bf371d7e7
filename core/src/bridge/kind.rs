use core::fmt;

use crate::values::Value;

/// Stable type tag reported for a handle.
///
/// The numbering is shared with `funcscript.h`; 0 is reserved for
/// "invalid handle" at the C boundary.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Nil = 1,
    Bool = 2,
    Number = 3,
    String = 4,
    List = 5,
    KeyValueCollection = 6,
    Range = 7,
    Function = 8,
    Int = 11,
    BigInt = 12,
    Bytes = 13,
    Guid = 14,
    DateTime = 15,
}

impl Kind {
    pub fn of(value: &Value) -> Kind {
        match value {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::BigInt(_) => Kind::BigInt,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Bytes(_) => Kind::Bytes,
            Value::Guid(_) => Kind::Guid,
            Value::DateTime(_) => Kind::DateTime,
            Value::List(_) => Kind::List,
            Value::Kvc(_) => Kind::KeyValueCollection,
            Value::Range(_) => Kind::Range,
            Value::Function(_) => Kind::Function,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Kind> {
        Some(match code {
            1 => Kind::Nil,
            2 => Kind::Bool,
            3 => Kind::Number,
            4 => Kind::String,
            5 => Kind::List,
            6 => Kind::KeyValueCollection,
            7 => Kind::Range,
            8 => Kind::Function,
            11 => Kind::Int,
            12 => Kind::BigInt,
            13 => Kind::Bytes,
            14 => Kind::Guid,
            15 => Kind::DateTime,
            _ => return None,
        })
    }

    /// Kinds the host receives as proxies instead of snapshots.
    pub fn is_retained(self) -> bool {
        matches!(self, Kind::List | Kind::KeyValueCollection | Kind::Function)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Nil => "Nil",
            Kind::Bool => "Bool",
            Kind::Number => "Number",
            Kind::String => "String",
            Kind::List => "List",
            Kind::KeyValueCollection => "KeyValueCollection",
            Kind::Range => "Range",
            Kind::Function => "Function",
            Kind::Int => "Int",
            Kind::BigInt => "BigInt",
            Kind::Bytes => "Bytes",
            Kind::Guid => "Guid",
            Kind::DateTime => "DateTime",
        };
        f.write_str(name)
    }
}
