use core::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use uuid::Uuid;

use crate::values::{Function, Kvc, datetime};

/// A runtime value.
///
/// Scalars are stored inline; aggregates and functions are reference counted
/// so handles, closures and collection slots can share them cheaply.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    BigInt(Rc<BigInt>),
    Number(f64),
    String(Rc<str>),
    Bytes(Rc<[u8]>),
    Guid(Uuid),
    /// 100ns ticks since 0001-01-01T00:00:00Z.
    DateTime(i64),
    List(Rc<[Value]>),
    Kvc(Rc<Kvc>),
    Range(RangeValue),
    Function(Rc<dyn Function>),
}

/// A contiguous integer sequence `start, start + 1, ..., start + count - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub count: u64,
}

impl RangeValue {
    pub fn get(&self, index: u64) -> Option<i64> {
        if index >= self.count {
            return None;
        }
        i64::try_from(index)
            .ok()
            .and_then(|offset| self.start.checked_add(offset))
    }
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn list(items: impl Into<Rc<[Value]>>) -> Self {
        Value::List(items.into())
    }

    pub fn bytes(b: impl Into<Rc<[u8]>>) -> Self {
        Value::Bytes(b.into())
    }

    /// Integer value, demoted to `Int` when it fits.
    pub fn integer(n: BigInt) -> Self {
        match n.to_i64() {
            Some(i) => Value::Int(i),
            None => Value::BigInt(Rc::new(n)),
        }
    }

    pub fn function(f: impl Function + 'static) -> Self {
        Value::Function(Rc::new(f))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::BigInt(b) => b.to_i64(),
            Value::Number(x) if x.fract() == 0.0 && x.is_finite() => Some(*x as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::BigInt(b) => b.to_f64(),
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::BigInt(_) | Value::Number(_))
    }

    /// Name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "Integer",
            Value::BigInt(_) => "BigInteger",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Bytes(_) => "ByteArray",
            Value::Guid(_) => "Guid",
            Value::DateTime(_) => "DateTime",
            Value::List(_) => "List",
            Value::Kvc(_) => "KeyValueCollection",
            Value::Range(_) => "Range",
            Value::Function(_) => "Function",
        }
    }

    /// Iterate a list or range element by element.
    pub fn sequence(&self) -> Option<Sequence<'_>> {
        match self {
            Value::List(items) => Some(Sequence::List(items.iter())),
            Value::Range(range) => {
                // Elements past i64::MAX are not representable.
                let room = u64::try_from(i128::from(i64::MAX) - i128::from(range.start) + 1)
                    .unwrap_or(u64::MAX);
                Some(Sequence::Range {
                    next: range.start,
                    remaining: range.count.min(room),
                })
            }
            _ => None,
        }
    }

    /// Number of elements of a list or range.
    pub fn sequence_len(&self) -> Option<u64> {
        match self {
            Value::List(items) => Some(items.len() as u64),
            Value::Range(range) => Some(range.count),
            _ => None,
        }
    }
}

pub enum Sequence<'a> {
    List(std::slice::Iter<'a, Value>),
    Range { next: i64, remaining: u64 },
}

impl Iterator for Sequence<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            Sequence::List(iter) => iter.next().cloned(),
            Sequence::Range { next, remaining } => {
                if *remaining == 0 {
                    return None;
                }
                let current = *next;
                *remaining -= 1;
                match next.checked_add(1) {
                    Some(n) => *next = n,
                    None => *remaining = 0,
                }
                Some(Value::Int(current))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Sequence::List(iter) => iter.size_hint(),
            Sequence::Range { remaining, .. } => {
                let n = usize::try_from(*remaining).unwrap_or(usize::MAX);
                (n, usize::try_from(*remaining).ok())
            }
        }
    }
}

impl Sequence<'_> {
    /// Elements not yet yielded.
    pub fn remaining(&self) -> u64 {
        match self {
            Sequence::List(iter) => iter.len() as u64,
            Sequence::Range { remaining, .. } => *remaining,
        }
    }
}

impl DoubleEndedIterator for Sequence<'_> {
    fn next_back(&mut self) -> Option<Value> {
        match self {
            Sequence::List(iter) => iter.next_back().cloned(),
            Sequence::Range { next, remaining } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                Some(Value::Int(next.wrapping_add_unsigned(*remaining)))
            }
        }
    }
}

/// Structural equality, as used by `=`, `in`, `Distinct` and `Contains`.
///
/// Numbers compare across representations; collections and functions compare
/// by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Guid(a), Value::Guid(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Kvc(a), Value::Kvc(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                crate::evaluator::compare_numbers(a, b) == Some(core::cmp::Ordering::Equal)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::BigInt(b) => write!(f, "BigInt({})", b),
            Value::Number(x) => write!(f, "Number({:?})", x),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Bytes(b) => write!(f, "Bytes({:?})", b),
            Value::Guid(g) => write!(f, "Guid({})", g),
            Value::DateTime(t) => write!(f, "DateTime({})", t),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Kvc(kvc) => write!(f, "{:?}", kvc),
            Value::Range(r) => write!(f, "Range({}, {})", r.start, r.count),
            Value::Function(func) => write!(f, "Function({})", func.name()),
        }
    }
}

pub(crate) fn format_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{}", value)
    }
}

/// Text rendering used by format strings, string concatenation and `join`.
///
/// Collection entries that were never evaluated render as `...`; callers
/// that need the full text force the collection first.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::BigInt(b) => write!(f, "{}", b),
            Value::Number(x) => format_float(f, *x),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => {
                use base64::Engine as _;
                f.write_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
            Value::Guid(g) => write!(f, "{}", g.hyphenated()),
            Value::DateTime(ticks) => match datetime::from_ticks(*ticks) {
                Some(dt) => f.write_str(&datetime::to_iso(&dt)),
                None => write!(f, "{}", ticks),
            },
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Value::String(s) => write!(f, "{:?}", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("]")
            }
            Value::Kvc(kvc) => write!(f, "{}", kvc),
            Value::Range(r) => write!(f, "Range({}, {})", r.start, r.count),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
        }
    }
}
