//! Key-value collections.
//!
//! Entries written in source are lazy: each slot keeps its expression until
//! the first read, then caches the value. Keys compare case-insensitively but
//! keep the spelling they were written with.

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::parser::Expr;
use crate::scope::Scope;
use crate::values::Value;

pub struct Kvc {
    entries: IndexMap<String, Entry>,
    /// Scope the lazy entries are evaluated in (without the collection itself).
    parent: Option<Rc<Scope>>,
}

pub struct Entry {
    name: String,
    slot: RefCell<Slot>,
}

pub(crate) enum Slot {
    Pending(Rc<Expr>),
    Evaluating,
    Ready(Value),
}

fn fold_key(key: &str) -> String {
    key.to_lowercase()
}

impl Kvc {
    /// Collection whose entries are all evaluated already.
    pub fn from_values<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut map = IndexMap::new();
        for (name, value) in entries {
            let name = name.into();
            map.insert(
                fold_key(&name),
                Entry {
                    name,
                    slot: RefCell::new(Slot::Ready(value)),
                },
            );
        }
        Self {
            entries: map,
            parent: None,
        }
    }

    /// Collection whose entries are evaluated on first read.
    pub(crate) fn lazy(entries: &[(String, Rc<Expr>)], parent: Rc<Scope>) -> Self {
        let mut map = IndexMap::with_capacity(entries.len());
        for (name, expr) in entries {
            map.insert(
                fold_key(name),
                Entry {
                    name: name.clone(),
                    slot: RefCell::new(Slot::Pending(expr.clone())),
                },
            );
        }
        Self {
            entries: map,
            parent: Some(parent),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display spelling of every key, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|e| e.name.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&fold_key(key))
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(&fold_key(key))
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub(crate) fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }
}

impl Entry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cached value, if the entry was already evaluated.
    pub fn ready(&self) -> Option<Value> {
        match &*self.slot.borrow() {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub(crate) fn take_slot(&self) -> Slot {
        self.slot.replace(Slot::Evaluating)
    }

    pub(crate) fn set_slot(&self, slot: Slot) {
        *self.slot.borrow_mut() = slot;
    }
}

impl fmt::Debug for Kvc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for entry in self.entries.values() {
            match entry.ready() {
                Some(value) => map.entry(&entry.name, &value),
                None => map.entry(&entry.name, &format_args!("<pending>")),
            };
        }
        map.finish()
    }
}

impl fmt::Display for Kvc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, entry) in self.entries.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match entry.ready() {
                Some(Value::String(s)) => write!(f, "{}: {:?}", entry.name, s)?,
                Some(value) => write!(f, "{}: {}", entry.name, value)?,
                None => write!(f, "{}: ...", entry.name)?,
            }
        }
        f.write_str("}")
    }
}
