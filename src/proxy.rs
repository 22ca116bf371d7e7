//! Proxies over values that live inside the engine.
//!
//! Each proxy holds one handle. `close()` releases it; later operations fail
//! with [`Error::InvalidHandle`]. Dropping a proxy closes it.

use core::cell::Cell;
use core::fmt;
use core::ops::{Bound, RangeBounds};

use funcscript_core::evaluator::codes;
use funcscript_core::ffi::FsValue;
use indexmap::IndexMap;

use crate::{Arg, Error, Literal, Value, Vm, snapshot};

struct Retained<'vm> {
    vm: &'vm Vm,
    id: Cell<u64>,
}

impl<'vm> Retained<'vm> {
    fn new(vm: &'vm Vm, handle: FsValue) -> Self {
        Self {
            vm,
            id: Cell::new(handle.id),
        }
    }

    fn handle(&self) -> Result<FsValue, Error> {
        match self.id.get() {
            0 => Err(Error::InvalidHandle {
                message: "value has been closed".to_string(),
            }),
            id => Ok(FsValue { id }),
        }
    }

    fn close(&self) {
        let id = self.id.replace(0);
        if id != 0 {
            self.vm.free(FsValue { id });
        }
    }

    fn snapshot(&self) -> Result<Literal, Error> {
        snapshot::decode_str(&self.vm.to_json(self.handle()?)?)
    }
}

impl Drop for Retained<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Retained<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.id.get())
    }
}

impl PartialEq for Retained<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.vm, other.vm) && self.id.get() == other.id.get()
    }
}

macro_rules! proxy_common {
    ($name:ident) => {
        impl<'vm> $name<'vm> {
            pub(crate) fn new(vm: &'vm Vm, handle: FsValue) -> Self {
                Self {
                    inner: Retained::new(vm, handle),
                }
            }

            pub(crate) fn handle(&self) -> Result<FsValue, Error> {
                self.inner.handle()
            }

            /// Release the handle. Safe to call more than once.
            pub fn close(&self) {
                self.inner.close();
            }

            pub fn is_closed(&self) -> bool {
                self.inner.id.get() == 0
            }

            pub(crate) fn snapshot(&self) -> Result<Literal, Error> {
                self.inner.snapshot()
            }
        }

        impl fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.inner).finish()
            }
        }
    };
}

/// A FuncScript function.
#[derive(PartialEq)]
pub struct Function<'vm> {
    inner: Retained<'vm>,
}

proxy_common!(Function);

impl<'vm> Function<'vm> {
    /// Call the function.
    ///
    /// ```
    /// let vm = funcscript::Vm::new().unwrap();
    /// let add = vm.eval("(a, b) => a + b").unwrap();
    /// let add = add.as_function().unwrap();
    /// assert_eq!(add.call(&[1i64.into(), 2i64.into()]).unwrap().as_i64(), Some(3));
    /// ```
    pub fn call(&self, args: &[Arg<'_, '_>]) -> Result<Value<'vm>, Error> {
        self.inner.vm.call_handle(self.handle()?, args)
    }
}

/// A FuncScript list.
#[derive(PartialEq)]
pub struct List<'vm> {
    inner: Retained<'vm>,
}

proxy_common!(List);

impl<'vm> List<'vm> {
    pub fn len(&self) -> Result<usize, Error> {
        let len = self.inner.vm.len(self.handle()?)?;
        usize::try_from(len).map_err(|_| Error::ResourceExceeded {
            message: format!("list of {len} items"),
        })
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    /// Item at `index`; negative indexes count from the end.
    pub fn get(&self, index: i64) -> Result<Value<'vm>, Error> {
        let vm = self.inner.vm;
        let item = vm.index(self.handle()?, index)?;
        vm.adopt(item)
    }

    /// Items in `range`, which is clamped to the list.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Result<Vec<Value<'vm>>, Error> {
        let len = self.len()?;
        let start = match range.start_bound() {
            Bound::Included(&i) => i,
            Bound::Excluded(&i) => i.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&i) => i.saturating_add(1),
            Bound::Excluded(&i) => i,
            Bound::Unbounded => len,
        }
        .min(len);
        (start..end).map(|i| self.get(i as i64)).collect()
    }

    pub fn iter(&self) -> Result<Iter<'_, 'vm>, Error> {
        Ok(Iter {
            list: self,
            next: 0,
            len: self.len()?,
        })
    }

    pub fn to_vec(&self) -> Result<Vec<Value<'vm>>, Error> {
        self.slice(..)
    }
}

/// Iterator over the items of a [`List`].
pub struct Iter<'a, 'vm> {
    list: &'a List<'vm>,
    next: usize,
    len: usize,
}

impl<'vm> Iterator for Iter<'_, 'vm> {
    type Item = Result<Value<'vm>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let item = self.list.get(self.next as i64);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len - self.next;
        (left, Some(left))
    }
}

/// A FuncScript key-value collection. Keys match case-insensitively.
#[derive(PartialEq)]
pub struct KeyValueCollection<'vm> {
    inner: Retained<'vm>,
}

proxy_common!(KeyValueCollection);

impl<'vm> KeyValueCollection<'vm> {
    /// Keys in insertion order.
    pub fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.vm.keys(self.handle()?)
    }

    pub fn get(&self, key: &str) -> Result<Value<'vm>, Error> {
        let vm = self.inner.vm;
        let value = vm.get_key(self.handle()?, key)?;
        vm.adopt(value)
    }

    /// Like `get`, but a missing key yields `default`.
    pub fn get_or(&self, key: &str, default: Value<'vm>) -> Result<Value<'vm>, Error> {
        match self.get(key) {
            Err(Error::KeyNotFound { .. }) => Ok(default),
            other => other,
        }
    }

    pub fn contains_key(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_lowercase();
        Ok(self.keys()?.iter().any(|k| k.to_lowercase() == key))
    }

    pub fn to_map(&self) -> Result<IndexMap<String, Value<'vm>>, Error> {
        let mut map = IndexMap::new();
        for key in self.keys()? {
            let value = self.get(&key)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

pub(crate) fn not_a_function(expr: &str) -> Error {
    Error::TypeMismatch {
        code: codes::TYPE_MISMATCH,
        message: format!("'{expr}' did not evaluate to a Function"),
    }
}
