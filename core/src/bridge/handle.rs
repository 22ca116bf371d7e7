//! Opaque handles to values living in an evaluation context.
//!
//! A handle id packs the issuing context's tag into the high 16 bits and a
//! per-context sequence number into the low 48 bits:
//!
//! ```text
//! 63            48 47                                   0
//! +---------------+--------------------------------------+
//! |  context tag  |            sequence (>= 1)           |
//! +---------------+--------------------------------------+
//! ```
//!
//! Tags are never 0 and sequences start at 1, so id 0 is never live. Ids are
//! never reused within a context, and a handle from another context resolves
//! to nothing instead of aliasing one of ours.
//!
//! No two live tables share a tag. Tags are handed out round-robin and
//! skip those still in use, so a released tag comes back only after every
//! other tag has been issued. Creating a table fails once all 65535 tags are
//! live.

use std::sync::{Mutex, PoisonError};

use hashbrown::{HashMap, HashSet};
use once_cell::sync::Lazy;

use crate::api::Error;
use crate::values::Value;

const SEQUENCE_BITS: u32 = 48;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Tags of the live handle tables.
struct TagRegistry {
    cursor: u16,
    live: HashSet<u16>,
}

impl TagRegistry {
    fn new() -> Self {
        Self {
            cursor: 1,
            live: HashSet::new(),
        }
    }

    fn acquire(&mut self) -> Result<u16, Error> {
        if self.live.len() >= usize::from(u16::MAX) {
            return Err(Error::ResourceExceeded(
                "every context tag is in use".to_string(),
            ));
        }
        loop {
            let tag = self.cursor;
            self.cursor = self.cursor.wrapping_add(1);
            if tag != 0 && self.live.insert(tag) {
                return Ok(tag);
            }
        }
    }

    fn release(&mut self, tag: u16) {
        self.live.remove(&tag);
    }
}

static TAGS: Lazy<Mutex<TagRegistry>> = Lazy::new(|| Mutex::new(TagRegistry::new()));

fn registry() -> std::sync::MutexGuard<'static, TagRegistry> {
    TAGS.lock().unwrap_or_else(PoisonError::into_inner)
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle(pub u64);

impl Handle {
    pub const INVALID: Handle = Handle(0);

    pub fn id(self) -> u64 {
        self.0
    }

    pub fn is_invalid(self) -> bool {
        self.0 == 0
    }

    pub fn tag(self) -> u16 {
        (self.0 >> SEQUENCE_BITS) as u16
    }

    pub fn sequence(self) -> u64 {
        self.0 & SEQUENCE_MASK
    }
}

/// Live values of one context, keyed by handle id.
pub struct HandleTable {
    tag: u16,
    next: u64,
    values: HashMap<u64, Value>,
}

impl HandleTable {
    /// A table with a tag no other live table holds.
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            tag: registry().acquire()?,
            next: 1,
            values: HashMap::new(),
        })
    }

    pub fn tag(&self) -> u16 {
        self.tag
    }

    /// Store `value` under a never-before-used id.
    pub fn allocate(&mut self, value: Value) -> Result<Handle, Error> {
        if self.next > SEQUENCE_MASK {
            return Err(Error::ResourceExceeded(
                "handle sequence exhausted for this context".to_string(),
            ));
        }
        let id = (u64::from(self.tag) << SEQUENCE_BITS) | self.next;
        self.next += 1;
        self.values.insert(id, value);
        tracing::debug!(handle = id, live = self.values.len(), "handle issued");
        Ok(Handle(id))
    }

    /// `None` when the handle is zero, freed, unknown or foreign.
    pub fn resolve(&self, handle: Handle) -> Option<&Value> {
        if handle.tag() != self.tag {
            return None;
        }
        self.values.get(&handle.0)
    }

    /// Like `resolve`, but reports an `InvalidHandle` error.
    pub fn get(&self, handle: Handle) -> Result<&Value, Error> {
        self.resolve(handle).ok_or(Error::InvalidHandle(handle.0))
    }

    /// Release a handle. Freeing a dead, zero or foreign handle is a no-op;
    /// the return value tells whether a live value was dropped.
    pub fn free(&mut self, handle: Handle) -> bool {
        if handle.tag() != self.tag {
            return false;
        }
        let removed = self.values.remove(&handle.0).is_some();
        if removed {
            tracing::debug!(handle = handle.0, live = self.values.len(), "handle freed");
        }
        removed
    }

    /// Drop every live value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Number of live handles.
    pub fn live(&self) -> usize {
        self.values.len()
    }
}

impl Drop for HandleTable {
    fn drop(&mut self) {
        registry().release(self.tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_allocate_resolve_free() {
        let mut table = HandleTable::new().unwrap();
        let h = table.allocate(Value::Int(7)).unwrap();
        assert!(!h.is_invalid());
        assert_eq!(h.sequence(), 1);
        assert_eq!(h.tag(), table.tag());
        assert_eq!(table.resolve(h), Some(&Value::Int(7)));
        assert_eq!(table.live(), 1);

        assert!(table.free(h));
        assert!(table.resolve(h).is_none());
        // Second free is a harmless no-op.
        assert!(!table.free(h));
        assert_eq!(table.live(), 0);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut table = HandleTable::new().unwrap();
        let a = table.allocate(Value::Nil).unwrap();
        table.free(a);
        let b = table.allocate(Value::Nil).unwrap();
        assert!(a != b);
        assert_eq!(b.sequence(), 2);
    }

    #[test]
    fn test_foreign_and_zero_handles_resolve_to_nothing() {
        let mut ours = HandleTable::new().unwrap();
        let mut theirs = HandleTable::new().unwrap();
        assert!(ours.tag() != theirs.tag());

        let foreign = theirs.allocate(Value::Int(1)).unwrap();
        assert!(ours.resolve(foreign).is_none());
        assert!(!ours.free(foreign));
        assert_eq!(theirs.live(), 1);

        assert!(ours.resolve(Handle::INVALID).is_none());
        assert!(!ours.free(Handle::INVALID));
        assert!(matches!(ours.get(Handle::INVALID), Err(Error::InvalidHandle(0))));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut table = HandleTable::new().unwrap();
        let h = table.allocate(Value::string("x")).unwrap();
        table.allocate(Value::Bool(true)).unwrap();
        table.clear();
        assert_eq!(table.live(), 0);
        assert!(table.resolve(h).is_none());
    }

    #[test]
    fn test_live_tables_never_share_a_tag() {
        let mut first = HandleTable::new().unwrap();
        let ours = first.allocate(Value::Int(7)).unwrap();
        // Enough tables to wrap the whole tag space.
        for _ in 0..=u16::MAX {
            let mut other = HandleTable::new().unwrap();
            assert!(other.tag() != first.tag());
            let theirs = other.allocate(Value::Int(42)).unwrap();
            assert!(first.resolve(theirs).is_none());
        }
        assert_eq!(first.resolve(ours), Some(&Value::Int(7)));
    }

    #[test]
    fn test_tag_registry() {
        let mut tags = TagRegistry::new();
        assert_eq!(tags.acquire().unwrap(), 1);
        assert_eq!(tags.acquire().unwrap(), 2);

        // Wrapping around skips 0 and the tags still in use.
        tags.cursor = u16::MAX;
        assert_eq!(tags.acquire().unwrap(), u16::MAX);
        assert_eq!(tags.acquire().unwrap(), 3);

        tags.release(1);
        tags.cursor = 1;
        assert_eq!(tags.acquire().unwrap(), 1);
    }

    #[test]
    fn test_tag_registry_exhaustion() {
        let mut tags = TagRegistry::new();
        for _ in 0..u16::MAX {
            tags.acquire().unwrap();
        }
        assert!(matches!(tags.acquire(), Err(Error::ResourceExceeded(_))));
        tags.release(500);
        assert_eq!(tags.acquire().unwrap(), 500);
    }
}
