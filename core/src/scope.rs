//! Lexical scopes for variable bindings.
//!
//! Scopes form a persistent chain so closures can keep the scope they were
//! created in alive after the evaluation that built them has returned:
//! - **Root**: the built-in library, shared by every evaluation
//! - **Frame**: lambda parameters bound at call time
//! - **Kvc**: the entries of a key-value collection, visible to each other
//!
//! Names are case-insensitive.
//! ```text
//! { a: 1; b: a + 1; eval (x) => x + b }   // the lambda sees `b`, `b` sees `a`
//! ```

use std::rc::Rc;

use crate::stdlib;
use crate::values::{Kvc, Value};

pub enum Scope {
    Root,
    Frame {
        bindings: Vec<(String, Value)>,
        parent: Rc<Scope>,
    },
    Kvc {
        kvc: Rc<Kvc>,
        parent: Rc<Scope>,
    },
}

/// Result of a name lookup.
///
/// Collection entries are returned unevaluated so the evaluator can force
/// them (and detect cycles) itself.
pub enum Binding {
    Value(Value),
    Entry(Rc<Kvc>),
}

impl Scope {
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        let mut scope = self;
        loop {
            match scope {
                Scope::Root => return stdlib::lookup(name).map(Binding::Value),
                Scope::Frame { bindings, parent } => {
                    if let Some((_, value)) =
                        bindings.iter().find(|(n, _)| n.eq_ignore_ascii_case(name))
                    {
                        return Some(Binding::Value(value.clone()));
                    }
                    scope = parent;
                }
                Scope::Kvc { kvc, parent } => {
                    if kvc.contains_key(name) {
                        return Some(Binding::Entry(kvc.clone()));
                    }
                    scope = parent;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shadows_parent_case_insensitively() {
        let root = Rc::new(Scope::Root);
        let outer = Rc::new(Scope::Frame {
            bindings: vec![("x".to_string(), Value::Int(1))],
            parent: root,
        });
        let inner = Scope::Frame {
            bindings: vec![("X".to_string(), Value::Int(2))],
            parent: outer.clone(),
        };
        assert!(matches!(inner.lookup("x"), Some(Binding::Value(Value::Int(2)))));
        assert!(matches!(outer.lookup("X"), Some(Binding::Value(Value::Int(1)))));
    }

    #[test]
    fn test_root_resolves_builtins() {
        let root = Scope::Root;
        assert!(matches!(root.lookup("Range"), Some(Binding::Value(Value::Function(_)))));
        assert!(root.lookup("no_such_name").is_none());
    }

    #[test]
    fn test_kvc_entries_are_returned_unevaluated() {
        let kvc = Rc::new(Kvc::from_values([("a", Value::Int(1))]));
        let scope = Scope::Kvc {
            kvc,
            parent: Rc::new(Scope::Root),
        };
        assert!(matches!(scope.lookup("A"), Some(Binding::Entry(_))));
    }
}
