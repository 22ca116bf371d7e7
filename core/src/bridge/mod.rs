//! The foreign-value bridge: handles, kinds, snapshots and the marshaller.
//!
//! Values produced by an evaluation stay inside the context that produced
//! them. Hosts see them either as deep JSON snapshots or as opaque handles
//! that can be queried (`len`, `index`, `get_key`, ...) and called.

mod handle;
mod kind;
mod marshal;
pub mod snapshot;

pub use handle::{Handle, HandleTable};
pub use kind::Kind;
pub use marshal::Marshaller;
pub use snapshot::Envelope;

#[cfg(test)]
mod marshal_test;
