//! Public API for evaluating FuncScript expressions and inspecting results.
//!
//! A [`Context`] evaluates source text and hands results back either as
//! JSON snapshots or as opaque [`Handle`]s that can be queried and called
//! later. The C ABI in `ffi` is a thin layer over this module.
//!
//! # Example
//!
//! ```
//! use funcscript_core::api::{Context, ContextOptions};
//!
//! let mut context = Context::new(ContextOptions::default()).unwrap();
//! assert_eq!(context.eval_json("{a: 1, b: [true, nil]}").unwrap(), r#"{"a":1,"b":[true,null]}"#);
//!
//! let f = context.eval_to_handle("(x, y) => x * y").unwrap();
//! let three = context.eval_to_handle("3").unwrap();
//! let four = context.eval_to_handle("4").unwrap();
//! let product = context.call_handle(f, &[three, four]).unwrap();
//! assert_eq!(context.to_snapshot(product).unwrap(), "12");
//! ```

mod context;
pub mod error;
mod options;


pub use crate::bridge::{Handle, Kind};
pub use context::{Context, State};
pub use error::Error;
pub use options::ContextOptions;
