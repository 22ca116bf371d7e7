//! FuncScript - an expression language embedded through handles
//!
//! # Overview
//!
//! A [`Vm`] owns one evaluation context in the engine. Evaluating source
//! returns a [`Value`]: scalars are copied out, while lists, key-value
//! collections and functions stay in the engine and are reached through
//! proxies that release their handle when dropped.
//!
//! # Quick Start
//!
//! ```
//! use funcscript::{Value, Vm};
//!
//! let vm = Vm::new().unwrap();
//!
//! let total = vm.eval("Sum(Range(1, 10))").unwrap();
//! assert_eq!(total, Value::Int(55));
//!
//! let person = vm.eval("{name: 'Ada', langs: ['en', 'fr']}").unwrap();
//! let person = person.as_collection().unwrap();
//! assert_eq!(person.keys().unwrap(), ["name", "langs"]);
//!
//! let langs = person.get("langs").unwrap();
//! assert_eq!(langs.as_list().unwrap().get(-1).unwrap().as_str(), Some("fr"));
//! ```
//!
//! # Host services
//!
//! `file`, `fileexists`, `isfile`, `dirlist` and `log` call back into the
//! host through [`HostServices`]. [`Vm::new`] uses [`StdFsServices`]; supply
//! your own with [`Vm::with_services`].
//!
//! # Default `Vm`
//!
//! [`eval`], [`eval_json`] and [`call`] run on a per-thread `Vm` created on
//! first use and return plain [`Literal`]s.

mod default;
mod error;
mod error_renderer;
mod literal;
mod proxy;
mod services;
pub mod snapshot;
mod value;
mod vm;

pub use default::{call, eval, eval_json};
pub use error::Error;
pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
pub use literal::Literal;
pub use proxy::{Function, Iter, KeyValueCollection, List};
pub use services::{HostServices, ServiceError, StdFsServices};
pub use value::{Arg, Value};
pub use vm::{Vm, VmOptions};
