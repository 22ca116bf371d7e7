//! One-shot helpers over a lazily created, per-thread default `Vm`.
//!
//! Results are plain [`Literal`]s, so nothing borrows the shared `Vm`.

use once_cell::unsync::OnceCell;

use crate::{Arg, Error, Literal, Vm};

thread_local! {
    static DEFAULT_VM: OnceCell<Vm> = const { OnceCell::new() };
}

fn with_default<T>(f: impl FnOnce(&Vm) -> Result<T, Error>) -> Result<T, Error> {
    DEFAULT_VM.with(|cell| f(cell.get_or_try_init(Vm::new)?))
}

/// Evaluate `source` on this thread's default `Vm`.
///
/// ```
/// let sum = funcscript::eval("Sum(Range(1, 4))").unwrap();
/// assert_eq!(sum, funcscript::Literal::Int(10));
/// ```
pub fn eval(source: &str) -> Result<Literal, Error> {
    with_default(|vm| vm.eval_literal(source))
}

pub fn eval_json(source: &str) -> Result<serde_json::Value, Error> {
    with_default(|vm| vm.eval_json(source))
}

/// Evaluate `expr` to a function, call it and copy the result out.
pub fn call(expr: &str, args: &[Literal]) -> Result<Literal, Error> {
    with_default(|vm| {
        let args: Vec<Arg<'_, '_>> = args.iter().cloned().map(Arg::Literal).collect();
        vm.call(expr, &args)?.to_literal()
    })
}
