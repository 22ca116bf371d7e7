pub mod datetime;
pub mod function;
pub mod kvc;
pub mod lambda;
pub mod value;

pub use function::{Function, NativeFn, NativeFunction};
pub use kvc::{Entry, Kvc};
pub use lambda::LambdaFunction;
pub use value::{RangeValue, Sequence, Value};

#[cfg(test)]
mod value_test;
