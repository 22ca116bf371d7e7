//! FuncScript core: parser, evaluator, built-ins and the foreign-value bridge.
//!
//! Hosts talk to the engine through [`api::Context`] in Rust or through the
//! C ABI in [`ffi`]. Evaluated values stay inside their context and are
//! reached through handles (see [`bridge`]).

pub mod api;
pub mod bridge;
pub mod evaluator;
pub mod ffi;
pub mod host;
pub mod parser;
pub mod scope;
pub mod stdlib;
pub mod values;

pub use api::{Context, ContextOptions, Error, Handle, Kind};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_handles() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
