//! Configuration options for evaluation contexts.

use crate::evaluator::EvaluatorOptions;

/// Configuration options for a `Context`.
///
/// These options control resource limits for every evaluation and call made
/// through the context.
///
/// # Example
///
/// ```
/// use funcscript_core::api::ContextOptions;
///
/// let options = ContextOptions { max_depth: 500 };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// Maximum evaluation stack depth (for recursion protection).
    ///
    /// Default: 1000
    pub max_depth: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self { max_depth: 1000 }
    }
}

impl ContextOptions {
    pub(crate) fn evaluator(&self) -> EvaluatorOptions {
        EvaluatorOptions {
            max_depth: self.max_depth,
        }
    }
}
