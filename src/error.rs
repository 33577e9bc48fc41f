//! Error handling types for orikomi
//!
//! Reconciliation never surfaces errors to its callers; these types cover the
//! edges around it (folds queries and lock recovery).

use std::sync::PoisonError;
use thiserror::Error;

/// Error type for folding operations that can fail outright
#[derive(Debug, Error)]
pub enum FoldingError {
    /// Folds query could not be compiled
    #[error("Query error: {message}")]
    Query { message: String },

    /// Query file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for folding operations
pub type FoldingResult<T> = Result<T, FoldingError>;

/// Helper trait to convert PoisonError into a recovered guard
pub trait LockResultExt<T> {
    /// Recover the guard from a poisoned lock, logging the recovery.
    ///
    /// The context parameter identifies which operation triggered lock recovery,
    /// helping developers debug thread safety issues.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "orikomi::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

impl FoldingError {
    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        FoldingError::Query {
            message: message.into(),
        }
    }
}
