//! Failure raised by injected repositories and caches.

use std::error::Error as StdError;

use thiserror::Error;

/// A delegated store or cache call failed.
///
/// The core never retries; the failure is handed back to the caller with the
/// name of the operation that was attempted.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct BackendError {
    operation: &'static str,
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl BackendError {
    /// Wrap `source` as the failure of `operation`.
    pub fn new<E>(operation: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self {
            operation,
            source: source.into(),
        }
    }

    /// Name of the operation that failed.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }
}
