//! Advancer Error Types
//!
//! Only infrastructure failures are errors. A worker declaring failure is a
//! normal hop routed to the `err` resolution.

use crate::exchange::api::ExchangeError;

#[derive(Debug, thiserror::Error)]
pub enum AdvancerError {
    #[error("No worker registered for queue '{queue}'")]
    NoWorker { queue: String },

    #[error("Failed to lease from '{queue}': {source}")]
    Lease {
        queue: String,
        #[source]
        source: ExchangeError,
    },

    #[error("Failed to post result to '{queue}': {source}")]
    Post {
        queue: String,
        #[source]
        source: ExchangeError,
    },

    #[error("Failed to remove input from '{queue}': {source}")]
    Remove {
        queue: String,
        #[source]
        source: ExchangeError,
    },
}

/// Result type for advancer operations
pub type AdvancerResult<T> = Result<T, AdvancerError>;

impl crate::core::error_handling::ContextualError for AdvancerError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}
