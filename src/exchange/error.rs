//! Exchange Error Types

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExchangeError {
    #[error("Queue '{queue}' is unavailable: {message}")]
    Unavailable { queue: String, message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

/// Result type for exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl crate::core::error_handling::ContextualError for ExchangeError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}
