//! Error types for the notification system

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("Failed to publish {event_type} event to {} subscribers: {failed_subscribers:?}", failed_subscribers.len())]
    PublishFailed {
        event_type: String,
        failed_subscribers: Vec<String>,
    },

    #[error("Notification state unavailable: {message}")]
    OperationFailed { message: String },
}

pub type NotificationResult<T> = Result<T, NotificationError>;

impl crate::core::error_handling::ContextualError for NotificationError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}
