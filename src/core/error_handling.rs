//! Shared error reporting
//!
//! Each module defines its own error enum. They all implement
//! [`ContextualError`] so that the run-loop and embedders can report them the
//! same way regardless of which layer failed.

/// Errors that know whether their message is meant for a human operator
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error {
    /// True for configuration and routing mistakes an operator can fix
    fn is_user_actionable(&self) -> bool;

    /// The operator-facing message for actionable errors
    fn user_message(&self) -> Option<&str>;
}

/// Log an error with a one-line summary and the full detail at debug level
///
/// Actionable errors log their own message; infrastructure errors log the
/// operation context, keeping the noisy detail out of the default level.
///
/// # Examples
/// ```rust,no_run
/// # use queuehop::core::error_handling::log_error_with_context;
/// # use queuehop::core::validation::ValidationError;
/// let err = ValidationError::new("concurrency must be greater than 0");
/// log_error_with_context(&err, "Loading runner configuration");
/// // Logs: "concurrency must be greater than 0"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => {
            log::error!("{}: {}", operation_context, user_msg);
        }
        _ => {
            log::error!("{}: {}", operation_context, error);
        }
    }
    log::debug!("DETAIL: {:?}", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct TestUserError {
        message: String,
    }

    impl fmt::Display for TestUserError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl std::error::Error for TestUserError {}

    impl ContextualError for TestUserError {
        fn is_user_actionable(&self) -> bool {
            true
        }

        fn user_message(&self) -> Option<&str> {
            Some(&self.message)
        }
    }

    #[derive(Debug)]
    struct TestSystemError;

    impl fmt::Display for TestSystemError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "backend unavailable")
        }
    }

    impl std::error::Error for TestSystemError {}

    impl ContextualError for TestSystemError {
        fn is_user_actionable(&self) -> bool {
            false
        }

        fn user_message(&self) -> Option<&str> {
            None
        }
    }

    #[test]
    fn test_user_actionable_error_exposes_message() {
        let error = TestUserError {
            message: "unknown log format 'xml'".to_string(),
        };

        assert!(error.is_user_actionable());
        assert_eq!(error.user_message(), Some("unknown log format 'xml'"));
        log_error_with_context(&error, "Loading configuration");
    }

    #[test]
    fn test_system_error_has_no_user_message() {
        let error = TestSystemError;

        assert!(!error.is_user_actionable());
        assert_eq!(error.user_message(), None);
        log_error_with_context(&error, "Leasing from 'ingest'");
    }
}
