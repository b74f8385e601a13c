//! Validation helpers for configuration values

use std::fmt;
use std::time::Duration;

/// A configuration value that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl crate::core::error_handling::ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// Read a strictly positive integer from a TOML table
///
/// `keys` lists accepted spellings of the same option; the first present
/// one wins. Returns `Ok(None)` when none of them is set.
pub fn positive_integer(table: &toml::Table, keys: &[&str]) -> Result<Option<u64>, ValidationError> {
    let Some((key, value)) = keys
        .iter()
        .find_map(|key| table.get(*key).map(|value| (*key, value)))
    else {
        return Ok(None);
    };

    match value.as_integer() {
        Some(n) if n > 0 => Ok(Some(n as u64)),
        Some(n) => Err(ValidationError::new(format!(
            "'{key}' must be greater than 0 (got {n})"
        ))),
        None => Err(ValidationError::new(format!(
            "'{key}' must be an integer (got {value})"
        ))),
    }
}

/// Read a duration in whole seconds
pub fn duration_secs(table: &toml::Table, keys: &[&str]) -> Result<Option<Duration>, ValidationError> {
    Ok(positive_integer(table, keys)?.map(Duration::from_secs))
}

/// Read a duration in milliseconds
pub fn duration_millis(
    table: &toml::Table,
    keys: &[&str],
) -> Result<Option<Duration>, ValidationError> {
    Ok(positive_integer(table, keys)?.map(Duration::from_millis))
}

/// Reject zero durations set programmatically
pub fn require_non_zero(name: &str, value: Duration) -> Result<Duration, ValidationError> {
    if value.is_zero() {
        Err(ValidationError::new(format!("'{name}' must be greater than 0")))
    } else {
        Ok(value)
    }
}
