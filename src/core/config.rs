//! TOML configuration loading
//!
//! A configuration file has up to three tables:
//!
//! ```toml
//! [exchange]
//! visibility-timeout-seconds = 30
//! retention-period-seconds = 345600
//! poll-interval-ms = 50
//! sweep-interval-ms = 1000
//!
//! [runner]
//! poll-interval-ms = 100
//! concurrency = 4
//!
//! [logging]
//! level = "debug"
//! format = "ext"
//! file = "/var/log/queuehop.log"
//! color = false
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use crate::advancer::api::RunnerConfig;
use crate::core::validation::ValidationError;
use crate::exchange::api::ExchangeConfig;
use std::path::{Path, PathBuf};

const LOG_FORMATS: &[&str] = &["text", "ext", "json"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, ConfigError::Validation(_))
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::Validation(err) => Some(err.message()),
            _ => None,
        }
    }
}

/// Logging options from the `[logging]` table
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
            color: false,
        }
    }
}

impl LoggingConfig {
    /// Apply `[logging]` values on top of the current settings
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> Result<(), ValidationError> {
        if let Some(level) = config.get("level") {
            self.level = level
                .as_str()
                .ok_or_else(|| ValidationError::new("'level' must be a string"))?
                .to_string();
        }
        if let Some(format) = config.get("format") {
            let format = format
                .as_str()
                .ok_or_else(|| ValidationError::new("'format' must be a string"))?;
            if !LOG_FORMATS.contains(&format) {
                return Err(ValidationError::new(format!(
                    "unknown log format '{format}' (expected one of: {})",
                    LOG_FORMATS.join(", ")
                )));
            }
            self.format = format.to_string();
        }
        if let Some(file) = config.get("file") {
            self.file = Some(
                file.as_str()
                    .ok_or_else(|| ValidationError::new("'file' must be a string"))?
                    .to_string(),
            );
        }
        if let Some(color) = config.get("color") {
            self.color = color
                .as_bool()
                .ok_or_else(|| ValidationError::new("'color' must be a boolean"))?;
        }
        Ok(())
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub exchange: ExchangeConfig,
    pub runner: RunnerConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: toml::Table = toml::from_str(contents)?;
        let mut settings = Settings::default();

        if let Some(exchange) = section(&config, "exchange")? {
            settings.exchange.apply_toml_values(exchange)?;
        }
        if let Some(runner) = section(&config, "runner")? {
            settings.runner.apply_toml_values(runner)?;
        }
        if let Some(logging) = section(&config, "logging")? {
            settings.logging.apply_toml_values(logging)?;
        }

        Ok(settings)
    }

    /// Read and parse a configuration file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        log::debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }
}

fn section<'a>(config: &'a toml::Table, name: &str) -> Result<Option<&'a toml::Table>, ValidationError> {
    match config.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_table()
            .map(Some)
            .ok_or_else(|| ValidationError::new(format!("'{name}' must be a table"))),
    }
}
