//! Centralized error types and conversions for trashday
//!
//! Library code returns `TrashdayError`. The CLI and gateway wrap it with
//! `anyhow` for context.

use std::path::PathBuf;
use thiserror::Error;
use tracing::Level;

/// Global error type for trashday operations
#[derive(Error, Debug)]
pub enum TrashdayError {
    /// IO errors with path context
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// External service errors (LINE Messaging API)
    #[error("External service error ({service}): {message}")]
    ExternalService { service: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// A reply that a channel cannot deliver
    #[error("Channel error: {message}")]
    Channel { message: String },

    /// Per-sender session bookkeeping failures
    #[error("Session error for {sender_id}: {message}")]
    Session { sender_id: String, message: String },

    /// A static asset could not be loaded
    #[error("Asset error on {path}: {message}")]
    Asset { path: PathBuf, message: String },
}

impl TrashdayError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    pub fn session(sender_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Session {
            sender_id: sender_id.into(),
            message: message.into(),
        }
    }

    pub fn asset(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Asset {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the error severity level for logging
    pub fn severity(&self) -> Level {
        match self {
            TrashdayError::Config { .. } => Level::ERROR,
            TrashdayError::Asset { .. } => Level::ERROR,
            TrashdayError::Serialization { .. } => Level::ERROR,
            // A failed reply only loses that one reply
            TrashdayError::ExternalService { .. } => Level::WARN,
            TrashdayError::Io { .. } => Level::WARN,
            TrashdayError::Channel { .. } => Level::WARN,
            TrashdayError::Session { .. } => Level::DEBUG,
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            TrashdayError::Config { .. } => Some(
                "Check ~/.trashday/config.json or the LINE_CHANNEL_* environment variables."
                    .to_string(),
            ),
            TrashdayError::ExternalService { service, .. } if service == "line" => Some(
                "Check LINE_CHANNEL_ACCESS_TOKEN and network connectivity.".to_string(),
            ),
            TrashdayError::Asset { .. } => {
                Some("Run 'trashday init' or fix template_path in the config file.".to_string())
            }
            _ => None,
        }
    }
}

/// Result type alias using TrashdayError
pub type Result<T> = std::result::Result<T, TrashdayError>;

impl From<serde_json::Error> for TrashdayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// The first `TrashdayError` in an error's cause chain.
pub fn find_trashday_error(err: &anyhow::Error) -> Option<&TrashdayError> {
    err.chain().find_map(|cause| cause.downcast_ref::<TrashdayError>())
}

/// Logs `err` at the severity of the `TrashdayError` it wraps, ERROR otherwise.
pub fn log_error(what: &str, err: &anyhow::Error) {
    let level = find_trashday_error(err)
        .map(TrashdayError::severity)
        .unwrap_or(Level::ERROR);

    if level == Level::ERROR {
        tracing::error!("{}: {:#}", what, err);
    } else if level == Level::WARN {
        tracing::warn!("{}: {:#}", what, err);
    } else if level == Level::INFO {
        tracing::info!("{}: {:#}", what, err);
    } else {
        tracing::debug!("{}: {:#}", what, err);
    }
}

/// Suggestion for the `TrashdayError` wrapped anywhere in `err`.
pub fn suggestion_for(err: &anyhow::Error) -> Option<String> {
    find_trashday_error(err).and_then(TrashdayError::suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_io_error_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = TrashdayError::io("/test/path", io_err);
        assert!(err.to_string().contains("/test/path"));
        assert_eq!(err.severity(), Level::WARN);
    }

    #[test]
    fn test_config_error_severity_and_suggestion() {
        let err = TrashdayError::config("reference month out of range");
        assert_eq!(err.severity(), Level::ERROR);
        assert!(err.suggestion().unwrap().contains("config.json"));
    }

    #[test]
    fn test_external_service_suggestion() {
        let line_err = TrashdayError::external_service("line", "401");
        assert!(line_err.suggestion().unwrap().contains("LINE_CHANNEL_ACCESS_TOKEN"));

        let other = TrashdayError::external_service("cdn", "timeout");
        assert!(other.suggestion().is_none());
    }

    #[test]
    fn test_serde_json_conversion() {
        let json_err = serde_json::from_str::<i32>("invalid").unwrap_err();
        let converted: TrashdayError = json_err.into();
        assert!(matches!(converted, TrashdayError::Serialization { .. }));
    }

    #[test]
    fn test_find_through_context() {
        let err: anyhow::Error = Err::<(), _>(TrashdayError::channel("no reply token"))
            .context("Failed to deliver")
            .unwrap_err();

        let found = find_trashday_error(&err).unwrap();
        assert_eq!(found.severity(), Level::WARN);
        assert!(suggestion_for(&err).is_none());

        let plain = anyhow::anyhow!("something else");
        assert!(find_trashday_error(&plain).is_none());
        log_error("Plain failure", &plain);
    }

    #[test]
    fn test_suggestion_through_context() {
        let err = anyhow::Error::new(TrashdayError::config("LINE channel secret is not configured"))
            .context("Failed to start gateway");
        assert!(suggestion_for(&err).unwrap().contains("LINE_CHANNEL_"));
    }
}
