//! Error types for polythink.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ThinkingError>;

/// Errors that can abort a thinking run or an observer call.
///
/// A voice lookup miss is not an error: lookups return `Option` and callers
/// fall back to the first catalog voice.
#[derive(Debug, Error)]
pub enum ThinkingError {
    /// The generation backend failed (transport error, bad status, stream error).
    #[error("Backend error: {0}")]
    Backend(String),

    /// A structured-output call returned a value that does not match the schema.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// The voice catalog is empty or contains duplicate ids.
    #[error("Invalid voice catalog: {0}")]
    Catalog(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Output sink or file I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ThinkingError {
    /// Shorthand for a backend failure with a message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Whether this error came from the generation backend or its transport.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ThinkingError::backend("connection reset");
        assert_eq!(err.to_string(), "Backend error: connection reset");

        let err = ThinkingError::SchemaViolation("missing shouldAdjust".into());
        assert!(err.to_string().starts_with("Schema violation"));
    }

    #[test]
    fn test_is_backend() {
        assert!(ThinkingError::backend("x").is_backend());
        assert!(!ThinkingError::Catalog("empty".into()).is_backend());
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ThinkingError = io.into();
        assert!(matches!(err, ThinkingError::Io(_)));
    }
}
