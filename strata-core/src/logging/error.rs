//! Error types for the logging subsystem

use thiserror::Error;

/// Errors that can occur while setting up logging.
#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    /// Failed to install the global subscriber.
    #[error("failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// Invalid configuration provided.
    #[error("invalid logging configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_error_display() {
        let err = LoggingError::InitializationFailed("already set".to_string());
        assert_eq!(err.to_string(), "failed to initialize logging: already set");
    }
}
