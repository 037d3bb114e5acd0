//! Error handling module for driverwiz
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the application should use these types for consistency.

use thiserror::Error;

/// Main error type for driverwiz
#[derive(Error, Debug)]
pub enum DriverWizError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine plan errors (loading, parsing, validation)
    #[error("Engine plan error: {0}")]
    Plan(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for driverwiz operations
pub type Result<T> = std::result::Result<T, DriverWizError>;

impl DriverWizError {
    /// Create an engine plan error
    pub fn plan(msg: impl Into<String>) -> Self {
        Self::Plan(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DriverWizError::plan("missing events array");
        assert_eq!(err.to_string(), "Engine plan error: missing events array");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DriverWizError = io_err.into();
        assert!(matches!(err, DriverWizError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DriverWizError = json_err.into();
        assert!(matches!(err, DriverWizError::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
