//! Structured error types for configuration source resolution.

use serde::Serialize;
use std::path::PathBuf;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    DirectoryCreationFailure,
    MalformedPersistedFile,
    MalformedPropertiesFile,
    SourceDiscoveryFailure,
    InvalidArgument,
    IoError,
}

/// Errors raised while building or writing configuration sources.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The directory meant to hold the persisted override file does not exist
    /// and could not be created.
    #[error("directory {} for the persisted configuration does not exist and could not be created", .dir.display())]
    DirectoryCreation {
        dir: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The persisted override file exists but is not valid `key=value` text.
    #[error("persisted configuration {}:{line} is malformed: {reason}", .path.display())]
    MalformedPersistedFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A bundled properties file is not valid `key=value` text.
    #[error("properties file {origin}:{line} is malformed: {reason}")]
    MalformedProperties {
        origin: String,
        line: usize,
        reason: String,
    },

    /// A bundled properties location could not be scanned.
    #[error("failed to scan {location} for properties files: {source}")]
    SourceDiscovery {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid argument '{value}': {reason}")]
    InvalidArgument { value: String, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Programmatic error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::DirectoryCreation { .. } => ErrorCode::DirectoryCreationFailure,
            ConfigError::MalformedPersistedFile { .. } => ErrorCode::MalformedPersistedFile,
            ConfigError::MalformedProperties { .. } => ErrorCode::MalformedPropertiesFile,
            ConfigError::SourceDiscovery { .. } => ErrorCode::SourceDiscoveryFailure,
            ConfigError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            ConfigError::Io { .. } => ErrorCode::IoError,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_argument(value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidArgument {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Serializable summary for JSON output.
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Structured error for machine-readable output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_serialize_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::MalformedPersistedFile).unwrap();
        assert_eq!(json, "\"MALFORMED_PERSISTED_FILE\"");
    }

    #[test]
    fn test_malformed_message_includes_location() {
        let err = ConfigError::MalformedPersistedFile {
            path: PathBuf::from("/tmp/confstack.properties"),
            line: 3,
            reason: "missing '=' separator".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/confstack.properties:3"));
        assert!(msg.contains("missing '=' separator"));
        assert_eq!(err.code(), ErrorCode::MalformedPersistedFile);
    }

    #[test]
    fn test_report_carries_code_and_message() {
        let err = ConfigError::invalid_argument("foo", "expected KEY=VALUE");
        let report = err.to_report();
        assert_eq!(report.code, ErrorCode::InvalidArgument);
        assert!(report.message.contains("expected KEY=VALUE"));
    }
}
