//! Error types for grimoire operations.
//!
//! `GrimoireError` is the error of every fallible library operation and carries a
//! structured [`ErrorCode`]. `ExtractionError` is the narrower error returned by
//! best-effort extraction collaborators; callers are expected to degrade on it
//! rather than propagate it.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for grimoire operations.
pub type GrimoireResult<T> = Result<T, GrimoireError>;

/// Main error type for all grimoire operations.
#[derive(Error, Debug)]
pub enum GrimoireError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// Gazetteer loading or matching failed.
    #[error("Gazetteer error: {message}")]
    Gazetteer {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Canonical store operation failed.
    #[error("Canonical store error: {message}")]
    CanonicalStore {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValUnknownEntityKind,

    // Configuration (CFG_xxx)
    CfgInvalid,
    CfgGazetteerNotLoaded,

    // Gazetteer (GAZ_xxx)
    GazLoadFailed,
    GazInvalidEntry,

    // Canonical store (CAN_xxx)
    CanConnectionFailed,
    CanOperationFailed,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Database (DB_xxx)
    DbOperationFailed,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseInvalidYaml,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValUnknownEntityKind => "VAL_002",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::CfgGazetteerNotLoaded => "CFG_002",
            ErrorCode::GazLoadFailed => "GAZ_001",
            ErrorCode::GazInvalidEntry => "GAZ_002",
            ErrorCode::CanConnectionFailed => "CAN_001",
            ErrorCode::CanOperationFailed => "CAN_002",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::DbOperationFailed => "DB_001",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseInvalidYaml => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl GrimoireError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create an unknown entity kind error.
    pub fn unknown_kind(kind: impl AsRef<str>) -> Self {
        Self::Validation {
            message: format!("Unknown entity kind: {}", kind.as_ref()),
            code: ErrorCode::ValUnknownEntityKind,
            suggestion: None,
        }
    }

    /// Create the error raised when a required gazetteer was never loaded.
    pub fn gazetteer_not_loaded() -> Self {
        Self::Gazetteer {
            message: "matching engine used before a required gazetteer was loaded".to_string(),
            code: ErrorCode::CfgGazetteerNotLoaded,
            source: None,
        }
    }

    /// Create a gazetteer error.
    pub fn gazetteer(message: impl Into<String>) -> Self {
        Self::Gazetteer {
            message: message.into(),
            code: ErrorCode::GazLoadFailed,
            source: None,
        }
    }

    /// Create a canonical store error.
    pub fn canonical_store(message: impl Into<String>) -> Self {
        Self::CanonicalStore {
            message: message.into(),
            code: ErrorCode::CanOperationFailed,
            source: None,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::Gazetteer { code, .. } => *code,
            Self::CanonicalStore { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::Yaml(_) => ErrorCode::ParseInvalidYaml,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error reflects caller misconfiguration rather than a transient failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::CfgInvalid | ErrorCode::CfgGazetteerNotLoaded
        )
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Gazetteer {
                code: ErrorCode::CfgGazetteerNotLoaded,
                ..
            } => Some("Load a gazetteer before extracting or disable require_gazetteer"),
            Self::Gazetteer { .. } => Some("Please check the gazetteer directories and file formats"),
            Self::CanonicalStore { .. } => Some("Please check your canonical store connection settings"),
            Self::Llm { .. } => Some("Please check your LLM provider configuration"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GrimoireError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

/// Error returned by best-effort extraction collaborators (the LLM extractor).
///
/// The pipeline never propagates this error; it records the degraded source and
/// continues with an empty contribution.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The collaborator did not answer within its time budget.
    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    /// The backing provider failed.
    #[error("extraction backend failed: {0}")]
    Backend(#[from] GrimoireError),

    /// The provider answered with something that could not be interpreted.
    #[error("invalid extraction response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = GrimoireError::validation("Invalid input");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_gazetteer_not_loaded_is_configuration() {
        let err = GrimoireError::gazetteer_not_loaded();
        assert_eq!(err.code(), ErrorCode::CfgGazetteerNotLoaded);
        assert!(err.is_configuration());
        assert!(err.suggestion().is_some());

        assert!(!GrimoireError::llm("boom").is_configuration());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValInvalidInput.as_str(), "VAL_001");
        assert_eq!(ErrorCode::CanOperationFailed.as_str(), "CAN_002");
        assert_eq!(ErrorCode::LlmInvalidResponse.as_str(), "LLM_003");
    }

    #[test]
    fn test_extraction_error_wraps_backend() {
        let err: ExtractionError = GrimoireError::llm("rate limited").into();
        assert!(err.to_string().contains("rate limited"));

        let err = ExtractionError::Timeout(Duration::from_secs(3));
        assert!(err.to_string().contains("3s"));
    }
}
