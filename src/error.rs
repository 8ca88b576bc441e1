//! Error types for apollo-watch.

use std::fmt;

/// Result type alias for apollo-watch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur while detecting and fetching namespace changes.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The HTTP transport failed (connect, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote service answered with a body of the wrong shape.
    #[error("Malformed response from {endpoint}: {reason}; body: {body}")]
    MalformedResponse {
        /// Which endpoint produced the body
        endpoint: &'static str,
        /// Parser message
        reason: String,
        /// The offending body, lossily decoded
        body: String,
    },

    /// The remote service does not recognize every configured namespace.
    #[error(
        "Configuration mismatch: expected namespaces {expected:?} but the service reported {received:?}"
    )]
    ConfigurationMismatch {
        /// Locally configured namespace names
        expected: Vec<String>,
        /// Namespace names reported by the service
        received: Vec<String>,
    },

    /// Failed to encode a request or re-serialize a payload.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failed to load client settings.
    #[error("Failed to load settings: {0}")]
    Settings(String),

    /// Client settings are invalid.
    #[error("Settings validation failed: {0}")]
    Validation(String),

    /// Generic error for other cases.
    #[error("Watch error: {0}")]
    Other(String),
}

impl WatchError {
    /// Build a malformed-response error, keeping the body for diagnosis.
    pub fn malformed(endpoint: &'static str, reason: impl fmt::Display, body: &[u8]) -> Self {
        Self::MalformedResponse {
            endpoint,
            reason: reason.to_string(),
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// Whether this error must abort startup instead of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigurationMismatch { .. })
    }
}

/// Validation error for client settings.
#[derive(Debug)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A specific field has an invalid value.
    InvalidField {
        /// The field name/path
        field: String,
        /// The reason why it's invalid
        reason: String,
    },

    /// Multiple validation errors occurred.
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::InvalidField { field, reason } => {
                write!(f, "Field '{}' is invalid: {}", field, reason)
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple validation errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for WatchError {
    fn from(err: ValidationError) -> Self {
        WatchError::Validation(err.to_string())
    }
}
