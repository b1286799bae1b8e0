//! Error types shared by the backend client and the dashboard state.

use std::fmt;
use thiserror::Error;

/// Result type alias for backend and tree operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// A single field that failed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend could not be reached at all
    #[error("Disconnected from backend: {0}")]
    Disconnected(String),

    #[error("Request timed out: {0}")]
    TimedOut(String),

    /// The request was aborted or superseded by a newer one
    #[error("Request cancelled")]
    Cancelled,

    #[error("HTTP error ({status}): {message}")]
    Http { status: u16, message: String },

    /// The envelope came back with `success: false`
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid input: {}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("Cannot move {node} into {target}: target is the node itself or one of its descendants")]
    SelfMove { node: String, target: String },

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Asset {0} is not a group and cannot hold children")]
    InvalidTarget(String),

    /// The configured base URL does not form a valid request URL
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Create an HTTP error from status and message
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Aborted or superseded requests are not failures and must not be surfaced.
    pub fn is_benign(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, ApiError::Disconnected(_) | ApiError::TimedOut(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::TimedOut(err.to_string())
        } else if err.is_connect() || err.is_request() {
            ApiError::Disconnected(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::http(status.as_u16(), err.to_string())
        } else {
            ApiError::Disconnected(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_benign() {
        assert!(ApiError::Cancelled.is_benign());
        assert!(!ApiError::Backend("duplicate symbol".into()).is_benign());
        assert!(!ApiError::Disconnected("refused".into()).is_benign());
    }

    #[test]
    fn test_invalid_url_is_not_a_connectivity_error() {
        let err = ApiError::InvalidUrl("http://bad host/api/v1/health".into());
        assert!(!err.is_disconnected());
        assert!(!err.is_benign());
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = ApiError::Validation(vec![
            ValidationError::new("name", "must not be empty"),
            ValidationError::new("quantity", "must be greater than 0"),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid input: name: must not be empty; quantity: must be greater than 0"
        );
    }
}
