//! Error types for the events API client.
//!
//! # Design
//! Status codes the caller reacts to differently get their own variant:
//! 401 (the session is gone), 422 (field errors to show next to inputs) and
//! 404. Every other non-2xx response lands in `Http` with the raw status and
//! body. `MissingFields` is raised locally before any request is built.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors returned by `EventsClient` and the request pipeline.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Required create fields were absent or empty; no request was sent.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// The server returned 401. The stored token has already been cleared.
    #[error("unauthorized: {body}")]
    Unauthorized { body: String },

    /// The server returned 422 with a field-level error map.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
        body: String,
    },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound { body: String },

    /// The server returned a non-2xx status not covered above.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// No response was received (connection refused, DNS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Reading a local file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Validation { .. } => Some(422),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw server body carried by the error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { body }
            | ApiError::Validation { body, .. }
            | ApiError::NotFound { body }
            | ApiError::Http { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_message_lists_names() {
        let err = ApiError::MissingFields(vec!["title", "image"]);
        assert_eq!(err.to_string(), "missing required fields: title, image");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn status_and_body_accessors() {
        let err = ApiError::Http {
            status: 503,
            body: "down".to_string(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.body(), Some("down"));

        let err = ApiError::NotFound {
            body: "{}".to_string(),
        };
        assert_eq!(err.status(), Some(404));

        let err = ApiError::Network("refused".to_string());
        assert!(err.is_network());
        assert_eq!(err.body(), None);
    }
}
