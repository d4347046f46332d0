//! Error types for the REST client

use crate::request::RawResponse;
use thiserror::Error;

/// Result type alias for client operations
pub type ApiResult<T> = Result<T, ApiError>;

/// REST client errors
///
/// `call()` callers branch on three outcomes: a parsed body, `None` (an HTTP
/// error suppressed by the classification hook), or one of these errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (connect, DNS, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A custom transport failed before a response was received
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The logical API name is absent from the merged config tree, or
    /// declared with an empty value
    #[error("No API definition found for `{name}`\n{config}")]
    NoSuchEndpoint {
        /// Dotted name that was looked up
        name: String,
        /// Pretty-printed config tree
        config: String,
    },

    /// The name resolves to something that is not an endpoint leaf
    #[error("`{name}` does not resolve to an endpoint definition")]
    InvalidEndpoint {
        /// Dotted name that was looked up
        name: String,
    },

    /// The server answered with a non-2xx status
    #[error("HTTP {status} {status_text}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Reason phrase
        status_text: String,
        /// The raw response
        response: Box<RawResponse>,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid header name or value
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error from a raw response
    #[must_use]
    pub fn http_status(response: RawResponse) -> Self {
        Self::HttpStatus {
            status: response.status,
            status_text: response.status_text.clone(),
            response: Box::new(response),
        }
    }

    /// The response attached to this error, if the server answered
    #[must_use]
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            Self::HttpStatus { response, .. } => Some(response),
            _ => None,
        }
    }

    /// HTTP status code, if the server answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether no response was received at all
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Transport(_))
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::HttpStatus { status, .. } if (400..500).contains(status))
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::HttpStatus { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, text: &str) -> RawResponse {
        RawResponse {
            status,
            status_text: text.to_string(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    #[test]
    fn test_http_status_carries_response() {
        let err = ApiError::http_status(response(404, "Not Found"));
        assert_eq!(err.status(), Some(404));
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert!(!err.is_transport());
        assert_eq!(err.response().unwrap().status_text, "Not Found");
        assert_eq!(err.to_string(), "HTTP 404 Not Found");
    }

    #[test]
    fn test_server_error() {
        let err = ApiError::http_status(response(503, "Service Unavailable"));
        assert!(err.is_server_error());
    }

    #[test]
    fn test_no_such_endpoint_message_includes_dump() {
        let err = ApiError::NoSuchEndpoint {
            name: "example.missing".into(),
            config: "{\n  \"example\": {}\n}".into(),
        };
        let message = err.to_string();
        assert!(message.contains("example.missing"));
        assert!(message.contains("\"example\""));
    }

    #[test]
    fn test_transport_classification() {
        assert!(ApiError::transport("connection reset").is_transport());
        assert!(ApiError::transport("connection reset").response().is_none());
    }
}
