//! Requests and responses described as plain data
//!
//! The executor assembles a [`RequestDescriptor`], hooks may rewrite it, and
//! a [`Transport`](crate::transport::Transport) turns it into a
//! [`RawResponse`]. Keeping both sides as plain data keeps hooks and fake
//! transports trivial to write.

use restcfg_core::{HeaderSet, HttpMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fully resolved request, ready for the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// HTTP verb
    pub method: HttpMethod,
    /// Rendered URL
    pub url: String,
    /// Query string parameters, appended by the transport
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
    /// Outgoing headers
    pub headers: HeaderSet,
}

impl RequestDescriptor {
    /// A bodiless request with no query or headers
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderSet::new(),
        }
    }
}

/// Response as received from the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Response headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Body text
    pub body: String,
}

impl RawResponse {
    /// Whether the status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parsed body: empty → `null`, JSON → value, anything else → string
    #[must_use]
    pub fn json(&self) -> Value {
        if self.body.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

/// Collect query parameters from a JSON object, rendering scalars as text
#[must_use]
pub fn query_pairs(params: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(k, v)| {
            let text = match v {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((k.clone(), text))
        })
        .collect()
}
