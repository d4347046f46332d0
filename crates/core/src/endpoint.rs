//! Endpoint leaf definitions
//!
//! A leaf in an API document is either a bare URL template (implying `GET`)
//! or a record with an optional `method` and a required `endPoint`:
//!
//! ```yaml
//! example:
//!   ipify1: "https://api.ipify.org/?format=json&f={{file}}"
//!   ipify2:
//!     method: POST
//!     endPoint: "{{baseURL}}/echo/{{file}}"
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// HTTP verbs an endpoint may declare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`, implied by bare string leaves
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
}

impl HttpMethod {
    /// Upper-case wire name of the verb
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a document names a verb this client does not know
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Structured endpoint leaf: `{method?, endPoint}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// HTTP verb, `GET` when omitted
    #[serde(default)]
    pub method: HttpMethod,
    /// URL template containing `{{variable}}` placeholders
    #[serde(rename = "endPoint", alias = "endPointTemplate")]
    pub end_point: String,
}

/// A resolved leaf of the config tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointDef {
    /// Bare string leaf
    Template(String),
    /// Record leaf
    Spec(EndpointSpec),
}

impl EndpointDef {
    /// Interpret a tree value as an endpoint leaf.
    ///
    /// Returns `None` for subtrees, records without `endPoint`, records
    /// naming an unsupported method, and empty templates.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(template) if !template.is_empty() => Some(Self::Template(template.clone())),
            Value::Object(map) if map.contains_key("endPoint") || map.contains_key("endPointTemplate") => {
                serde_json::from_value::<EndpointSpec>(value.clone())
                    .ok()
                    .filter(|spec| !spec.end_point.is_empty())
                    .map(Self::Spec)
            }
            _ => None,
        }
    }

    /// Effective HTTP method
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        match self {
            Self::Template(_) => HttpMethod::Get,
            Self::Spec(spec) => spec.method,
        }
    }

    /// URL template to render
    #[must_use]
    pub fn template(&self) -> &str {
        match self {
            Self::Template(template) => template,
            Self::Spec(spec) => &spec.end_point,
        }
    }
}
