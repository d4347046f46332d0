//! Merged API definition tree
//!
//! A [`ConfigTree`] is the union of every loaded API document. Documents
//! are deep-merged in order: nested mappings merge key by key, and for any
//! other conflict the later document wins.

use crate::endpoint::EndpointDef;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nested mapping of logical API names to endpoint definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(Map<String, Value>);

impl ConfigTree {
    /// Create an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one YAML document.
    ///
    /// An empty or `null` document yields an empty tree. Any other
    /// top-level value that is not a mapping is rejected.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::from_value(value)
    }

    /// Wrap an already parsed value
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::config_parse(format!(
                "expected a mapping at the document root, found {}",
                kind_of(&other)
            ))),
        }
    }

    /// Deep-merge `other` into `self`; `other` wins on conflicts
    pub fn merge(&mut self, other: ConfigTree) {
        merge_maps(&mut self.0, other.0);
    }

    /// Merge a sequence of documents left to right
    pub fn merge_all(trees: impl IntoIterator<Item = ConfigTree>) -> Self {
        trees.into_iter().fold(Self::new(), |mut acc, tree| {
            acc.merge(tree);
            acc
        })
    }

    /// Address a value by dot path, one segment at a time
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Look up a dot path and interpret it as an endpoint leaf
    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<EndpointDef> {
        self.lookup(path).and_then(EndpointDef::from_value)
    }

    /// Whether the tree has no top-level keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying mapping
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the tree into its underlying mapping
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Pretty-printed JSON dump for diagnostics
    #[must_use]
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<Map<String, Value>> for ConfigTree {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Recursively merge `src` into `dst`
pub fn merge_maps(dst: &mut Map<String, Value>, src: Map<String, Value>) {
    for (key, incoming) in src {
        match (dst.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_maps(existing, nested);
            }
            (_, incoming) => {
                dst.insert(key, incoming);
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
