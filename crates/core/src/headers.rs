//! Header sets and the two shapes header payloads arrive in

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered header name/value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderSet(BTreeMap<String, String>);

impl HeaderSet {
    /// Create an empty header set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any existing header with the same name
    /// (names compare case-insensitively)
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.0.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.0.insert(name, value.into());
    }

    /// Get a header value by case-insensitive name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Overlay `other` on top of `self`; `other` wins for same-named headers
    pub fn merge(&mut self, other: HeaderSet) {
        for (name, value) in other.0 {
            self.insert(name, value);
        }
    }

    /// Number of headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over name/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl IntoIterator for HeaderSet {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Header payload as supplied by a backend or a caller.
///
/// Backends historically return `{headers: {...}}` while callers usually
/// pass a flat mapping; both are accepted and unwrapped before merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderPayload {
    /// `{headers: {...}}`
    Wrapped {
        /// The wrapped header set
        headers: HeaderSet,
    },
    /// Plain header mapping
    Flat(HeaderSet),
}

impl Default for HeaderPayload {
    fn default() -> Self {
        Self::Wrapped {
            headers: HeaderSet::new(),
        }
    }
}

impl HeaderPayload {
    /// Unwrap into a plain header set
    #[must_use]
    pub fn into_headers(self) -> HeaderSet {
        match self {
            Self::Wrapped { headers } | Self::Flat(headers) => headers,
        }
    }

    /// Borrow the unwrapped header set
    #[must_use]
    pub fn headers(&self) -> &HeaderSet {
        match self {
            Self::Wrapped { headers } | Self::Flat(headers) => headers,
        }
    }
}

impl From<HeaderSet> for HeaderPayload {
    fn from(headers: HeaderSet) -> Self {
        Self::Flat(headers)
    }
}

impl From<BTreeMap<String, String>> for HeaderPayload {
    fn from(headers: BTreeMap<String, String>) -> Self {
        Self::Flat(headers.into_iter().collect())
    }
}

/// Merge a backend payload with call-supplied headers.
///
/// Backend headers are the base; call headers override same-named keys.
#[must_use]
pub fn merge_headers(backend: HeaderPayload, call: Option<HeaderPayload>) -> HeaderSet {
    let mut merged = backend.into_headers();
    if let Some(call) = call {
        merged.merge(call.into_headers());
    }
    merged
}
