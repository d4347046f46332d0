//! `{{variable}}` substitution for URL templates
//!
//! This is deliberately not a template engine: placeholders are replaced by
//! the matching parameter value verbatim (no HTML or URL escaping), dotted
//! names address nested parameter objects, and placeholders with no matching
//! parameter are left in the output untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Template variables
pub type Params = Map<String, Value>;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_$.\-]+)\s*\}\}").expect("valid placeholder regex"));

/// Build a parameter map from key/value pairs
pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Params
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Overlay `overrides` on top of `base`, returning a new map
#[must_use]
pub fn merge_params(base: &Params, overrides: Option<&Params>) -> Params {
    let mut merged = base.clone();
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Render `template` against `params`
#[must_use]
pub fn render(template: &str, params: &Params) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            lookup(params, &caps[1])
                .and_then(scalar_text)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn lookup<'a>(params: &'a Params, name: &str) -> Option<&'a Value> {
    // Exact keys win over dotted traversal
    if let Some(value) = params.get(name) {
        return Some(value);
    }
    let mut segments = name.split('.');
    let mut current = params.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
