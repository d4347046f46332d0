//! Logical API name → method + rendered URL

use crate::error::{ApiError, ApiResult};
use crate::request::query_pairs;
use restcfg_core::template::{self, Params};
use restcfg_core::{ConfigTree, EndpointDef, HttpMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Endpoint after template rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// HTTP verb
    pub method: HttpMethod,
    /// Rendered URL
    pub url: String,
}

/// Rendered endpoint including its query string, as returned to callers
/// that want the URL without issuing the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    /// Full URL, query string included
    pub end_point: String,
    /// HTTP verb
    pub method: HttpMethod,
}

/// Resolves dotted API names against a config tree
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointResolver;

impl EndpointResolver {
    /// Look up `name` and render its template
    ///
    /// Common parameters are applied first; path parameters override them.
    pub fn resolve(
        tree: &ConfigTree,
        name: &str,
        common_param: &Params,
        path_params: Option<&Params>,
    ) -> ApiResult<ResolvedEndpoint> {
        let Some(value) = tree.lookup(name).filter(|value| !is_blank(value)) else {
            return Err(ApiError::NoSuchEndpoint {
                name: name.to_string(),
                config: tree.to_pretty_string(),
            });
        };

        let def = EndpointDef::from_value(value).ok_or_else(|| ApiError::InvalidEndpoint {
            name: name.to_string(),
        })?;

        let params = template::merge_params(common_param, path_params);
        let url = template::render(def.template(), &params);

        debug!(api = name, method = %def.method(), url = %url, "Resolved endpoint");

        Ok(ResolvedEndpoint {
            method: def.method(),
            url,
        })
    }

    /// Attach a query string to a resolved endpoint
    ///
    /// `?` is only appended when there is at least one parameter.
    #[must_use]
    pub fn with_query(resolved: ResolvedEndpoint, query: Option<&Params>) -> ApiEndpoint {
        let pairs = query.map(query_pairs).unwrap_or_default();
        let end_point = if pairs.is_empty() {
            resolved.url
        } else {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            format!("{}?{encoded}", resolved.url)
        };

        ApiEndpoint {
            end_point,
            method: resolved.method,
        }
    }
}

/// Declared but empty leaves (`todo:`, `''`, `false`, `0`) count as missing
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}
