//! Fluent call builder
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo(client: &restcfg_client::RestClient) -> restcfg_client::ApiResult<()> {
//! use restcfg_core::template::params;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Ip {
//!     ip: String,
//! }
//!
//! let ip: Option<Ip> = client
//!     .api("example.ipify1")
//!     .url_param(params([("format", "json")]))
//!     .call_as()
//!     .await?;
//! # let _ = ip.map(|i| i.ip);
//! # Ok(())
//! # }
//! ```

use crate::client::RestClient;
use crate::error::ApiResult;
use restcfg_core::template::Params;
use restcfg_core::{CallContext, HeaderPayload};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Accumulates the parts of one call to a named API
#[derive(Debug)]
#[must_use = "a call chain does nothing until `.call()` is awaited"]
pub struct CallChain<'a> {
    client: &'a RestClient,
    api: String,
    path_param: Option<Params>,
    url_param: Option<Params>,
    data: Option<Value>,
    headers: Option<HeaderPayload>,
    ctx: Option<CallContext>,
}

impl<'a> CallChain<'a> {
    pub(crate) fn new(client: &'a RestClient, api: String) -> Self {
        Self {
            client,
            api,
            path_param: None,
            url_param: None,
            data: None,
            headers: None,
            ctx: None,
        }
    }

    /// Template parameters for the endpoint URL
    pub fn path_param(mut self, params: Params) -> Self {
        self.path_param = Some(params);
        self
    }

    /// Query string parameters
    pub fn url_param(mut self, params: Params) -> Self {
        self.url_param = Some(params);
        self
    }

    /// JSON request body
    pub fn data(mut self, body: Value) -> Self {
        self.data = Some(body);
        self
    }

    /// Extra headers, flat or `{headers: {...}}`
    pub fn headers(mut self, headers: impl Into<HeaderPayload>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    /// Run the call as part of `ctx` instead of a fresh context
    pub fn context(mut self, ctx: &CallContext) -> Self {
        self.ctx = Some(ctx.clone());
        self
    }

    /// Name of the API this chain calls
    #[must_use]
    pub fn api_name(&self) -> &str {
        &self.api
    }

    /// Send the request
    pub async fn call(self) -> ApiResult<Option<Value>> {
        let ctx = self.ctx.unwrap_or_default();
        self.client
            .call_with(
                &ctx,
                &self.api,
                self.path_param.as_ref(),
                self.url_param.as_ref(),
                self.data,
                self.headers,
            )
            .await
    }

    /// Send the request and deserialize the body into `T`
    pub async fn call_as<T: DeserializeOwned>(self) -> ApiResult<Option<T>> {
        match self.call().await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{ConfigBackend, LoadedConfig};
    use crate::client::RestClient;
    use crate::error::ApiError;
    use crate::hooks::Hooks;
    use crate::testing::FakeTransport;
    use async_trait::async_trait;
    use restcfg_core::template::params;
    use restcfg_core::{CallContext, ConfigTree, HeaderPayload, HeaderSet, HttpMethod};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    struct Apis;

    #[async_trait]
    impl ConfigBackend for Apis {
        async fn load(&self) -> LoadedConfig {
            LoadedConfig::from_tree(
                ConfigTree::from_value(json!({
                    "example": {
                        "ipify1": "https://api.ipify.org",
                        "update": {"method": "PUT", "endPoint": "http://x/items/{{id}}"}
                    }
                }))
                .unwrap(),
            )
        }

        fn headers(&self, ctx: &CallContext) -> HeaderPayload {
            HeaderPayload::Wrapped {
                headers: ctx.forward_headers(),
            }
        }
    }

    fn client(transport: Arc<FakeTransport>, hooks: Hooks) -> RestClient {
        RestClient::builder(Apis)
            .hooks(Arc::new(hooks))
            .transport(transport)
            .build()
            .unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ip {
        ip: String,
    }

    #[tokio::test]
    async fn test_fluent_call_assembles_request() {
        let transport = Arc::new(FakeTransport::replying(200, r#"{"ok":true}"#));
        let client = client(Arc::clone(&transport), Hooks::new());

        let headers: HeaderSet = [("X-Custom", "1")].into_iter().collect();
        let body = client
            .api("example.update")
            .path_param(params([("id", 9)]))
            .url_param(params([("dry", true)]))
            .data(json!({"name": "pear"}))
            .headers(headers)
            .call()
            .await
            .unwrap();

        assert_eq!(body, Some(json!({"ok": true})));
        let sent = transport.last();
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.url, "http://x/items/9");
        assert_eq!(sent.query, vec![("dry".to_string(), "true".to_string())]);
        assert_eq!(sent.body, Some(json!({"name": "pear"})));
        assert_eq!(sent.headers.get("x-custom"), Some("1"));
    }

    #[tokio::test]
    async fn test_call_as_deserializes() {
        let transport = Arc::new(FakeTransport::replying(200, r#"{"ip":"1.2.3.4"}"#));
        let client = client(transport, Hooks::new());

        let ip: Option<Ip> = client.api("example.ipify1").call_as().await.unwrap();
        assert_eq!(ip, Some(Ip { ip: "1.2.3.4".into() }));
    }

    #[tokio::test]
    async fn test_call_as_shape_mismatch_is_json_error() {
        let transport = Arc::new(FakeTransport::replying(200, r#"{"address":"1.2.3.4"}"#));
        let client = client(transport, Hooks::new());

        let err = client.api("example.ipify1").call_as::<Ip>().await.unwrap_err();
        assert!(matches!(err, ApiError::Json(_)));
    }

    #[tokio::test]
    async fn test_call_as_suppressed_error_is_none() {
        let transport = Arc::new(FakeTransport::replying(404, ""));
        let client = client(transport, Hooks::new().on_response_error(|_| false));

        let ip: Option<Ip> = client.api("example.ipify1").call_as().await.unwrap();
        assert_eq!(ip, None);
    }

    #[tokio::test]
    async fn test_context_headers_reach_nested_calls() {
        let transport = Arc::new(FakeTransport::replying(200, "{}"));
        let client = client(Arc::clone(&transport), Hooks::new());

        let ctx = CallContext::new();
        let nested = ctx.clone();
        ctx.set_forward_header("Authorization", "Bearer xxxxxxxx");

        let handle = tokio::spawn(async move { nested.forward_headers() });
        let forwarded = handle.await.unwrap();
        assert_eq!(forwarded.get("authorization"), Some("Bearer xxxxxxxx"));

        client.api("example.ipify1").context(&ctx).call().await.unwrap();
        assert_eq!(transport.last().headers.get("authorization"), Some("Bearer xxxxxxxx"));
    }
}
