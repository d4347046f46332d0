//! Main REST client implementation

use crate::backend::ConfigBackend;
use crate::call_chain::CallChain;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::executor::RequestExecutor;
use crate::hooks::{Hooks, RequestHook};
use crate::request::RequestDescriptor;
use crate::resolver::{ApiEndpoint, EndpointResolver};
use crate::transport::{ReqwestTransport, Transport};
use restcfg_core::template::Params;
use restcfg_core::{CallContext, ConfigTree, HeaderPayload};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OnceCell;
use tracing::{Span, info, instrument};
use uuid::Uuid;

/// Configuration-driven REST client
///
/// API definitions come from a [`ConfigBackend`] and are loaded once, on
/// the first call (or on [`preload`](Self::preload)); every caller racing
/// that first load waits for the same load. The client is `Send + Sync`
/// and is meant to be shared through an `Arc`.
pub struct RestClient {
    backend: Arc<dyn ConfigBackend>,
    executor: RequestExecutor,
    tree: OnceCell<ConfigTree>,
    common_param: RwLock<Params>,
    request_hook: RwLock<Option<RequestHook>>,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("loaded", &self.tree.initialized())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a client with default transport and no hooks
    pub fn new(backend: impl ConfigBackend + 'static, common_param: Params) -> ApiResult<Self> {
        Self::builder(backend).common_param(common_param).build()
    }

    /// Start building a client
    pub fn builder(backend: impl ConfigBackend + 'static) -> RestClientBuilder {
        RestClientBuilder::new(Arc::new(backend))
    }

    /// Load API definitions now instead of on the first call
    pub async fn preload(&self) {
        self.tree().await;
    }

    /// The merged API definitions, loading them if needed
    pub async fn api_config(&self) -> &ConfigTree {
        self.tree().await
    }

    /// Snapshot of the current common parameters
    #[must_use]
    pub fn common_param(&self) -> Params {
        self.common_param
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rewrite every request this client sends; runs after `on_start`
    pub fn set_request_hook(
        &self,
        hook: impl Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync + 'static,
    ) {
        *self
            .request_hook
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }

    /// Remove the request hook
    pub fn clear_request_hook(&self) {
        *self
            .request_hook
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Fluent call builder for `api`
    #[must_use]
    pub fn api(&self, api: impl Into<String>) -> CallChain<'_> {
        CallChain::new(self, api.into())
    }

    /// Call `api` in a fresh [`CallContext`]
    ///
    /// Returns the parsed response body, or `None` if an HTTP error was
    /// suppressed by the `on_response_error` hook.
    pub async fn call(
        &self,
        api: &str,
        path_param: Option<&Params>,
        query: Option<&Params>,
        body: Option<Value>,
        headers: Option<HeaderPayload>,
    ) -> ApiResult<Option<Value>> {
        self.call_with(&CallContext::new(), api, path_param, query, body, headers)
            .await
    }

    /// Call `api` as part of the call chain `ctx`
    #[instrument(
        skip(self, ctx, path_param, query, body, headers),
        fields(call_id = %ctx.id(), request_id)
    )]
    pub async fn call_with(
        &self,
        ctx: &CallContext,
        api: &str,
        path_param: Option<&Params>,
        query: Option<&Params>,
        body: Option<Value>,
        headers: Option<HeaderPayload>,
    ) -> ApiResult<Option<Value>> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let tree = self.tree().await;
        let endpoint = EndpointResolver::resolve(tree, api, &self.common_param(), path_param)?;
        let request = RequestExecutor::assemble(
            endpoint,
            query,
            body,
            self.backend.headers(ctx),
            headers,
            &request_id,
        );

        self.executor.execute(request, self.request_hook()).await
    }

    /// Rendered endpoint for `api` without sending anything
    ///
    /// `None` when the name resolves to something other than an endpoint
    /// leaf. Unknown names are an error.
    pub async fn get_api_endpoint(
        &self,
        api: &str,
        path_param: Option<&Params>,
        query: Option<&Params>,
    ) -> ApiResult<Option<ApiEndpoint>> {
        let tree = self.tree().await;
        match EndpointResolver::resolve(tree, api, &self.common_param(), path_param) {
            Ok(resolved) => Ok(Some(EndpointResolver::with_query(resolved, query))),
            Err(ApiError::InvalidEndpoint { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn request_hook(&self) -> Option<RequestHook> {
        self.request_hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn tree(&self) -> &ConfigTree {
        self.tree
            .get_or_init(|| async {
                let loaded = self.backend.load().await;
                let apis = loaded.tree.as_map().len();
                let params = loaded.common_param.len();
                self.common_param
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(loaded.common_param);
                info!(apis, common_params = params, "API definitions loaded");
                loaded.tree
            })
            .await
    }
}

/// Builder for [`RestClient`]
pub struct RestClientBuilder {
    backend: Arc<dyn ConfigBackend>,
    common_param: Params,
    hooks: Arc<Hooks>,
    transport: Option<Arc<dyn Transport>>,
    config: ClientConfig,
}

impl fmt::Debug for RestClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClientBuilder")
            .field("common_param", &self.common_param)
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RestClientBuilder {
    /// Builder over a shared backend
    #[must_use]
    pub fn new(backend: Arc<dyn ConfigBackend>) -> Self {
        Self {
            backend,
            common_param: Params::new(),
            hooks: Arc::new(Hooks::new()),
            transport: None,
            config: ClientConfig::default(),
        }
    }

    /// Initial common template parameters
    #[must_use]
    pub fn common_param(mut self, common_param: Params) -> Self {
        self.common_param = common_param;
        self
    }

    /// Hooks to run on every request; share one `Arc` across clients to
    /// intercept all of them
    #[must_use]
    pub fn hooks(mut self, hooks: Arc<Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Send requests through `transport` instead of the default one
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Configuration for the default transport
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the client
    pub fn build(self) -> ApiResult<RestClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };

        Ok(RestClient {
            backend: self.backend,
            executor: RequestExecutor::new(transport, self.hooks),
            tree: OnceCell::new(),
            common_param: RwLock::new(self.common_param),
            request_hook: RwLock::new(None),
        })
    }
}
