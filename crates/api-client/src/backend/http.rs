//! API documents fetched over HTTP

use super::{ConfigBackend, LoadedConfig, load_documents, merge_loaded};
use crate::config::ClientConfig;
use crate::error::ApiResult;
use crate::request::RequestDescriptor;
use crate::transport::{ReqwestTransport, Transport};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use restcfg_core::template::Params;
use restcfg_core::{
    CallContext, Error, HeaderPayload, HttpMethod, RequestCoalescingCache, ResultExt,
    StateProvider,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Header state handed to every request
pub type HeaderProvider = StateProvider<HeaderPayload>;

/// Cache shared by every HTTP backend in the process unless one is injected
static SESSION_CACHE: Lazy<Arc<RequestCoalescingCache>> =
    Lazy::new(|| Arc::new(RequestCoalescingCache::default()));

/// Where remote documents live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpBackendOptions {
    /// Directory URL holding `{name}.yml` documents
    pub base_url: String,
    /// Full URL of the common parameters document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_param_url: Option<String>,
    /// Document names, in merge order
    pub cfg_names: Vec<String>,
}

impl HttpBackendOptions {
    /// Options for `cfg_names` under `base_url`
    pub fn new<I, S>(base_url: impl Into<String>, cfg_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_url: base_url.into(),
            common_param_url: None,
            cfg_names: cfg_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Builder-style method to set the common parameters document URL
    #[must_use]
    pub fn with_common_param_url(mut self, url: impl Into<String>) -> Self {
        self.common_param_url = Some(url.into());
        self
    }

    /// `base_url` with exactly one trailing `/`
    #[must_use]
    pub fn normalized_base_url(&self) -> String {
        if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        }
    }
}

/// Backend fetching documents from a base URL
///
/// All fetches go through a [`RequestCoalescingCache`], so concurrent
/// clients loading the same documents share one request per document and
/// reuse it until the entry expires.
#[derive(Clone)]
pub struct HttpBackend {
    options: HttpBackendOptions,
    header_provider: HeaderProvider,
    cache: Arc<RequestCoalescingCache>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("options", &self.options)
            .field("header_provider", &self.header_provider)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Backend using the default transport and the process-wide session cache
    pub fn new(options: HttpBackendOptions, header_provider: HeaderProvider) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(&ClientConfig::default())?;
        Ok(Self {
            options,
            header_provider,
            cache: Arc::clone(&SESSION_CACHE),
            transport: Arc::new(transport),
        })
    }

    /// Builder-style method to fetch documents through another transport
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Builder-style method to use a dedicated cache
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<RequestCoalescingCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Options in effect
    #[must_use]
    pub fn options(&self) -> &HttpBackendOptions {
        &self.options
    }

    /// The header state provider
    #[must_use]
    pub fn header_provider(&self) -> &HeaderProvider {
        &self.header_provider
    }

    /// URL of the document called `name`
    #[must_use]
    pub fn document_url(&self, name: &str) -> String {
        format!("{}{name}.yml", self.options.normalized_base_url())
    }

    async fn fetch(&self, url: String) -> restcfg_core::Result<String> {
        let transport = &self.transport;
        self.cache
            .fetch_or_cache(&url, || fetch_text(Arc::clone(transport), url.clone()))
            .await
            .context("Loading remote API document")
    }
}

async fn fetch_text(transport: Arc<dyn Transport>, url: String) -> restcfg_core::Result<String> {
    let response = transport
        .send(RequestDescriptor::new(HttpMethod::Get, url.as_str()))
        .await
        .map_err(|e| Error::fetch(&url, e))?;

    if !response.is_success() {
        return Err(Error::fetch(
            &url,
            format!("HTTP {} {}", response.status, response.status_text),
        ));
    }
    Ok(response.body)
}

#[async_trait]
impl ConfigBackend for HttpBackend {
    async fn load(&self) -> LoadedConfig {
        let mut locators: Vec<String> = self
            .options
            .cfg_names
            .iter()
            .map(|name| self.document_url(name))
            .collect();
        let has_common = self.options.common_param_url.is_some();
        if let Some(ref url) = self.options.common_param_url {
            locators.push(url.clone());
        }

        debug!(documents = locators.len(), "Loading remote config documents");
        let mut documents = load_documents(&locators, |url| self.fetch(url)).await;

        let common_param = if has_common {
            documents.pop().flatten().map(|tree| tree.into_map()).unwrap_or_default()
        } else {
            Params::new()
        };

        LoadedConfig {
            tree: merge_loaded(documents),
            common_param,
        }
    }

    fn headers(&self, _ctx: &CallContext) -> HeaderPayload {
        self.header_provider.value()
    }
}
