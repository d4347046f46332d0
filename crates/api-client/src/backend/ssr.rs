//! Remote document layout served from the local filesystem
//!
//! Server-side renderers ship the same `{baseUrl}/{name}.yml` tree a browser
//! would fetch, but read it straight from disk. File contents are cached
//! for the life of the process.

use super::http::{HeaderProvider, HttpBackendOptions};
use super::{ConfigBackend, LoadedConfig, load_documents, merge_loaded};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use restcfg_core::template::Params;
use restcfg_core::{CallContext, Error, HeaderPayload, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::RwLock;
use tracing::debug;

/// File contents by path, shared by every SSR backend in the process
static FILE_CACHE: Lazy<RwLock<HashMap<String, String>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// [`HttpBackendOptions`] plus the local directory standing in for the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsrBackendOptions {
    /// Remote layout
    #[serde(flatten)]
    pub http: HttpBackendOptions,
    /// Directory the remote paths are resolved under
    pub ssr_base_dir: String,
}

impl SsrBackendOptions {
    /// Options resolving `http` paths under `ssr_base_dir`
    pub fn new(http: HttpBackendOptions, ssr_base_dir: impl Into<String>) -> Self {
        Self {
            http,
            ssr_base_dir: ssr_base_dir.into(),
        }
    }

    fn base_dir(&self) -> &str {
        self.ssr_base_dir.strip_suffix('/').unwrap_or(&self.ssr_base_dir)
    }

    /// Path of the document called `name`
    #[must_use]
    pub fn document_path(&self, name: &str) -> String {
        format!("{}{}{name}.yml", self.base_dir(), self.http.normalized_base_url())
    }

    /// Path of the common parameters document, if configured
    #[must_use]
    pub fn common_param_path(&self) -> Option<String> {
        self.http
            .common_param_url
            .as_ref()
            .map(|url| format!("{}{url}", self.base_dir()))
    }
}

/// Backend reading the remote layout from a local directory
#[derive(Debug, Clone)]
pub struct SsrBackend {
    options: SsrBackendOptions,
    header_provider: HeaderProvider,
}

impl SsrBackend {
    /// Create a backend
    #[must_use]
    pub fn new(options: SsrBackendOptions, header_provider: HeaderProvider) -> Self {
        Self {
            options,
            header_provider,
        }
    }

    /// Options in effect
    #[must_use]
    pub fn options(&self) -> &SsrBackendOptions {
        &self.options
    }
}

async fn read_cached(path: String) -> restcfg_core::Result<String> {
    let cached = FILE_CACHE
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&path)
        .cloned();
    if let Some(text) = cached {
        debug!(path = %path, "SSR cache hit");
        return Ok(text);
    }

    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::file_not_found(&path),
            _ => Error::from(e),
        })
        .context("Reading server-side API document")?;

    FILE_CACHE
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .insert(path, text.clone());
    Ok(text)
}

#[async_trait]
impl ConfigBackend for SsrBackend {
    async fn load(&self) -> LoadedConfig {
        let mut paths: Vec<String> = self
            .options
            .http
            .cfg_names
            .iter()
            .map(|name| self.options.document_path(name))
            .collect();
        let common_path = self.options.common_param_path();
        let has_common = common_path.is_some();
        paths.extend(common_path);

        let mut documents = load_documents(&paths, read_cached).await;

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
