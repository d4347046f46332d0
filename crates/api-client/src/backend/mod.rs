//! Configuration backends
//!
//! A backend knows where API documents live and which headers every request
//! should carry. Three flavours ship with the crate:
//!
//! - [`FsBackend`]: YAML files in a local directory, with per-environment
//!   override files
//! - [`HttpBackend`]: documents fetched from a base URL through the
//!   request-coalescing cache
//! - [`SsrBackend`]: the remote layout read from a local directory, cached
//!   for the life of the process
//!
//! Loading never fails: a document that cannot be read or parsed is logged
//! and skipped, and the remaining documents still merge.

mod fs;
mod http;
mod ssr;

pub use fs::{FsBackend, apply_proxy};
pub use http::{HeaderProvider, HttpBackend, HttpBackendOptions};
pub use ssr::{SsrBackend, SsrBackendOptions};

use async_trait::async_trait;
use futures::future::join_all;
use restcfg_core::template::Params;
use restcfg_core::{CallContext, ConfigTree, HeaderPayload};
use std::future::Future;
use tracing::warn;

/// Output of [`ConfigBackend::load`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedConfig {
    /// Merged API definitions
    pub tree: ConfigTree,
    /// Common template parameters supplied by the backend; they override
    /// parameters the client was constructed with
    pub common_param: Params,
}

impl LoadedConfig {
    /// Config with no common parameters
    #[must_use]
    pub fn from_tree(tree: ConfigTree) -> Self {
        Self {
            tree,
            common_param: Params::new(),
        }
    }
}

/// Source of API definitions and request headers
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Load and merge every configured document
    async fn load(&self) -> LoadedConfig;

    /// Headers to send with a request made in `ctx`
    fn headers(&self, ctx: &CallContext) -> HeaderPayload;
}

/// Fetch and parse `locators` concurrently.
///
/// The result has one slot per locator, in the same order; failed documents
/// are `None`.
pub(crate) async fn load_documents<F, Fut>(locators: &[String], fetch: F) -> Vec<Option<ConfigTree>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = restcfg_core::Result<String>>,
{
    let pending = locators.iter().map(|locator| {
        let text = fetch(locator.clone());
        async move {
            match text.await.and_then(|text| ConfigTree::from_yaml_str(&text)) {
                Ok(tree) => Some(tree),
                Err(e) => {
                    warn!(locator = %locator, error = %e, "Skipping config document");
                    None
                }
            }
        }
    });
    join_all(pending).await
}

/// Merge loaded documents in list order, later documents winning
pub(crate) fn merge_loaded(documents: Vec<Option<ConfigTree>>) -> ConfigTree {
    ConfigTree::merge_all(documents.into_iter().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use restcfg_core::Error;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_documents_keeps_order_and_skips_failures() {
        let locators = vec!["one".to_string(), "bad".to_string(), "two".to_string(), "broken".to_string()];
        let docs = load_documents(&locators, |locator| async move {
            match locator.as_str() {
                "one" => Ok("a:\n  x: http://one\n  y: http://one/y\n".to_string()),
                "two" => Ok("a:\n  x: http://two\n".to_string()),
                "broken" => Ok("- just\n- a list\n".to_string()),
                _ => Err(Error::fetch(&locator, "connection refused")),
            }
        })
        .await;

        assert_eq!(docs.len(), 4);
        assert!(docs[1].is_none());
        assert!(docs[3].is_none());

        let tree = merge_loaded(docs);
        assert_eq!(tree.lookup("a.x"), Some(&json!("http://two")));
        assert_eq!(tree.lookup("a.y"), Some(&json!("http://one/y")));
    }

    #[tokio::test]
    async fn test_load_documents_empty() {
        let docs = load_documents(&[], |_| async { Ok(String::new()) }).await;
        assert!(merge_loaded(docs).is_empty());
    }
}
