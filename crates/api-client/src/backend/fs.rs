//! Local YAML documents

use super::{ConfigBackend, LoadedConfig, merge_loaded};
use async_trait::async_trait;
use futures::future::join_all;
use restcfg_core::{CallContext, ConfigTree, EnvConfig, HeaderPayload, ResultExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Backend reading `{cfg_dir}/{name}.yml` files
///
/// When an environment designator is configured, `{cfg_dir}/{name}.{env}.yml`
/// is read as well and overrides the base file. Headers are whatever the
/// caller forwarded through the [`CallContext`].
#[derive(Debug, Clone)]
pub struct FsBackend {
    cfg_names: Vec<String>,
    env: EnvConfig,
}

impl FsBackend {
    /// Backend for `cfg_names`, with settings read from the environment
    ///
    /// See [`FsBackend::with_env_config`] for how `RESTCFG_PROXY` is applied.
    pub fn new<I, S>(cfg_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_env_config(cfg_names, EnvConfig::from_env())
    }

    /// Backend for `cfg_names` with explicit settings
    ///
    /// A configured proxy is installed process-wide right away through
    /// [`apply_proxy`], with the same environment access precondition.
    pub fn with_env_config<I, S>(cfg_names: I, env: EnvConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(ref proxy) = env.proxy {
            apply_proxy(proxy);
        }
        Self {
            cfg_names: cfg_names.into_iter().map(Into::into).collect(),
            env,
        }
    }

    /// Document names, in merge order
    #[must_use]
    pub fn cfg_names(&self) -> &[String] {
        &self.cfg_names
    }

    /// Settings in effect
    #[must_use]
    pub fn env_config(&self) -> &EnvConfig {
        &self.env
    }

    /// Base document path and, when an environment is set, its override path
    #[must_use]
    pub fn document_paths(&self, name: &str) -> (PathBuf, Option<PathBuf>) {
        let dir = &self.env.cfg_dir;
        let base = dir.join(format!("{name}.yml"));
        let overlay = self
            .env
            .environment
            .as_ref()
            .map(|env| dir.join(format!("{name}.{env}.yml")));
        (base, overlay)
    }

    async fn load_one(&self, name: &str) -> Option<ConfigTree> {
        let (base, overlay) = self.document_paths(name);
        let mut tree = read_document(&base).await;
        if let Some(overlay) = overlay {
            if let Some(env_tree) = read_document(&overlay).await {
                tree.get_or_insert_with(ConfigTree::new).merge(env_tree);
            }
        }
        tree
    }
}

/// Route all outbound HTTP through `proxy` by setting `http_proxy` and
/// `https_proxy` for the whole process. Blank values are ignored.
///
/// Returns whether the process now routes through `proxy`. Variables that
/// already hold `proxy` are left alone, so a binary can install the proxy
/// before starting its runtime and later construct backends with the same
/// setting without touching the environment again.
///
/// # Environment access
///
/// Writing the environment races with any other thread reading it (libc
/// `getenv` included). Call this, or construct an [`FsBackend`] with a new
/// proxy, only while no other thread may read the environment.
pub fn apply_proxy(proxy: &str) -> bool {
    let proxy = proxy.trim();
    if proxy.is_empty() {
        return false;
    }
    if proxy_installed(proxy) {
        debug!(proxy = %proxy, "Proxy already installed");
        return true;
    }
    // SAFETY: sound only while no other thread reads or writes the
    // environment. Documented as a precondition of this function.
    unsafe {
        std::env::set_var("http_proxy", proxy);
        std::env::set_var("https_proxy", proxy);
    }
    info!(proxy = %proxy, "Installed process-wide HTTP proxy");
    true
}

fn proxy_installed(proxy: &str) -> bool {
    ["http_proxy", "https_proxy"]
        .iter()
        .all(|var| std::env::var(var).is_ok_and(|v| v == proxy))
}

async fn read_document(path: &Path) -> Option<ConfigTree> {
    match parse_document(path).await {
        Ok(tree) => Some(tree),
        Err(e) if e.is_not_found() => {
            debug!(path = %path.display(), "Config document not present");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping config document");
            None
        }
    }
}

async fn parse_document(path: &Path) -> restcfg_core::Result<ConfigTree> {
    let text = tokio::fs::read_to_string(path)
        .await
        .context(format!("Reading {}", path.display()))?;
    ConfigTree::from_yaml_str(&text).context(format!("Parsing {}", path.display()))
}

#[async_trait]
impl ConfigBackend for FsBackend {
    async fn load(&self) -> LoadedConfig {
        let documents = join_all(self.cfg_names.iter().map(|name| self.load_one(name))).await;
        LoadedConfig::from_tree(merge_loaded(documents))
    }

    fn headers(&self, ctx: &CallContext) -> HeaderPayload {
        HeaderPayload::Wrapped {
            headers: ctx.forward_headers(),
        }
    }
}
