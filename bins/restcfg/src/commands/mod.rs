//! Command implementations

pub mod call;
pub mod dump;
pub mod endpoint;

use crate::SourceArgs;
use anyhow::{Context, Result, bail};
use restcfg_client::hooks::Hooks;
use restcfg_client::{
    ClientConfig, ConfigBackend, FsBackend, HeaderProvider, HttpBackend, HttpBackendOptions,
    RestClient, RestClientBuilder,
};
use restcfg_core::template::Params;
use restcfg_core::{EnvConfig, HeaderSet};
use serde_json::Value;
use std::sync::Arc;

/// Build a client for the selected document source
pub fn build_client(source: &SourceArgs, hooks: Hooks) -> Result<RestClient> {
    let backend: Arc<dyn ConfigBackend> = match source.base_url {
        Some(ref base_url) => {
            let mut options = HttpBackendOptions::new(base_url.clone(), source.names.iter().cloned());
            if let Some(ref url) = source.common_param_url {
                options = options.with_common_param_url(url.clone());
            }
            Arc::new(HttpBackend::new(options, HeaderProvider::default())?)
        }
        None => Arc::new(FsBackend::with_env_config(
            source.names.iter().cloned(),
            env_config(source),
        )),
    };

    let client = RestClientBuilder::new(backend)
        .common_param(parse_pairs(&source.common)?)
        .hooks(Arc::new(hooks))
        .config(ClientConfig::from_env()?)
        .build()?;
    Ok(client)
}

fn env_config(source: &SourceArgs) -> EnvConfig {
    let mut config = EnvConfig::from_env();
    if let Some(ref dir) = source.cfg_dir {
        config = config.with_cfg_dir(dir);
    }
    if let Some(ref env) = source.environment {
        config = config.with_environment(env.clone());
    }
    if let Some(ref proxy) = source.proxy {
        config = config.with_proxy(proxy.clone());
    }
    config
}

/// Parse `KEY=VALUE` arguments; values that parse as JSON keep their type
pub fn parse_pairs(pairs: &[String]) -> Result<Params> {
    pairs
        .iter()
        .map(|pair| {
            let Some((key, value)) = pair.split_once('=') else {
                bail!("expected KEY=VALUE, got `{pair}`");
            };
            let key = key.trim();
            if key.is_empty() {
                bail!("empty key in `{pair}`");
            }
            let value =
                serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            Ok((key.to_string(), value))
        })
        .collect()
}

/// Parse `NAME: VALUE` header arguments
pub fn parse_headers(headers: &[String]) -> Result<HeaderSet> {
    headers
        .iter()
        .map(|header| {
            let (name, value) = header
                .split_once(':')
                .with_context(|| format!("expected NAME:VALUE, got `{header}`"))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// `None` when no arguments were given, so optional maps stay absent
pub fn optional(params: Params) -> Option<Params> {
    (!params.is_empty()).then_some(params)
}
