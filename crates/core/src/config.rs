//! Environment-driven settings shared by the backends
//!
//! Reads the following environment variables:
//! - `RESTCFG_ENV`: environment designator selecting `{name}.{ENV}.yml` overrides
//! - `RESTCFG_CFG_DIR`: directory holding API documents (default `./cfg`)
//! - `RESTCFG_PROXY`: proxy applied process-wide by the filesystem backend

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default directory for API documents
pub const DEFAULT_CFG_DIR: &str = "./cfg";

/// Environment settings for loading API documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Environment designator (`development`, `production`, ...)
    pub environment: Option<String>,
    /// Directory holding `{name}.yml` documents
    pub cfg_dir: PathBuf,
    /// Optional outbound proxy
    pub proxy: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            environment: None,
            cfg_dir: PathBuf::from(DEFAULT_CFG_DIR),
            proxy: None,
        }
    }
}

impl EnvConfig {
    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self {
            environment: non_empty_var("RESTCFG_ENV"),
            cfg_dir: non_empty_var("RESTCFG_CFG_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_CFG_DIR), PathBuf::from),
            proxy: non_empty_var("RESTCFG_PROXY"),
        }
    }

    /// Builder-style method to set the environment designator
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Builder-style method to set the document directory
    #[must_use]
    pub fn with_cfg_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cfg_dir = dir.into();
        self
    }

    /// Builder-style method to set the proxy
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
