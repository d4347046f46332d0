//! Core building blocks for configuration-driven REST clients
//!
//! This crate holds everything that does not need an HTTP stack:
//!
//! - **Config tree**: merged YAML API documents, addressable by dot path
//! - **Endpoint leaves**: bare URL templates or `{method, endPoint}` records
//! - **Templates**: `{{variable}}` substitution without escaping
//! - **Coalescing cache**: single-flight, TTL-bound fetch cache for remote documents
//! - **State providers**: late-bound header state for backends
//! - **Call context**: headers forwarded along one logical call chain
//! - **Error handling**: errors with codes, context, and recovery suggestions
//!
//! # Example
//!
//! ```rust
//! use restcfg_core::{template, ConfigTree, HttpMethod};
//!
//! let tree = ConfigTree::from_yaml_str("a:\n  b: http://x/{{id}}\n").unwrap();
//! let def = tree.endpoint("a.b").unwrap();
//! let url = template::render(def.template(), &template::params([("id", 42)]));
//!
//! assert_eq!(def.method(), HttpMethod::Get);
//! assert_eq!(url, "http://x/42");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod headers;
pub mod state;
pub mod template;
pub mod tree;

pub use cache::{CacheConfig, CacheStore, RequestCoalescingCache, SessionStore};
pub use config::EnvConfig;
pub use context::CallContext;
pub use endpoint::{EndpointDef, EndpointSpec, HttpMethod};
pub use error::{Error, ErrorCode, Result, ResultExt};
pub use headers::{HeaderPayload, HeaderSet};
pub use state::StateProvider;
pub use template::Params;
pub use tree::ConfigTree;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{CacheConfig, CacheStore, Clock, RequestCoalescingCache, SessionStore};
    pub use crate::context::CallContext;
    pub use crate::endpoint::{EndpointDef, HttpMethod};
    pub use crate::error::{Error, ErrorCode, Result, ResultExt};
    pub use crate::headers::{HeaderPayload, HeaderSet};
    pub use crate::state::StateProvider;
    pub use crate::template::{params, Params};
    pub use crate::tree::ConfigTree;
}
