//! Configuration-driven REST client
//!
//! API endpoints are declared in YAML documents instead of code. A client
//! resolves a logical name such as `example.ipify1` to a method and URL
//! template, renders it, merges headers, and sends the request.
//!
//! # Features
//!
//! - **Pluggable backends**: local files, remote documents, or the remote
//!   layout served from disk
//! - **Request coalescing**: concurrent clients share one fetch per remote
//!   document, cached for a short TTL
//! - **Hooks**: rewrite requests, observe responses, and decide which HTTP
//!   errors are errors
//! - **Call contexts**: forward headers along a chain of nested calls
//! - **Request correlation**: every request carries an `X-Request-ID`
//!
//! # Example
//!
//! ```rust,no_run
//! use restcfg_client::{FsBackend, RestClient};
//! use restcfg_core::template::{params, Params};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ./cfg/RestClient.yml (and ./cfg/RestClient.$RESTCFG_ENV.yml)
//!     let client = RestClient::new(FsBackend::new(["RestClient"]), Params::new())?;
//!
//!     let ip = client
//!         .api("example.ipify1")
//!         .url_param(params([("format", "json")]))
//!         .call()
//!         .await?;
//!     println!("{ip:?}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod call_chain;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod request;
pub mod resolver;
pub mod transport;

#[cfg(test)]
mod testing;

pub use backend::{
    ConfigBackend, FsBackend, HeaderProvider, HttpBackend, HttpBackendOptions, LoadedConfig,
    SsrBackend, SsrBackendOptions, apply_proxy,
};
pub use call_chain::CallChain;
pub use client::{RestClient, RestClientBuilder};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use hooks::Hooks;
pub use request::{RawResponse, RequestDescriptor};
pub use resolver::{ApiEndpoint, EndpointResolver, ResolvedEndpoint};
pub use transport::{ReqwestTransport, Transport};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::{ConfigBackend, FsBackend, HttpBackend, HttpBackendOptions, SsrBackend};
    pub use crate::client::RestClient;
    pub use crate::config::ClientConfig;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::hooks::Hooks;
    pub use restcfg_core::prelude::*;
}
