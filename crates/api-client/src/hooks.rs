//! Request lifecycle hooks
//!
//! A [`Hooks`] value is composed once and handed to clients as an
//! `Arc<Hooks>`. Every client built with the same `Arc` runs the same hooks,
//! which is how "intercept every request on every client" is expressed.
//!
//! # Example
//!
//! ```rust
//! use restcfg_client::hooks::Hooks;
//!
//! let hooks = Hooks::new()
//!     .on_start(|mut req| {
//!         req.headers.insert("X-Trace", "on");
//!         req
//!     })
//!     // treat 404 as "no data" instead of an error
//!     .on_response_error(|err| err.status() != Some(404));
//! # let _ = hooks;
//! ```

use crate::error::ApiError;
use crate::request::{RawResponse, RequestDescriptor};
use std::fmt;
use std::sync::Arc;

/// Rewrites an outgoing request
pub type RequestHook = Arc<dyn Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync>;

/// Observes or rewrites a received response
pub type ResponseHook = Arc<dyn Fn(RawResponse) -> RawResponse + Send + Sync>;

/// Classifies an HTTP error; `false` swallows it
pub type ErrorClassifier = Arc<dyn Fn(&ApiError) -> bool + Send + Sync>;

/// Hooks shared by every client constructed with them
#[derive(Clone, Default)]
pub struct Hooks {
    on_start: Option<RequestHook>,
    on_stop: Option<ResponseHook>,
    on_response_error: Option<ErrorClassifier>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .field("on_response_error", &self.on_response_error.is_some())
            .finish()
    }
}

impl Hooks {
    /// No hooks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run before every request; the returned request is the one sent
    #[must_use]
    pub fn on_start(
        mut self,
        hook: impl Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync + 'static,
    ) -> Self {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Run on every response, successful or not
    #[must_use]
    pub fn on_stop(mut self, hook: impl Fn(RawResponse) -> RawResponse + Send + Sync + 'static) -> Self {
        self.on_stop = Some(Arc::new(hook));
        self
    }

    /// Decide whether an HTTP error propagates (`true`) or becomes `None`
    #[must_use]
    pub fn on_response_error(
        mut self,
        classifier: impl Fn(&ApiError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.on_response_error = Some(Arc::new(classifier));
        self
    }

    pub(crate) fn start(&self, request: RequestDescriptor) -> RequestDescriptor {
        match &self.on_start {
            Some(hook) => hook(request),
            None => request,
        }
    }

    pub(crate) fn stop(&self, response: RawResponse) -> RawResponse {
        match &self.on_stop {
            Some(hook) => hook(response),
            None => response,
        }
    }

    /// Without a classifier every HTTP error propagates
    pub(crate) fn should_propagate(&self, error: &ApiError) -> bool {
        self.on_response_error
            .as_ref()
            .is_none_or(|classify| classify(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restcfg_core::HttpMethod;

    #[test]
    fn test_empty_hooks_pass_through() {
        let hooks = Hooks::new();
        let request = RequestDescriptor::new(HttpMethod::Get, "http://x/");
        assert_eq!(hooks.start(request.clone()), request);
        assert!(hooks.should_propagate(&ApiError::transport("x")));
    }

    #[test]
    fn test_on_start_rewrites_request() {
        let hooks = Hooks::new().on_start(|mut req| {
            req.url.push_str("?rewritten");
            req
        });
        let request = hooks.start(RequestDescriptor::new(HttpMethod::Get, "http://x/"));
        assert_eq!(request.url, "http://x/?rewritten");
    }

    #[test]
    fn test_classifier_controls_propagation() {
        let hooks = Hooks::new().on_response_error(|_| false);
        assert!(!hooks.should_propagate(&ApiError::transport("x")));
    }

    #[test]
    fn test_debug_shows_presence() {
        let hooks = Hooks::new().on_stop(|r| r);
        let debug = format!("{hooks:?}");
        assert!(debug.contains("on_stop: true"));
        assert!(debug.contains("on_start: false"));
    }
}
