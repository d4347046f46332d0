//! Request assembly and execution
//!
//! The executor owns the part of a call that happens after resolution:
//!
//! 1. merge backend and call headers (call headers win)
//! 2. run `on_start`, then the client's own request hook
//! 3. send through the transport
//! 4. run `on_stop` on whatever came back
//! 5. classify non-2xx responses through `on_response_error`

use crate::error::{ApiError, ApiResult};
use crate::hooks::{Hooks, RequestHook};
use crate::request::{RawResponse, RequestDescriptor, query_pairs};
use crate::resolver::ResolvedEndpoint;
use crate::transport::Transport;
use restcfg_core::headers::merge_headers;
use restcfg_core::template::Params;
use restcfg_core::{HeaderPayload, HeaderSet};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Request correlation ID header
pub const X_REQUEST_ID: &str = "X-Request-ID";

/// Sends assembled requests and classifies their outcome
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    hooks: Arc<Hooks>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Create an executor
    pub fn new(transport: Arc<dyn Transport>, hooks: Arc<Hooks>) -> Self {
        Self { transport, hooks }
    }

    /// Hooks applied to every request
    #[must_use]
    pub fn hooks(&self) -> &Arc<Hooks> {
        &self.hooks
    }

    /// Build the outgoing request for a resolved endpoint
    ///
    /// Header precedence, lowest first: the correlation ID, backend headers,
    /// call headers.
    #[must_use]
    pub fn assemble(
        endpoint: ResolvedEndpoint,
        query: Option<&Params>,
        body: Option<Value>,
        backend_headers: HeaderPayload,
        call_headers: Option<HeaderPayload>,
        request_id: &str,
    ) -> RequestDescriptor {
        let mut headers = HeaderSet::new();
        headers.insert(X_REQUEST_ID, request_id);
        headers.merge(merge_headers(backend_headers, call_headers));

        RequestDescriptor {
            method: endpoint.method,
            url: endpoint.url,
            query: query.map(query_pairs).unwrap_or_default(),
            body,
            headers,
        }
    }

    /// Send `request`
    ///
    /// Returns the parsed body for 2xx responses and `None` when an HTTP
    /// error was swallowed by the classifier. Transport failures are
    /// returned as they are.
    pub async fn execute(
        &self,
        request: RequestDescriptor,
        request_hook: Option<RequestHook>,
    ) -> ApiResult<Option<Value>> {
        let request = self.hooks.start(request);
        let request = match request_hook {
            Some(hook) => hook(request),
            None => request,
        };

        let request_id = request.headers.get(X_REQUEST_ID).unwrap_or_default().to_string();
        let method = request.method;
        let url = request.url.clone();
        debug!(request_id = %request_id, method = %method, url = %url, "Sending request");

        let start = Instant::now();
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(request_id = %request_id, url = %url, error = %e, "Request failed without a response");
                return Err(e);
            }
        };
        let response = self.hooks.stop(response);

        debug!(
            request_id = %request_id,
            status = response.status,
            elapsed_ms = start.elapsed().as_millis(),
            "Request completed"
        );

        self.classify(&request_id, response)
    }

    fn classify(&self, request_id: &str, response: RawResponse) -> ApiResult<Option<Value>> {
        if response.is_success() {
            return Ok(Some(response.json()));
        }

        let error = ApiError::http_status(response);
        if self.hooks.should_propagate(&error) {
            warn!(request_id = %request_id, error = %error, "Request returned an error status");
            Err(error)
        } else {
            debug!(request_id = %request_id, error = %error, "Error status suppressed by classifier");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, response};
    use restcfg_core::HttpMethod;
    use restcfg_core::template::params;
    use serde_json::json;
    use std::sync::Mutex;

    fn endpoint(url: &str) -> ResolvedEndpoint {
        ResolvedEndpoint {
            method: HttpMethod::Get,
            url: url.into(),
        }
    }

    fn executor(transport: Arc<FakeTransport>, hooks: Hooks) -> RequestExecutor {
        RequestExecutor::new(transport, Arc::new(hooks))
    }

    #[test]
    fn test_assemble_merges_headers_call_wins() {
        let backend = HeaderPayload::Wrapped {
            headers: [("Authorization", "Bearer backend"), ("X-Tenant", "a")].into_iter().collect(),
        };
        let call = HeaderPayload::Flat([("authorization", "Bearer call")].into_iter().collect());

        let request = RequestExecutor::assemble(
            endpoint("http://x/1"),
            Some(&params([("format", "json")])),
            Some(json!({"k": 1})),
            backend,
            Some(call),
            "req-1",
        );

        assert_eq!(request.headers.get("Authorization"), Some("Bearer call"));
        assert_eq!(request.headers.get("x-tenant"), Some("a"));
        assert_eq!(request.headers.get(X_REQUEST_ID), Some("req-1"));
        assert_eq!(request.query, vec![("format".to_string(), "json".to_string())]);
        assert_eq!(request.body, Some(json!({"k": 1})));
    }

    #[test]
    fn test_assemble_unwraps_call_payload() {
        let call = HeaderPayload::Wrapped {
            headers: [("X-Call", "1")].into_iter().collect(),
        };
        let request = RequestExecutor::assemble(
            endpoint("http://x"),
            None,
            None,
            HeaderPayload::default(),
            Some(call),
            "req",
        );
        assert_eq!(request.headers.get("x-call"), Some("1"));
        assert!(request.headers.get("headers").is_none());
    }

    #[tokio::test]
    async fn test_success_returns_parsed_body() {
        let transport = Arc::new(FakeTransport::replying(200, r#"{"ip":"1.2.3.4"}"#));
        let result = executor(transport, Hooks::new())
            .execute(RequestDescriptor::new(HttpMethod::Get, "http://x"), None)
            .await
            .unwrap();
        assert_eq!(result, Some(json!({"ip": "1.2.3.4"})));
    }

    #[tokio::test]
    async fn test_error_status_propagates_by_default() {
        let transport = Arc::new(FakeTransport::replying(500, "boom"));
        let err = executor(transport, Hooks::new())
            .execute(RequestDescriptor::new(HttpMethod::Get, "http://x"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.response().unwrap().body, "boom");
    }

    #[tokio::test]
    async fn test_classifier_swallows_to_none() {
        let transport = Arc::new(FakeTransport::replying(404, ""));
        let hooks = Hooks::new().on_response_error(|err| err.status() != Some(404));
        let result = executor(transport, hooks)
            .execute(RequestDescriptor::new(HttpMethod::Get, "http://x"), None)
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_classified() {
        let classified = Arc::new(Mutex::new(0));
        let seen = Arc::clone(&classified);
        let hooks = Hooks::new().on_response_error(move |_| {
            *seen.lock().unwrap() += 1;
            false
        });

        let err = executor(Arc::new(FakeTransport::unreachable()), hooks)
            .execute(RequestDescriptor::new(HttpMethod::Get, "http://x"), None)
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(*classified.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_hook_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (Arc::clone(&order), Arc::clone(&order), Arc::clone(&order));
        let hooks = Hooks::new()
            .on_start(move |mut req| {
                a.lock().unwrap().push("on_start");
                req.headers.insert("X-Stage", "start");
                req
            })
            .on_stop(move |res| {
                b.lock().unwrap().push("on_stop");
                res
            });
        let request_hook: RequestHook = Arc::new(move |mut req| {
            c.lock().unwrap().push("request_hook");
            req.headers.insert("X-Stage", "instance");
            req
        });

        let transport = Arc::new(FakeTransport::replying(200, "{}"));
        executor(Arc::clone(&transport), hooks)
            .execute(RequestDescriptor::new(HttpMethod::Get, "http://x"), Some(request_hook))
            .await
            .unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["on_start", "request_hook", "on_stop"]);
        assert_eq!(transport.last().headers.get("x-stage"), Some("instance"));
    }

    #[tokio::test]
    async fn test_on_stop_sees_error_responses_and_may_replace_them() {
        let transport = Arc::new(FakeTransport::replying(503, "down"));
        let hooks = Hooks::new().on_stop(|res| {
            if res.status == 503 {
                response(200, r#"{"fallback":true}"#)
            } else {
                res
            }
        });
        let result = executor(transport, hooks)
            .execute(RequestDescriptor::new(HttpMethod::Get, "http://x"), None)
            .await
            .unwrap();
        assert_eq!(result, Some(json!({"fallback": true})));
    }

    #[tokio::test]
    async fn test_on_start_replacing_request() {
        let transport = Arc::new(FakeTransport::replying(200, "null"));
        let hooks = Hooks::new().on_start(|_| RequestDescriptor::new(HttpMethod::Delete, "http://other"));
        executor(Arc::clone(&transport), hooks)
            .execute(RequestDescriptor::new(HttpMethod::Get, "http://x"), None)
            .await
            .unwrap();

        let sent = transport.last();
        assert_eq!(sent.method, HttpMethod::Delete);
        assert_eq!(sent.url, "http://other");
    }
}
