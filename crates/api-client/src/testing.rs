//! Test doubles shared by the unit tests

use crate::error::{ApiError, ApiResult};
use crate::request::{RawResponse, RequestDescriptor};
use crate::transport::Transport;
use async_trait::async_trait;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&RequestDescriptor) -> ApiResult<RawResponse> + Send + Sync>;

/// Records every request and answers through a closure
pub(crate) struct FakeTransport {
    responder: Responder,
    sent: Mutex<Vec<RequestDescriptor>>,
}

impl FakeTransport {
    pub(crate) fn new(
        responder: impl Fn(&RequestDescriptor) -> ApiResult<RawResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Always answer `status` with `body`
    pub(crate) fn replying(status: u16, body: &str) -> Self {
        let body = body.to_string();
        Self::new(move |_| Ok(response(status, &body)))
    }

    /// Never produce a response
    pub(crate) fn unreachable() -> Self {
        Self::new(|_| Err(ApiError::transport("connection refused")))
    }

    pub(crate) fn sent(&self) -> Vec<RequestDescriptor> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn last(&self) -> RequestDescriptor {
        self.sent().pop().expect("no request was sent")
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: RequestDescriptor) -> ApiResult<RawResponse> {
        let result = (self.responder)(&request);
        self.sent.lock().unwrap().push(request);
        result
    }
}

pub(crate) fn response(status: u16, body: &str) -> RawResponse {
    let status_text = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string();
    RawResponse {
        status,
        status_text,
        headers: vec![("content-type".into(), "application/json".into())],
        body: body.to_string(),
    }
}
