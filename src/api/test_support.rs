//! Router test helpers

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::{Settings, Tokens};
use crate::server::state::AppState;
use crate::services::{TokenCredential, Upstream, UpstreamError, UpstreamRequest};

type Reply = dyn Fn(&UpstreamRequest) -> Result<Value, UpstreamError> + Send + Sync;

/// Upstream that answers every request from a closure
pub struct StubUpstream(Box<Reply>);

impl StubUpstream {
    pub fn replying(
        reply: impl Fn(&UpstreamRequest) -> Result<Value, UpstreamError> + Send + Sync + 'static,
    ) -> Self {
        Self(Box::new(reply))
    }
}

#[async_trait::async_trait]
impl Upstream for StubUpstream {
    async fn fetch(
        &self,
        request: &UpstreamRequest,
        _credential: Option<&TokenCredential>,
    ) -> Result<Value, UpstreamError> {
        (self.0)(request)
    }
}

pub fn test_state_with(
    tokens: &[&str],
    reply: impl Fn(&UpstreamRequest) -> Result<Value, UpstreamError> + Send + Sync + 'static,
) -> AppState {
    let settings = Settings {
        tokens: Tokens::new(tokens.iter().map(|t| t.to_string()).collect()),
        ..Settings::default()
    };
    AppState::with_upstream(settings, Arc::new(StubUpstream::replying(reply))).unwrap()
}

pub fn test_state(tokens: &[&str]) -> AppState {
    test_state_with(tokens, |_| Ok(serde_json::json!({"data": {}})))
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

pub async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn get_text(router: Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, bytes) = send(router, request).await;
    (status, String::from_utf8(bytes).unwrap())
}

pub async fn post(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
