//! Tool invocation
//!
//! Resolves a tool name against the catalog, validates its arguments and
//! hands the resulting request to the dispatcher.

use crate::services::catalog::{self, EndpointDef, CATALOG};
use crate::services::dispatcher::{DispatchError, Dispatcher};
use crate::services::transform::convert_timestamps;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from invoking a tool
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Catalog-backed tool runner
#[derive(Clone)]
pub struct ToolService {
    dispatcher: Dispatcher,
    convert_timestamps: bool,
}

impl ToolService {
    pub fn new(dispatcher: Dispatcher, convert_timestamps: bool) -> Self {
        Self {
            dispatcher,
            convert_timestamps,
        }
    }

    /// All tools, in catalog order
    pub fn list(&self) -> &'static [EndpointDef] {
        CATALOG
    }

    /// Run a tool to completion
    pub async fn invoke(&self, name: &str, args: &Map<String, Value>) -> Result<Value, ToolError> {
        self.invoke_with_cancel(name, args, &CancellationToken::new())
            .await
    }

    /// Run a tool, giving up when `cancel` fires
    pub async fn invoke_with_cancel(
        &self,
        name: &str,
        args: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolError> {
        let def = catalog::find(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let request = def
            .build_request(args)
            .map_err(|e| DispatchError::InvalidParameters(e.to_string()))?;

        tracing::debug!(tool = name, endpoint = %request, "Invoking tool");

        let mut value = self.dispatcher.call_with_cancel(&request, cancel).await?;
        if self.convert_timestamps {
            convert_timestamps(&mut value);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::credential_pool::{CredentialPool, PoolConfig, TokenCredential};
    use crate::services::dispatcher::DispatchConfig;
    use crate::services::upstream::{Upstream, UpstreamError, UpstreamRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct Recording {
        requests: Mutex<Vec<(UpstreamRequest, bool)>>,
        response: Value,
    }

    #[async_trait]
    impl Upstream for Recording {
        async fn fetch(
            &self,
            request: &UpstreamRequest,
            credential: Option<&TokenCredential>,
        ) -> Result<Value, UpstreamError> {
            self.requests
                .lock()
                .unwrap()
                .push((request.clone(), credential.is_some()));
            Ok(self.response.clone())
        }
    }

    fn service(response: Value, tokens: &[&str], convert: bool) -> (ToolService, Arc<Recording>) {
        let upstream = Arc::new(Recording {
            requests: Mutex::new(Vec::new()),
            response,
        });
        let pool = Arc::new(CredentialPool::new(
            TokenCredential::from_tokens(tokens.iter().copied()),
            PoolConfig::default(),
        ));
        let dispatcher = Dispatcher::new(upstream.clone(), pool, DispatchConfig::default());
        (ToolService::new(dispatcher, convert), upstream)
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (service, upstream) = service(json!({}), &["A"], true);
        let err = service.invoke("no_such_tool", &Map::new()).await.unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("no_such_tool".to_string()));
        assert!(upstream.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_upstream() {
        let (service, upstream) = service(json!({}), &["A"], true);
        let err = service
            .invoke("quotec", &args(json!({"symbol": "SZ000002"})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Dispatch(DispatchError::InvalidParameters(ref msg)) if msg.contains("symbol")
        ));
        assert!(upstream.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quote_uses_credential_and_converts_times() {
        let (service, upstream) = service(
            json!({"data": {"quote": {"symbol": "SZ000002", "timestamp": 1_700_000_000_000_i64}}}),
            &["A"],
            true,
        );

        let value = service
            .invoke("quote_detail", &args(json!({"stock_code": "SZ000002"})))
            .await
            .unwrap();
        assert_eq!(value["data"]["quote"]["timestamp"], "2023-11-15 06:13:20");

        let requests = upstream.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].1);
    }

    #[tokio::test]
    async fn test_conversion_can_be_disabled() {
        let (service, _) = service(json!({"timestamp": 1_700_000_000_000_i64}), &["A"], false);
        let value = service
            .invoke("quote_detail", &args(json!({"stock_code": "SH600000"})))
            .await
            .unwrap();
        assert_eq!(value["timestamp"], 1_700_000_000_000_i64);
    }

    #[tokio::test]
    async fn test_anonymous_tool_without_tokens() {
        let (service, upstream) = service(json!({"data": []}), &[], true);
        service
            .invoke("quotec", &args(json!({"stock_code": "SZ000002"})))
            .await
            .unwrap();
        assert!(!upstream.requests.lock().unwrap()[0].1);
    }

    #[tokio::test]
    async fn test_token_tool_without_tokens() {
        let (service, _) = service(json!({}), &[], true);
        let err = service
            .invoke("quote_detail", &args(json!({"stock_code": "SZ000002"})))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Dispatch(DispatchError::NoCredentialAvailable));
    }

    #[test]
    fn test_list_matches_catalog() {
        let (service, _) = service(json!({}), &[], true);
        assert_eq!(service.list().len(), CATALOG.len());
    }
}
