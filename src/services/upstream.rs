//! Upstream client for the Xueqiu, Danjuan and Eastmoney APIs
//!
//! The `Upstream` trait is the seam the dispatcher calls through;
//! `XueqiuClient` is the reqwest-backed implementation. Every response is run
//! through `classify_response`, which decides whether a failure is the
//! credential's fault.

use crate::services::credential_pool::{FailureClass, TokenCredential};
use crate::utils::truncate_with_suffix;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

pub const STOCK_API_BASE: &str = "https://stock.xueqiu.com";
pub const XUEQIU_BASE: &str = "https://xueqiu.com";
pub const DANJUAN_BASE: &str = "https://danjuanfunds.com";
pub const EASTMONEY_BASE: &str = "https://datacenter-web.eastmoney.com";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Xueqiu business error code for an expired or invalid token
pub const TOKEN_EXPIRED_CODE: i64 = 400016;

/// Longest upstream body excerpt kept in error messages
const ERROR_BODY_CHARS: usize = 200;

// ============================================================================
// Request Types
// ============================================================================

/// Upstream host family
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Host {
    /// stock.xueqiu.com: quotes, finance, F10, portfolio
    Stock,
    /// xueqiu.com: search and cubes
    Xueqiu,
    /// danjuanfunds.com: funds and index valuation
    Danjuan,
    /// datacenter-web.eastmoney.com: convertible bond listings
    Eastmoney,
}

/// Whether an endpoint needs a pooled credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Token,
    Anonymous,
}

/// One fully-shaped upstream call
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub host: Host,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub auth: AuthMode,
}

impl UpstreamRequest {
    pub fn new(host: Host, path: impl Into<String>, auth: AuthMode) -> Self {
        Self {
            host,
            path: path.into(),
            query: Vec::new(),
            auth,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn requires_credential(&self) -> bool {
        self.auth == AuthMode::Token
    }
}

impl fmt::Display for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{}", self.host, self.path)
    }
}

/// Base URLs per host, overridable for testing and proxies
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamUrls {
    pub stock: String,
    pub xueqiu: String,
    pub danjuan: String,
    pub eastmoney: String,
}

impl Default for UpstreamUrls {
    fn default() -> Self {
        Self {
            stock: STOCK_API_BASE.to_string(),
            xueqiu: XUEQIU_BASE.to_string(),
            danjuan: DANJUAN_BASE.to_string(),
            eastmoney: EASTMONEY_BASE.to_string(),
        }
    }
}

impl UpstreamUrls {
    pub fn base(&self, host: Host) -> &str {
        let base = match host {
            Host::Stock => &self.stock,
            Host::Xueqiu => &self.xueqiu,
            Host::Danjuan => &self.danjuan,
            Host::Eastmoney => &self.eastmoney,
        };
        base.trim_end_matches('/')
    }

    pub fn url_for(&self, request: &UpstreamRequest) -> String {
        format!("{}{}", self.base(request.host), request.path)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors from a single upstream attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    #[error("authentication rejected (status {status}): {message}")]
    AuthRejected { status: u16, message: String },

    #[error("rate limited (status {status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("request rejected (status {status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("upstream unavailable: {0}")]
    Transient(String),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),
}

impl UpstreamError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::AuthRejected { .. } => FailureClass::AuthRejected,
            Self::RateLimited { .. } => FailureClass::RateLimited,
            Self::InvalidRequest { .. } => FailureClass::InvalidRequest,
            Self::Transient(_) | Self::Timeout(_) => FailureClass::Transient,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == FailureClass::Transient
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Transient(format!("request timed out: {}", err))
        } else {
            UpstreamError::Transient(err.to_string())
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Turn a raw upstream response into a payload or a classified error
///
/// | Observation                                   | Class          |
/// |-----------------------------------------------|----------------|
/// | 401, 403, or `error_code` 400016              | AuthRejected   |
/// | 429                                           | RateLimited    |
/// | 5xx, or a 2xx body that is not JSON           | Transient      |
/// | other 4xx, or non-zero `error_code`/`result_code` | InvalidRequest |
pub fn classify_response(status: u16, body: &str) -> Result<Value, UpstreamError> {
    let excerpt = || truncate_with_suffix(body.trim(), ERROR_BODY_CHARS, "...");

    match status {
        401 | 403 => {
            return Err(UpstreamError::AuthRejected {
                status,
                message: excerpt(),
            })
        }
        429 => {
            return Err(UpstreamError::RateLimited {
                status,
                message: excerpt(),
            })
        }
        500..=599 => {
            return Err(UpstreamError::Transient(format!(
                "status {}: {}",
                status,
                excerpt()
            )))
        }
        _ => {}
    }

    let success = (200..300).contains(&status);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) if success => {
            return Err(UpstreamError::Transient(format!("malformed payload: {}", e)));
        }
        Err(_) => {
            return Err(UpstreamError::InvalidRequest {
                status,
                message: excerpt(),
            });
        }
    };

    if let Some(code) = code_field(&value, "error_code").filter(|code| *code != 0) {
        let message = value
            .get("error_description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(excerpt);
        return Err(if code == TOKEN_EXPIRED_CODE {
            UpstreamError::AuthRejected { status, message }
        } else {
            UpstreamError::InvalidRequest { status, message }
        });
    }

    if !success {
        return Err(UpstreamError::InvalidRequest {
            status,
            message: excerpt(),
        });
    }

    if let Some(code) = code_field(&value, "result_code").filter(|code| *code != 0) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("result_code {}", code));
        return Err(UpstreamError::InvalidRequest { status, message });
    }

    Ok(value)
}

/// Read a numeric code that may arrive as a number or a string
fn code_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Upstream Trait
// ============================================================================

/// A remote data source reachable with an optional credential
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(
        &self,
        request: &UpstreamRequest,
        credential: Option<&TokenCredential>,
    ) -> Result<Value, UpstreamError>;
}

// ============================================================================
// Xueqiu Client
// ============================================================================

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub urls: UpstreamUrls,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            urls: UpstreamUrls::default(),
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// reqwest-backed upstream client
#[derive(Clone)]
pub struct XueqiuClient {
    client: Client,
    urls: UpstreamUrls,
}

impl XueqiuClient {
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("zh-CN,zh;q=0.9"),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            urls: config.urls,
        })
    }

    pub fn urls(&self) -> &UpstreamUrls {
        &self.urls
    }
}

#[async_trait]
impl Upstream for XueqiuClient {
    async fn fetch(
        &self,
        request: &UpstreamRequest,
        credential: Option<&TokenCredential>,
    ) -> Result<Value, UpstreamError> {
        let url = self.urls.url_for(request);

        let mut builder = self.client.get(&url).query(&request.query);
        if matches!(request.host, Host::Stock | Host::Xueqiu) {
            builder = builder
                .header(header::ORIGIN, XUEQIU_BASE)
                .header(header::REFERER, format!("{}/", XUEQIU_BASE));
        }
        if let Some(credential) = credential {
            builder = builder.header(header::COOKIE, credential.cookie_value());
        }

        tracing::debug!(
            url = %url,
            authenticated = credential.is_some(),
            "Calling upstream"
        );

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        classify_response(status, &body)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_success() {
        let value = classify_response(200, r#"{"data":{"symbol":"SZ000002"},"error_code":0}"#)
            .unwrap();
        assert_eq!(value["data"]["symbol"], "SZ000002");
    }

    #[test]
    fn test_classify_auth_statuses() {
        for status in [401, 403] {
            let err = classify_response(status, "denied").unwrap_err();
            assert_eq!(err.class(), FailureClass::AuthRejected);
        }
    }

    #[test]
    fn test_classify_expired_token_code() {
        let body = json!({
            "error_code": "400016",
            "error_description": "遇到错误，请刷新页面或者重新登录帐号后再试"
        })
        .to_string();

        for status in [200, 400] {
            let err = classify_response(status, &body).unwrap_err();
            assert_eq!(err.class(), FailureClass::AuthRejected);
            assert!(err.to_string().contains("重新登录"));
        }
    }

    #[test]
    fn test_classify_rate_limited() {
        let err = classify_response(429, "slow down").unwrap_err();
        assert_eq!(err, UpstreamError::RateLimited { status: 429, message: "slow down".into() });
    }

    #[test]
    fn test_classify_transient() {
        assert!(classify_response(502, "bad gateway").unwrap_err().is_transient());
        assert!(classify_response(200, "<html>oops</html>").unwrap_err().is_transient());
    }

    #[test]
    fn test_classify_invalid_request() {
        let err = classify_response(400, r#"{"error_code":400001,"error_description":"bad symbol"}"#)
            .unwrap_err();
        assert_eq!(err.class(), FailureClass::InvalidRequest);

        let err = classify_response(404, "not found").unwrap_err();
        assert_eq!(err.class(), FailureClass::InvalidRequest);

        let err = classify_response(200, r#"{"result_code":600001,"message":"no fund"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            UpstreamError::InvalidRequest { status: 200, message: "no fund".into() }
        );
    }

    #[test]
    fn test_classify_truncates_long_bodies() {
        let body = "x".repeat(1000);
        match classify_response(429, &body).unwrap_err() {
            UpstreamError::RateLimited { message, .. } => {
                assert_eq!(message.chars().count(), ERROR_BODY_CHARS + 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_url_for_request() {
        let urls = UpstreamUrls {
            stock: "http://localhost:9000/".to_string(),
            ..Default::default()
        };
        let request = UpstreamRequest::new(Host::Stock, "/v5/stock/quote.json", AuthMode::Token)
            .with_query("symbol", "SH600000");

        assert_eq!(urls.url_for(&request), "http://localhost:9000/v5/stock/quote.json");
        assert!(request.requires_credential());
        assert_eq!(
            urls.url_for(&UpstreamRequest::new(Host::Danjuan, "/djapi/fund/110011", AuthMode::Anonymous)),
            "https://danjuanfunds.com/djapi/fund/110011"
        );
        assert_eq!(
            urls.url_for(&UpstreamRequest::new(Host::Eastmoney, "/api/data/v1/get", AuthMode::Anonymous)),
            "https://datacenter-web.eastmoney.com/api/data/v1/get"
        );
    }

    #[test]
    fn test_client_builds() {
        let client = XueqiuClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.urls().base(Host::Xueqiu), "https://xueqiu.com");
    }
}
