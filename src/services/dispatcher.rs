//! Dispatcher for upstream calls
//!
//! Wraps one logical tool call: picks a token from the credential pool,
//! performs the request, reports the outcome back to the pool and rotates to
//! another token when the failure is the token's fault.
//!
//! Retry policy:
//! - credential-attributable failures (auth rejected, rate limited) rotate to
//!   a credential not yet tried by this call, so each one is used at most
//!   once;
//! - transient failures (timeout, 5xx, malformed payload) retry the *same*
//!   credential per `DispatchConfig::transient_retry`, then surface without
//!   penalizing it;
//! - invalid requests surface immediately.

use crate::metrics::GatewayMetrics;
use crate::services::credential_pool::{CredentialPool, FailureOutcome, TokenCredential};
use crate::services::upstream::{Upstream, UpstreamError, UpstreamRequest};
use crate::utils::{retry_with_backoff, with_timeout, RetryConfig, TimeoutError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced to the tool layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("no credential available: all tokens are disabled or none are configured")]
    NoCredentialAvailable,

    #[error("upstream rejected credential {credential}: {message}")]
    UpstreamAuthRejected { credential: String, message: String },

    #[error("upstream rate limited credential {credential}: {message}")]
    UpstreamRateLimited { credential: String, message: String },

    #[error("upstream error: {0}")]
    UpstreamTransient(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("{last} (tried {tried} credentials)")]
    CredentialsExhausted { tried: usize, last: Box<DispatchError> },

    #[error("request cancelled")]
    Cancelled,
}

impl DispatchError {
    fn from_upstream(err: UpstreamError, credential: Option<&str>) -> Self {
        let credential = credential.unwrap_or("anonymous").to_string();
        match err {
            UpstreamError::AuthRejected { .. } => Self::UpstreamAuthRejected {
                credential,
                message: err.to_string(),
            },
            UpstreamError::RateLimited { .. } => Self::UpstreamRateLimited {
                credential,
                message: err.to_string(),
            },
            UpstreamError::InvalidRequest { message, .. } => Self::InvalidParameters(message),
            UpstreamError::Transient(_) | UpstreamError::Timeout(_) => {
                Self::UpstreamTransient(err.to_string())
            }
        }
    }

    /// The innermost error, looking through `CredentialsExhausted`
    pub fn root(&self) -> &DispatchError {
        match self {
            Self::CredentialsExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// Whether the caller may reasonably retry the same call later
    pub fn is_retryable_later(&self) -> bool {
        match self.root() {
            Self::NoCredentialAvailable
            | Self::UpstreamRateLimited { .. }
            | Self::UpstreamTransient(_) => true,
            Self::UpstreamAuthRejected { .. }
            | Self::InvalidParameters(_)
            | Self::Cancelled
            | Self::CredentialsExhausted { .. } => false,
        }
    }

    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoCredentialAvailable => "no_credential",
            Self::UpstreamAuthRejected { .. } => "auth_rejected",
            Self::UpstreamRateLimited { .. } => "rate_limited",
            Self::UpstreamTransient(_) => "transient",
            Self::InvalidParameters(_) => "invalid_parameters",
            Self::CredentialsExhausted { .. } => "credentials_exhausted",
            Self::Cancelled => "cancelled",
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Dispatcher behavior
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Deadline for each individual upstream attempt
    pub request_timeout: Duration,
    /// Retries against the same credential for transient failures
    pub transient_retry: RetryConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            transient_retry: RetryConfig::default(),
        }
    }
}

impl DispatchConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_transient_retry(mut self, retry: RetryConfig) -> Self {
        self.transient_retry = retry;
        self
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Issues upstream calls with pooled credentials
#[derive(Clone)]
pub struct Dispatcher {
    upstream: Arc<dyn Upstream>,
    pool: Arc<CredentialPool<TokenCredential>>,
    config: DispatchConfig,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl Dispatcher {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        pool: Arc<CredentialPool<TokenCredential>>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            upstream,
            pool,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Perform one upstream call
    ///
    /// Anonymous requests never touch the pool. Dropping the returned
    /// future abandons the call without reporting to the pool.
    pub async fn call(&self, request: &UpstreamRequest) -> Result<Value, DispatchError> {
        let result = if request.requires_credential() {
            self.call_authenticated(request).await
        } else {
            self.call_anonymous(request).await
        };

        match &result {
            Ok(_) => self.record_outcome("success"),
            Err(err) => {
                self.record_outcome(err.kind());
                tracing::debug!(
                    endpoint = %request,
                    error = %err,
                    "Dispatch failed"
                );
            }
        }
        result
    }

    /// `call`, abandoned early if `cancel` fires
    ///
    /// A cancelled call reports nothing to the pool: pool reports happen
    /// synchronously right after an attempt resolves, so they either
    /// complete or never start.
    pub async fn call_with_cancel(
        &self,
        request: &UpstreamRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, DispatchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(endpoint = %request, "Dispatch cancelled");
                self.record_outcome(DispatchError::Cancelled.kind());
                Err(DispatchError::Cancelled)
            }
            result = self.call(request) => result,
        }
    }

    async fn call_anonymous(&self, request: &UpstreamRequest) -> Result<Value, DispatchError> {
        self.fetch_with_retries(request, None)
            .await
            .map_err(|err| DispatchError::from_upstream(err, None))
    }

    async fn call_authenticated(&self, request: &UpstreamRequest) -> Result<Value, DispatchError> {
        let mut tried: Vec<usize> = Vec::with_capacity(self.pool.len());
        let mut last_error: Option<DispatchError> = None;

        while tried.len() < self.pool.len() {
            let Some(lease) = self.pool.acquire_excluding(&tried) else {
                break;
            };
            tried.push(lease.index());

            let err = match self.fetch_with_retries(request, Some(lease.credential())).await {
                Ok(value) => {
                    self.pool.report_success(&lease);
                    return Ok(value);
                }
                Err(err) => err,
            };

            let class = err.class();
            if !class.is_credential_attributable() {
                return Err(DispatchError::from_upstream(err, Some(lease.name())));
            }

            let outcome = self.pool.report_failure(&lease, class);
            if let Some(metrics) = &self.metrics {
                metrics
                    .credential_failures_total
                    .with_label_values(&[lease.name(), class.as_str()])
                    .inc();
                if let FailureOutcome::Disabled { .. } = outcome {
                    metrics
                        .credential_disabled_total
                        .with_label_values(&[lease.name()])
                        .inc();
                }
            }

            tracing::warn!(
                endpoint = %request,
                credential = lease.name(),
                class = %class,
                attempt = tried.len(),
                disabled = outcome.disabled(),
                "Credential failed, rotating"
            );
            last_error = Some(DispatchError::from_upstream(err, Some(lease.name())));
        }

        match last_error {
            None => Err(DispatchError::NoCredentialAvailable),
            Some(last) => Err(DispatchError::CredentialsExhausted {
                tried: tried.len(),
                last: Box::new(last),
            }),
        }
    }

    async fn fetch_with_retries(
        &self,
        request: &UpstreamRequest,
        credential: Option<&TokenCredential>,
    ) -> Result<Value, UpstreamError> {
        retry_with_backoff(&self.config.transient_retry, UpstreamError::is_transient, move || {
            self.fetch_once(request, credential)
        })
        .await
        .result
    }

    async fn fetch_once(
        &self,
        request: &UpstreamRequest,
        credential: Option<&TokenCredential>,
    ) -> Result<Value, UpstreamError> {
        if let Some(metrics) = &self.metrics {
            metrics.upstream_attempts_total.inc();
        }

        with_timeout(
            self.config.request_timeout,
            self.upstream.fetch(request, credential),
        )
        .await
        .map_err(|err| match err {
            TimeoutError::Timeout(after) => UpstreamError::Timeout(after),
            TimeoutError::Inner(inner) => inner,
        })
    }

    fn record_outcome(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(outcome);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
