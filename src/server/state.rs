//! Application state container
//!
//! This module defines the shared application state that is passed
//! to all request handlers via Axum's state extraction.

use crate::config::Settings;
use crate::metrics::GatewayMetrics;
use crate::services::{
    CredentialPool, Dispatcher, PoolStats, TokenCredential, ToolService, Upstream, XueqiuClient,
};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
///
/// Cheap to clone; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Token pool shared by every dispatch
    pub pool: Arc<CredentialPool<TokenCredential>>,

    /// Tool catalog runner
    pub tools: Arc<ToolService>,

    /// Prometheus counters
    pub metrics: Arc<GatewayMetrics>,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Create state backed by the real Xueqiu HTTP client
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        tracing::debug!(
            stock = %settings.upstream.stock_base_url,
            xueqiu = %settings.upstream.xueqiu_base_url,
            danjuan = %settings.upstream.danjuan_base_url,
            "Creating upstream HTTP client"
        );
        let client = XueqiuClient::new(settings.client_config())
            .context("Failed to build upstream HTTP client")?;

        Self::with_upstream(settings, Arc::new(client))
    }

    /// Create state around any upstream implementation
    pub fn with_upstream(settings: Settings, upstream: Arc<dyn Upstream>) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);
        let metrics = Arc::new(GatewayMetrics::new().context("Failed to register metrics")?);

        let pool = Arc::new(CredentialPool::new(
            TokenCredential::from_tokens(settings.tokens.as_slice()),
            settings.pool_config(),
        ));

        let dispatcher = Dispatcher::new(upstream, pool.clone(), settings.dispatch_config())
            .with_metrics(metrics.clone());
        let tools = Arc::new(ToolService::new(dispatcher, settings.convert_timestamps));

        if pool.is_empty() {
            tracing::warn!("No XUEQIU_TOKEN configured; only anonymous tools will succeed");
        }

        tracing::info!(
            credentials = pool.len(),
            failure_threshold = settings.pool.failure_threshold,
            cooldown_secs = settings.pool.cooldown_secs,
            "Application state initialized"
        );

        Ok(Self {
            settings,
            pool,
            tools,
            metrics,
            start_time: Instant::now(),
        })
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
