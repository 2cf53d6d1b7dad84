//! Prometheus metrics
//!
//! Counters for dispatch outcomes and credential health transitions,
//! exposed on `GET /metrics`. Labels carry credential names only.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Metrics shared by the dispatcher and the HTTP layer
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    /// Completed dispatches by outcome
    pub dispatch_total: IntCounterVec,
    /// Individual upstream attempts, including retries
    pub upstream_attempts_total: IntCounter,
    /// Credential-attributable failures by credential and class
    pub credential_failures_total: IntCounterVec,
    /// Transitions into the disabled state by credential
    pub credential_disabled_total: IntCounterVec,
}

impl GatewayMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("xueqiu_gateway".to_string()), None)?;

        let dispatch_total = IntCounterVec::new(
            Opts::new("dispatch_total", "Completed tool dispatches by outcome"),
            &["outcome"],
        )?;
        let upstream_attempts_total = IntCounter::new(
            "upstream_attempts_total",
            "Upstream HTTP attempts including retries",
        )?;
        let credential_failures_total = IntCounterVec::new(
            Opts::new(
                "credential_failures_total",
                "Credential-attributable upstream failures",
            ),
            &["credential", "class"],
        )?;
        let credential_disabled_total = IntCounterVec::new(
            Opts::new("credential_disabled_total", "Times a credential was disabled"),
            &["credential"],
        )?;

        registry.register(Box::new(dispatch_total.clone()))?;
        registry.register(Box::new(upstream_attempts_total.clone()))?;
        registry.register(Box::new(credential_failures_total.clone()))?;
        registry.register(Box::new(credential_disabled_total.clone()))?;

        Ok(Self {
            registry,
            dispatch_total,
            upstream_attempts_total,
            credential_failures_total,
            credential_disabled_total,
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.dispatch_total.with_label_values(&[outcome]).inc();
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
