//! Application settings and configuration
//!
//! Settings come from environment variables (and a `.env` file, if
//! present) with defaults for everything except the Xueqiu tokens.

use crate::services::credential_pool::{CooldownPolicy, PoolConfig};
use crate::services::dispatcher::DispatchConfig;
use crate::services::upstream::{
    ClientConfig, UpstreamUrls, DANJUAN_BASE, EASTMONEY_BASE, STOCK_API_BASE, XUEQIU_BASE,
};
use crate::utils::RetryConfig;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Highest `XUEQIU_TOKEN_<n>` suffix that is scanned
const MAX_NUMBERED_TOKENS: usize = 32;

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!(
                "Invalid environment: {}. Expected: development, staging, or production",
                s
            ),
        }
    }
}

/// Configured Xueqiu tokens, in configuration order
///
/// `Debug` prints only the count.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Tokens(Vec<String>);

impl Tokens {
    pub fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tokens([{} redacted])", self.0.len())
    }
}

/// Credential pool tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolSettings {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
    pub cooldown_multiplier: f64,
    pub max_cooldown_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 60,
            cooldown_multiplier: 2.0,
            max_cooldown_secs: 1800,
        }
    }
}

/// Upstream HTTP behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub transient_retries: u32,
    pub transient_retry_delay_ms: u64,
    pub stock_base_url: String,
    pub xueqiu_base_url: String,
    pub danjuan_base_url: String,
    pub eastmoney_base_url: String,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            connect_timeout_secs: 5,
            transient_retries: 1,
            transient_retry_delay_ms: 200,
            stock_base_url: STOCK_API_BASE.to_string(),
            xueqiu_base_url: XUEQIU_BASE.to_string(),
            danjuan_base_url: DANJUAN_BASE.to_string(),
            eastmoney_base_url: EASTMONEY_BASE.to_string(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,

    // Credentials
    #[serde(skip)]
    pub tokens: Tokens,

    pub pool: PoolSettings,
    pub upstream: UpstreamSettings,

    /// Rewrite epoch `timestamp` / `*_date` fields in tool results
    pub convert_timestamps: bool,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let settings = Self::from_lookup(|key| env::var(key).ok())?;
        settings.validate()?;

        Ok(settings)
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            // App settings
            app_name: get("APP_NAME", &defaults.app_name),
            app_version: defaults.app_version,
            environment: get("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: get("LOG_LEVEL", &defaults.log_level),

            // Server settings
            host: get("HOST", &defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,

            tokens: collect_tokens(&lookup),

            pool: PoolSettings {
                failure_threshold: parse_var(
                    &lookup,
                    "POOL_FAILURE_THRESHOLD",
                    defaults.pool.failure_threshold,
                )?,
                cooldown_secs: parse_var(&lookup, "POOL_COOLDOWN_SECS", defaults.pool.cooldown_secs)?,
                cooldown_multiplier: parse_var(
                    &lookup,
                    "POOL_COOLDOWN_MULTIPLIER",
                    defaults.pool.cooldown_multiplier,
                )?,
                max_cooldown_secs: parse_var(
                    &lookup,
                    "POOL_MAX_COOLDOWN_SECS",
                    defaults.pool.max_cooldown_secs,
                )?,
            },

            upstream: UpstreamSettings {
                timeout_secs: parse_var(
                    &lookup,
                    "UPSTREAM_TIMEOUT_SECS",
                    defaults.upstream.timeout_secs,
                )?,
                connect_timeout_secs: parse_var(
                    &lookup,
                    "UPSTREAM_CONNECT_TIMEOUT_SECS",
                    defaults.upstream.connect_timeout_secs,
                )?,
                transient_retries: parse_var(
                    &lookup,
                    "TRANSIENT_RETRIES",
                    defaults.upstream.transient_retries,
                )?,
                transient_retry_delay_ms: parse_var(
                    &lookup,
                    "TRANSIENT_RETRY_DELAY_MS",
                    defaults.upstream.transient_retry_delay_ms,
                )?,
                stock_base_url: get("XUEQIU_STOCK_BASE_URL", &defaults.upstream.stock_base_url),
                xueqiu_base_url: get("XUEQIU_BASE_URL", &defaults.upstream.xueqiu_base_url),
                danjuan_base_url: get("DANJUAN_BASE_URL", &defaults.upstream.danjuan_base_url),
                eastmoney_base_url: get(
                    "EASTMONEY_BASE_URL",
                    &defaults.upstream.eastmoney_base_url,
                ),
            },

            convert_timestamps: parse_var(
                &lookup,
                "CONVERT_TIMESTAMPS",
                defaults.convert_timestamps,
            )?,
        })
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.pool.failure_threshold == 0 {
            anyhow::bail!("POOL_FAILURE_THRESHOLD must be >= 1");
        }
        if !self.pool.cooldown_multiplier.is_finite() || self.pool.cooldown_multiplier < 1.0 {
            anyhow::bail!("POOL_COOLDOWN_MULTIPLIER must be >= 1.0");
        }
        if self.pool.max_cooldown_secs < self.pool.cooldown_secs {
            anyhow::bail!("POOL_MAX_COOLDOWN_SECS must be >= POOL_COOLDOWN_SECS");
        }

        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("UPSTREAM_TIMEOUT_SECS must be > 0");
        }
        if self.upstream.connect_timeout_secs == 0 {
            anyhow::bail!("UPSTREAM_CONNECT_TIMEOUT_SECS must be > 0");
        }

        Ok(())
    }

    /// Credential pool parameters
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(
            self.pool.failure_threshold,
            CooldownPolicy::exponential(
                Duration::from_secs(self.pool.cooldown_secs),
                self.pool.cooldown_multiplier,
                Duration::from_secs(self.pool.max_cooldown_secs),
            ),
        )
    }

    /// Dispatcher parameters
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig::default()
            .with_request_timeout(Duration::from_secs(self.upstream.timeout_secs))
            .with_transient_retry(
                RetryConfig::new()
                    .with_max_retries(self.upstream.transient_retries)
                    .with_initial_delay(Duration::from_millis(
                        self.upstream.transient_retry_delay_ms,
                    )),
            )
    }

    /// HTTP client parameters
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            urls: UpstreamUrls {
                stock: self.upstream.stock_base_url.clone(),
                xueqiu: self.upstream.xueqiu_base_url.clone(),
                danjuan: self.upstream.danjuan_base_url.clone(),
                eastmoney: self.upstream.eastmoney_base_url.clone(),
            },
            timeout: Duration::from_secs(self.upstream.timeout_secs),
            connect_timeout: Duration::from_secs(self.upstream.connect_timeout_secs),
        }
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "xueqiu-gateway".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            tokens: Tokens::default(),
            pool: PoolSettings::default(),
            upstream: UpstreamSettings::default(),
            convert_timestamps: true,
        }
    }
}

/// Gather tokens from `XUEQIU_TOKEN` (comma-separated) and then
/// `XUEQIU_TOKEN_1..`, dropping blanks and duplicates
pub fn collect_tokens<F>(lookup: F) -> Tokens
where
    F: Fn(&str) -> Option<String>,
{
    let mut tokens: Vec<String> = Vec::new();
    let mut push = |raw: &str| {
        let token = raw.trim();
        if !token.is_empty() && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    };

    if let Some(list) = lookup("XUEQIU_TOKEN") {
        list.split(',').for_each(&mut push);
    }
    for n in 1..=MAX_NUMBERED_TOKENS {
        if let Some(token) = lookup(&format!("XUEQIU_TOKEN_{}", n)) {
            push(&token);
        }
    }

    Tokens(tokens)
}

/// Parse a variable, falling back to `default` when it is unset or blank
fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} value: {}", key, raw)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "xueqiu-gateway");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.pool.failure_threshold, 3);
        assert!(settings.convert_timestamps);
        assert!(settings.tokens.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_collect_tokens_merges_sources() {
        let tokens = collect_tokens(lookup(&[
            ("XUEQIU_TOKEN", " aaa, bbb ,,"),
            ("XUEQIU_TOKEN_1", "ccc"),
            ("XUEQIU_TOKEN_3", "aaa"),
            ("XUEQIU_TOKEN_4", "ddd"),
        ]));
        assert_eq!(tokens.as_slice(), ["aaa", "bbb", "ccc", "ddd"]);
    }

    #[test]
    fn test_tokens_debug_is_redacted() {
        let tokens = Tokens::new(vec!["super-secret".to_string()]);
        let rendered = format!("{:?}", tokens);
        assert_eq!(rendered, "Tokens([1 redacted])");
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("PORT", "9100"),
            ("POOL_FAILURE_THRESHOLD", "1"),
            ("POOL_COOLDOWN_SECS", "30"),
            ("TRANSIENT_RETRIES", "0"),
            ("CONVERT_TIMESTAMPS", "false"),
            ("ENVIRONMENT", "prod"),
            ("XUEQIU_TOKEN", "abc"),
        ]))
        .unwrap();

        assert_eq!(settings.port, 9100);
        assert_eq!(settings.pool.failure_threshold, 1);
        assert_eq!(settings.pool.cooldown_secs, 30);
        assert_eq!(settings.upstream.transient_retries, 0);
        assert!(!settings.convert_timestamps);
        assert!(settings.is_production());
        assert_eq!(settings.tokens.len(), 1);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Settings::from_lookup(lookup(&[("POOL_COOLDOWN_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("POOL_COOLDOWN_SECS"));
    }

    #[test]
    fn test_validation_rules() {
        let mut settings = Settings::default();
        settings.pool.failure_threshold = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.pool.cooldown_multiplier = 0.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.pool.max_cooldown_secs = 10;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.upstream.timeout_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_derived_configs() {
        let settings = Settings::from_lookup(lookup(&[
            ("POOL_FAILURE_THRESHOLD", "2"),
            ("POOL_COOLDOWN_SECS", "10"),
            ("POOL_COOLDOWN_MULTIPLIER", "3"),
            ("POOL_MAX_COOLDOWN_SECS", "50"),
            ("UPSTREAM_TIMEOUT_SECS", "7"),
            ("TRANSIENT_RETRIES", "2"),
            ("DANJUAN_BASE_URL", "http://localhost:9000"),
            ("EASTMONEY_BASE_URL", "http://localhost:9100"),
        ]))
        .unwrap();

        let pool = settings.pool_config();
        assert_eq!(pool.failure_threshold, 2);
        assert_eq!(pool.cooldown.cooldown(0), Duration::from_secs(10));
        assert_eq!(pool.cooldown.cooldown(1), Duration::from_secs(30));
        assert_eq!(pool.cooldown.cooldown(2), Duration::from_secs(50));

        let dispatch = settings.dispatch_config();
        assert_eq!(dispatch.request_timeout, Duration::from_secs(7));
        assert_eq!(dispatch.transient_retry.max_retries, 2);

        let client = settings.client_config();
        assert_eq!(client.urls.danjuan, "http://localhost:9000");
        assert_eq!(client.urls.eastmoney, "http://localhost:9100");
        assert_eq!(client.timeout, Duration::from_secs(7));
    }
}
