//! Credential types and health state
//!
//! A credential is an opaque Xueqiu token. Its health is tracked separately
//! in `CredentialHealth`, which the pool mutates under its own lock.

use std::fmt;
use tokio::time::Instant;

// ============================================================================
// Failure Classification
// ============================================================================

/// Classification of an upstream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The upstream rejected the token (401/403, expired-token error code)
    AuthRejected,
    /// The upstream throttled the token (429)
    RateLimited,
    /// Timeout, connection error, 5xx or malformed payload
    Transient,
    /// The upstream rejected the request parameters
    InvalidRequest,
}

impl FailureClass {
    /// Whether this failure is caused by the specific credential in use
    pub fn is_credential_attributable(&self) -> bool {
        matches!(self, Self::AuthRejected | Self::RateLimited)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthRejected => "auth_rejected",
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
            Self::InvalidRequest => "invalid_request",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Credential Trait
// ============================================================================

/// Trait for pooled credentials
pub trait Credential: Send + Sync {
    /// Display name used in logs and stats; never the secret itself
    fn name(&self) -> &str;

    /// The raw secret value
    fn secret(&self) -> &str;
}

// ============================================================================
// Token Credential
// ============================================================================

/// Cookie name Xueqiu uses for its access token
pub const TOKEN_COOKIE: &str = "xq_a_token";

/// A Xueqiu access token
///
/// The configured value is either a bare token or a full cookie string such
/// as `xq_a_token=...;u=...`.
#[derive(Clone)]
pub struct TokenCredential {
    name: String,
    token: String,
}

impl TokenCredential {
    pub fn new(token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }

    /// Build credentials named `token_1..token_n` in configuration order
    pub fn from_tokens<I, S>(tokens: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tokens
            .into_iter()
            .enumerate()
            .map(|(idx, token)| Self::new(token, format!("token_{}", idx + 1)))
            .collect()
    }

    /// Value for the `Cookie` request header
    pub fn cookie_value(&self) -> String {
        if self.token.contains('=') {
            self.token.clone()
        } else {
            format!("{}={}", TOKEN_COOKIE, self.token)
        }
    }
}

impl Credential for TokenCredential {
    fn name(&self) -> &str {
        &self.name
    }

    fn secret(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for TokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredential")
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Credential Health
// ============================================================================

/// Activity state of a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Active,
    Disabled { until: Instant },
}

/// Health bookkeeping for one credential
///
/// Not synchronized on its own; the owning pool serializes all access.
#[derive(Debug, Clone)]
pub struct CredentialHealth {
    state: CredentialState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    last_success: Option<Instant>,
}

impl Default for CredentialHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHealth {
    pub fn new() -> Self {
        Self {
            state: CredentialState::Active,
            consecutive_failures: 0,
            last_failure: None,
            last_success: None,
        }
    }

    pub fn state(&self) -> CredentialState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_failure(&self) -> Option<Instant> {
        self.last_failure
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.last_success
    }

    pub fn disabled_until(&self) -> Option<Instant> {
        match self.state {
            CredentialState::Active => None,
            CredentialState::Disabled { until } => Some(until),
        }
    }

    /// Whether the credential may be selected at `now`, ignoring lazy reactivation
    pub fn is_active(&self) -> bool {
        matches!(self.state, CredentialState::Active)
    }

    /// Whether the credential would be selectable at `now`
    pub fn is_available_at(&self, now: Instant) -> bool {
        match self.state {
            CredentialState::Active => true,
            CredentialState::Disabled { until } => now >= until,
        }
    }

    /// Reactivate if the cooldown has elapsed. Returns true on transition.
    pub fn refresh(&mut self, now: Instant) -> bool {
        match self.state {
            CredentialState::Disabled { until } if now >= until => {
                self.state = CredentialState::Active;
                true
            }
            _ => false,
        }
    }

    /// Record a success. Returns true if the credential was disabled.
    pub fn record_success(&mut self, now: Instant) -> bool {
        let was_disabled = !self.is_active();
        self.consecutive_failures = 0;
        self.last_success = Some(now);
        self.state = CredentialState::Active;
        was_disabled
    }

    /// Record a credential-attributable failure, returning the new count
    pub fn record_failure(&mut self, now: Instant) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(now);
        self.consecutive_failures
    }

    /// Disable until `until`, keeping a later existing deadline
    pub fn disable_until(&mut self, until: Instant) {
        let until = match self.state {
            CredentialState::Disabled { until: current } if current > until => current,
            _ => until,
        };
        self.state = CredentialState::Disabled { until };
    }
}

// ============================================================================
// Tests
// ============================================================================
