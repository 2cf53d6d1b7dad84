//! Credential Pool Implementation
//!
//! Round-robin selection over an ordered set of credentials with lazy
//! reactivation. The cursor and every credential's health live behind one
//! mutex, so `acquire`, `report_success` and `report_failure` are atomic with
//! respect to each other. No lock is held across an await point.

use super::cooldown::CooldownPolicy;
use super::credential::{Credential, CredentialHealth, FailureClass};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// Pool Configuration
// ============================================================================

/// Configuration for credential pool behavior
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Consecutive credential-attributable failures before disabling
    pub failure_threshold: u32,
    /// How long a disabled credential sits out
    pub cooldown: CooldownPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: CooldownPolicy::default(),
        }
    }
}

impl PoolConfig {
    pub fn new(failure_threshold: u32, cooldown: CooldownPolicy) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_cooldown(mut self, cooldown: CooldownPolicy) -> Self {
        self.cooldown = cooldown;
        self
    }
}

// ============================================================================
// Lease
// ============================================================================

/// A credential handed out by `acquire`
///
/// The lease identifies the pool slot it came from; report outcomes with it.
pub struct Lease<C> {
    index: usize,
    credential: Arc<C>,
}

impl<C> Clone for Lease<C> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            credential: Arc::clone(&self.credential),
        }
    }
}

impl<C: Credential> Lease<C> {
    /// Position of the credential in configuration order
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        self.credential.name()
    }

    pub fn credential(&self) -> &C {
        &self.credential
    }
}

impl<C: Credential> fmt::Debug for Lease<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("index", &self.index)
            .field("credential", &self.credential.name())
            .finish()
    }
}

// ============================================================================
// Failure Outcome
// ============================================================================

/// What `report_failure` did to the credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Not credential-attributable, or the lease is not from this pool
    Ignored,
    /// Counted, still below the threshold
    Counted { consecutive_failures: u32 },
    /// Counted and the credential is now disabled
    Disabled {
        consecutive_failures: u32,
        cooldown: Duration,
    },
}

impl FailureOutcome {
    pub fn disabled(&self) -> bool {
        matches!(self, Self::Disabled { .. })
    }
}

// ============================================================================
// Credential Pool
// ============================================================================

struct Slot<C> {
    credential: Arc<C>,
    health: CredentialHealth,
}

struct PoolState<C> {
    slots: Vec<Slot<C>>,
    cursor: usize,
}

/// A pool of credentials with round-robin rotation and health tracking
pub struct CredentialPool<C: Credential> {
    state: Mutex<PoolState<C>>,
    config: PoolConfig,
    len: usize,
}

impl<C: Credential> fmt::Debug for CredentialPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.len)
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Credential> CredentialPool<C> {
    /// Create a pool; configuration order is rotation order
    pub fn new(credentials: Vec<C>, config: PoolConfig) -> Self {
        let slots: Vec<Slot<C>> = credentials
            .into_iter()
            .map(|credential| Slot {
                credential: Arc::new(credential),
                health: CredentialHealth::new(),
            })
            .collect();
        let len = slots.len();

        Self {
            state: Mutex::new(PoolState { slots, cursor: 0 }),
            config,
            len,
        }
    }

    /// A pool with no credentials; every acquisition is exhausted
    pub fn empty(config: PoolConfig) -> Self {
        Self::new(Vec::new(), config)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Select the next usable credential, or `None` if all are disabled
    pub fn acquire(&self) -> Option<Lease<C>> {
        self.acquire_at(Instant::now())
    }

    /// `acquire` against an explicit clock reading
    pub fn acquire_at(&self, now: Instant) -> Option<Lease<C>> {
        self.acquire_excluding_at(&[], now)
    }

    /// Select the next usable credential whose index is not in `excluded`
    ///
    /// Used by callers rotating within one logical call, so a credential
    /// they already tried is never handed back to them even when other
    /// callers move the cursor in between.
    pub fn acquire_excluding(&self, excluded: &[usize]) -> Option<Lease<C>> {
        self.acquire_excluding_at(excluded, Instant::now())
    }

    pub fn acquire_excluding_at(&self, excluded: &[usize], now: Instant) -> Option<Lease<C>> {
        if self.len == 0 {
            return None;
        }

        let mut state = self.lock();
        let start = state.cursor;

        for offset in 0..self.len {
            let idx = (start + offset) % self.len;
            if excluded.contains(&idx) {
                continue;
            }
            let slot = &mut state.slots[idx];

            if slot.health.refresh(now) {
                tracing::info!(
                    credential = slot.credential.name(),
                    "Credential cooldown elapsed, reactivated"
                );
            }

            if slot.health.is_active() {
                let lease = Lease {
                    index: idx,
                    credential: Arc::clone(&slot.credential),
                };
                state.cursor = (idx + 1) % self.len;
                return Some(lease);
            }
        }

        state.cursor = (start + 1) % self.len;
        tracing::debug!(
            total = self.len,
            excluded = excluded.len(),
            "No untried credential available"
        );
        None
    }

    /// Report a successful call made with `lease`
    pub fn report_success(&self, lease: &Lease<C>) {
        self.report_success_at(lease, Instant::now());
    }

    pub fn report_success_at(&self, lease: &Lease<C>, now: Instant) {
        let mut state = self.lock();
        let Some(slot) = Self::slot_for(&mut state, lease) else {
            return;
        };

        if slot.health.record_success(now) {
            tracing::info!(
                credential = slot.credential.name(),
                "Credential reactivated after successful call"
            );
        }
    }

    /// Report a failed call made with `lease`
    ///
    /// Only credential-attributable classes affect health.
    pub fn report_failure(&self, lease: &Lease<C>, class: FailureClass) -> FailureOutcome {
        self.report_failure_at(lease, class, Instant::now())
    }

    pub fn report_failure_at(
        &self,
        lease: &Lease<C>,
        class: FailureClass,
        now: Instant,
    ) -> FailureOutcome {
        if !class.is_credential_attributable() {
            return FailureOutcome::Ignored;
        }

        let threshold = self.config.failure_threshold;
        let mut state = self.lock();
        let Some(slot) = Self::slot_for(&mut state, lease) else {
            return FailureOutcome::Ignored;
        };

        let failures = slot.health.record_failure(now);
        if failures < threshold {
            tracing::debug!(
                credential = slot.credential.name(),
                class = %class,
                failures,
                "Credential failure recorded"
            );
            return FailureOutcome::Counted {
                consecutive_failures: failures,
            };
        }

        let cooldown = self.config.cooldown.cooldown(failures - threshold);
        slot.health.disable_until(now + cooldown);
        tracing::warn!(
            credential = slot.credential.name(),
            class = %class,
            failures,
            cooldown_secs = cooldown.as_secs_f64(),
            "Credential disabled"
        );

        FailureOutcome::Disabled {
            consecutive_failures: failures,
            cooldown,
        }
    }

    /// Snapshot of pool health
    pub fn stats(&self) -> PoolStats {
        self.stats_at(Instant::now())
    }

    pub fn stats_at(&self, now: Instant) -> PoolStats {
        let state = self.lock();
        let credentials: Vec<CredentialStatus> = state
            .slots
            .iter()
            .map(|slot| CredentialStatus {
                name: slot.credential.name().to_string(),
                available: slot.health.is_available_at(now),
                consecutive_failures: slot.health.consecutive_failures(),
                disabled_for_secs: slot
                    .health
                    .disabled_until()
                    .filter(|until| *until > now)
                    .map(|until| (until - now).as_secs()),
                last_failure_secs_ago: slot
                    .health
                    .last_failure()
                    .map(|at| now.saturating_duration_since(at).as_secs()),
                last_success_secs_ago: slot
                    .health
                    .last_success()
                    .map(|at| now.saturating_duration_since(at).as_secs()),
            })
            .collect();

        let available = credentials.iter().filter(|c| c.available).count();
        PoolStats {
            total: credentials.len(),
            available,
            disabled: credentials.len() - available,
            credentials,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        // Health updates are single assignments; a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot_for<'a>(state: &'a mut PoolState<C>, lease: &Lease<C>) -> Option<&'a mut Slot<C>> {
        match state.slots.get_mut(lease.index) {
            Some(slot) if Arc::ptr_eq(&slot.credential, &lease.credential) => Some(slot),
            _ => {
                tracing::debug!(
                    credential = lease.name(),
                    "Lease does not belong to this pool, ignoring report"
                );
                None
            }
        }
    }
}

// ============================================================================
// Pool Statistics
// ============================================================================

/// Health of one credential, safe to expose (no secret)
#[derive(Debug, Clone, Serialize)]
pub struct CredentialStatus {
    pub name: String,
    pub available: bool,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_for_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_secs_ago: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_secs_ago: Option<u64>,
}

/// Statistics about a credential pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub total: usize,
    pub available: usize,
    pub disabled: usize,
    pub credentials: Vec<CredentialStatus>,
}

impl PoolStats {
    /// At least one credential can serve authenticated calls
    pub fn is_healthy(&self) -> bool {
        self.available > 0
    }
}

// ============================================================================
// Tests
// ============================================================================
