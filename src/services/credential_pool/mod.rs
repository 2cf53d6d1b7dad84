//! Credential Pool Module
//!
//! Manages the set of Xueqiu tokens used for authenticated upstream calls:
//! round-robin selection, failure accounting and temporary disabling with a
//! cooldown that elapses lazily (checked on each selection, no timer task).
//!
//! # Example
//! ```ignore
//! use credential_pool::{CredentialPool, PoolConfig, TokenCredential, FailureClass};
//!
//! let pool = CredentialPool::new(
//!     TokenCredential::from_tokens(["tok-a", "tok-b"]),
//!     PoolConfig::default(),
//! );
//!
//! if let Some(lease) = pool.acquire() {
//!     // ... call upstream with lease.credential() ...
//!     pool.report_failure(&lease, FailureClass::RateLimited);
//! }
//! ```

mod cooldown;
mod credential;
mod pool;

pub use cooldown::CooldownPolicy;
pub use credential::{
    Credential, CredentialHealth, CredentialState, FailureClass, TokenCredential, TOKEN_COOKIE,
};
pub use pool::{CredentialPool, CredentialStatus, FailureOutcome, Lease, PoolConfig, PoolStats};
