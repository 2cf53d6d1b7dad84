//! Services module
//!
//! Contains the credential pool, the upstream client and the tool layer
//! built on top of them.

pub mod catalog;
pub mod credential_pool;
pub mod dispatcher;
pub mod tools;
pub mod transform;
pub mod upstream;

pub use credential_pool::{
    CooldownPolicy, Credential, CredentialHealth, CredentialPool, FailureClass, Lease, PoolConfig,
    PoolStats, TokenCredential,
};
pub use dispatcher::{DispatchConfig, DispatchError, Dispatcher};
pub use tools::{ToolError, ToolService};
pub use upstream::{
    ClientConfig, Upstream, UpstreamError, UpstreamRequest, UpstreamUrls, XueqiuClient,
};
