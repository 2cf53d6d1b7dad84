//! Utility modules
//!
//! Retry logic, timeout handling and string helpers.

pub mod retry;
pub mod string;
pub mod timeout;

pub use retry::{retry_with_backoff, RetryConfig, RetryResult};
pub use string::{truncate_str, truncate_with_suffix};
pub use timeout::{with_timeout, TimeoutError};
