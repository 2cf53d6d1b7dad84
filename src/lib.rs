//! Xueqiu tool gateway library
//!
//! Serves Xueqiu/Snowball market-data tools over HTTP, spreading
//! authenticated calls across a pool of user tokens.

// Public modules
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::ApiError;
pub use server::App;
