//! Configuration management module
//!
//! This module handles loading and validating application configuration
//! from environment variables and .env files.

pub mod settings;

pub use settings::{collect_tokens, Environment, PoolSettings, Settings, Tokens, UpstreamSettings};
