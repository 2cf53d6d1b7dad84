//! API endpoint handlers module
//!
//! Contains all HTTP endpoint handler implementations.

pub mod health;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;
