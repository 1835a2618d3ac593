//! Integration tests for the RPC caching proxy.
//!
//! Test modules:
//!
//! - `engine_tests`: end-to-end pipeline tests driving `ProxyEngine`
//!   against a mock origin (batch splitting, cache behavior, CORS,
//!   failure diagnostics)
//! - `mock_infrastructure`: reusable mock origin builder wrapping
//!   mockito
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```

pub mod mock_infrastructure;

#[cfg(test)]
mod engine_tests;
