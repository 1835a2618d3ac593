//! # Shade Core
//!
//! Core library for Shade, an edge-deployed caching proxy that sits in
//! front of a JSON-RPC origin (a blockchain node query endpoint).
//!
//! Shade intercepts inbound JSON-RPC requests (single calls or batches),
//! deduplicates and caches each individual call's result for a short
//! window, forwards only the uncached subset upstream as a single
//! re-batched call, and reassembles a response that is shape-compatible
//! with what the caller sent.
//!
//! - **[`key`]**: Correlation-id-insensitive cache key derivation.
//! - **[`splitter`]**: Normalizes an inbound payload into an ordered list
//!   of individual RPC calls.
//! - **[`store`]**: Async key-value cache store abstraction with a
//!   moka-backed in-memory implementation.
//! - **[`resolver`]**: Concurrent per-call cache lookups and hit/miss
//!   partitioning.
//! - **[`upstream`]**: Origin forwarding, batch re-dispatch, and response
//!   shape validation.
//! - **[`assembler`]**: Write-through caching and shape-preserving
//!   response reassembly.
//! - **[`cors`]**: Origin allow-list checks and preflight synthesis.
//! - **[`engine`]**: The request pipeline tying the stages together.
//!
//! ## Request Flow
//!
//! ```text
//! Inbound request
//!       |
//!       v
//! PayloadSplitter ---> ordered RpcCalls
//!       |
//!       v
//! BatchCacheResolver ---> BatchContext (hits + misses)
//!       |
//!       v  (misses only)
//! UpstreamDispatcher ---> origin results / HTML passthrough
//!       |
//!       v
//! ResponseAssembler ---> cache write-back (detached) + final body
//!       |
//!       v
//! CorsPolicy ---> header decoration ---> outbound response
//! ```

pub mod assembler;
pub mod config;
pub mod cors;
pub mod engine;
pub mod errors;
pub mod key;
pub mod resolver;
pub mod splitter;
pub mod store;
pub mod types;
pub mod upstream;
