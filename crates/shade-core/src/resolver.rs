//! Concurrent cache resolution for a batch of calls.
//!
//! Fan-out/fan-in: every call's lookup is issued without waiting on the
//! others, and the resolver completes only once all lookups have
//! returned. Lookups never write to the store.

use crate::{
    key::derive_key,
    store::CacheStore,
    types::{BatchContext, CacheLookupResult, RpcCall},
};
use futures::future::join_all;
use std::sync::Arc;

/// Resolves each call of a batch against the cache store, partitioning
/// into hits and misses while preserving original indices.
pub struct BatchCacheResolver {
    store: Arc<dyn CacheStore>,
}

impl BatchCacheResolver {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Looks up every call concurrently and records hit/miss per entry.
    ///
    /// The returned context has exactly one entry per call, in call
    /// order. A present-but-empty cached body is recorded as a hit with
    /// empty content, not a miss.
    pub async fn resolve(
        &self,
        path: &str,
        calls: Vec<RpcCall>,
        was_batch: bool,
    ) -> BatchContext {
        let keys: Vec<String> =
            calls.iter().map(|call| derive_key(path, &call.raw_body)).collect();

        let lookups = keys.iter().map(|key| self.store.get(key));
        let outcomes = join_all(lookups).await;

        let entries = calls
            .into_iter()
            .zip(outcomes)
            .map(|(call, outcome)| match outcome {
                Some(body) => {
                    let body = String::from_utf8_lossy(&body).into_owned();
                    tracing::debug!(index = call.index, "cache hit");
                    CacheLookupResult::hit(call, body)
                }
                None => {
                    tracing::debug!(index = call.index, "cache miss");
                    CacheLookupResult::miss(call)
                }
            })
            .collect();

        BatchContext::new(entries, was_batch)
    }
}
