//! Cache store abstraction and the in-memory implementation.
//!
//! The proxy only ever needs opaque get/put keyed by string with a TTL
//! attached at write time. The store must be safe for concurrent
//! independent reads and writes from many request instances; no
//! cross-key consistency is required.

use async_trait::async_trait;
use bytes::Bytes;
use moka::{future::Cache, Expiry};
use std::time::{Duration, Instant};

/// Async key-value cache with per-entry TTL.
///
/// `get` never mutates the store; only the assembler's write-through
/// path calls `put`. A `put` is best-effort: implementations swallow
/// failures internally (logging them at most) so the response path is
/// never blocked or failed by the cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Looks up a cached body. `None` means miss; an empty `Bytes` is a
    /// hit with empty content.
    async fn get(&self, key: &str) -> Option<Bytes>;

    /// Stores a body under `key` for `ttl`.
    async fn put(&self, key: String, value: Bytes, ttl: Duration);
}

/// TTL policy reading the duration attached to each entry at insert.
struct PerEntryTtl;

impl Expiry<String, (Bytes, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(Bytes, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// Moka-backed in-memory store.
pub struct MemoryStore {
    cache: Cache<String, (Bytes, Duration)>,
}

impl MemoryStore {
    /// Creates a store bounded to `max_entries`.
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    /// Approximate number of live entries, for health reporting.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Bytes> {
        self.cache.get(key).await.map(|(body, _)| body)
    }

    async fn put(&self, key: String, value: Bytes, ttl: Duration) {
        self.cache.insert(key, (value, ttl)).await;
    }
}
