//! Response assembly and cache write-through.
//!
//! Merges cached bodies and freshly fetched origin results back into one
//! response whose shape mirrors the inbound payload, and schedules the
//! cache writes for the fetched subset. Writes are fire-and-forget: the
//! response is returned without waiting on them, and a failed write only
//! costs a future cache miss.

use crate::{
    errors::ProxyError,
    key::derive_key,
    store::CacheStore,
    types::{BatchContext, ProxyResponse},
};
use bytes::Bytes;
use http::{header, HeaderName, StatusCode};
use serde_json::Value;
use std::{sync::Arc, time::Duration};

/// Response header reporting cache state: `true`/`false` for single
/// calls, a JSON array of hit indices for batches.
pub const CACHED_HEADER: HeaderName = HeaderName::from_static("cached");

/// Rebuilds the outbound response from a resolved batch context.
pub struct ResponseAssembler {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResponseAssembler {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Backfills misses with `results` (positionally, in miss order),
    /// schedules their cache writes, and serializes the full response.
    ///
    /// Shape preservation: an inbound array comes back as an array with
    /// one element per call in original order, even for a single-element
    /// batch; an inbound single object comes back bare. Cached bodies
    /// are spliced in verbatim, never re-serialized.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Internal`] if the result count disagrees
    /// with the miss count. The dispatcher validates this against the
    /// origin already; a mismatch here is a pipeline bug.
    pub fn assemble(
        &self,
        mut context: BatchContext,
        path: &str,
        results: Vec<Value>,
    ) -> Result<ProxyResponse, ProxyError> {
        self.backfill_and_store(&mut context, path, results)?;

        let bodies: Vec<&str> = context
            .entries()
            .iter()
            .map(|entry| {
                entry.response_body.as_deref().ok_or_else(|| {
                    ProxyError::Internal(format!(
                        "entry {} has no response body after backfill",
                        entry.call.index
                    ))
                })
            })
            .collect::<Result<_, _>>()?;

        let body = if context.was_batch() {
            format!("[{}]", bodies.join(","))
        } else {
            // A non-batch context holds exactly one entry by
            // construction.
            bodies.first().copied().unwrap_or_default().to_string()
        };

        let mut response = ProxyResponse::new(StatusCode::OK, Bytes::from(body));
        response.set_header(header::CONTENT_TYPE, "application/json");
        response.set_header(CACHED_HEADER, &cached_header_value(&context));
        Ok(response)
    }

    /// Attaches each origin result to its miss entry and spawns a
    /// detached cache write per result.
    fn backfill_and_store(
        &self,
        context: &mut BatchContext,
        path: &str,
        results: Vec<Value>,
    ) -> Result<(), ProxyError> {
        let missed = context.missed_calls().len();
        if results.len() != missed {
            return Err(ProxyError::Internal(format!(
                "{} origin results for {missed} misses",
                results.len()
            )));
        }

        let mut results = results.into_iter();
        for entry in context.entries_mut() {
            if entry.cached_at_lookup {
                continue;
            }
            let Some(result) = results.next() else { break };
            let body = result.to_string();

            let key = derive_key(path, &entry.call.raw_body);
            let store = Arc::clone(&self.store);
            let ttl = self.ttl;
            let value = Bytes::from(body.clone());
            tokio::spawn(async move {
                store.put(key, value, ttl).await;
            });

            entry.backfill(body);
        }
        Ok(())
    }
}

fn cached_header_value(context: &BatchContext) -> String {
    if context.was_batch() {
        let indices = context.hit_indices();
        serde_json::to_string(&indices).unwrap_or_else(|_| "[]".to_string())
    } else if context.entries().first().is_some_and(|e| e.cached_at_lookup) {
        "true".to_string()
    } else {
        "false".to_string()
    }
}
