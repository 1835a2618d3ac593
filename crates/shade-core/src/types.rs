//! Core type definitions for the request lifecycle.
//!
//! One inbound transport request is decomposed into [`RpcCall`]s, resolved
//! into a [`BatchContext`] of per-call [`CacheLookupResult`]s, and rebuilt
//! into a [`ProxyResponse`]. The `BatchContext` is the single mutable
//! aggregate a request operates on; it is owned exclusively by that
//! request's execution and never shared.

use http::{HeaderMap, Method, StatusCode};

/// One logical JSON-RPC call extracted from the inbound payload.
///
/// Whether the inbound payload was a single object or an array, each call
/// carries its own serialized body. `index` fixes its position in the
/// original payload for reassembly. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct RpcCall {
    /// The call body as an individually serialized string.
    pub raw_body: String,
    /// The parsed JSON value, or `None` for opaque non-JSON payloads.
    pub parsed: Option<serde_json::Value>,
    /// Position in the inbound payload. The only stable identity.
    pub index: usize,
}

impl RpcCall {
    /// Creates a call backed by a parsed JSON value.
    #[must_use]
    pub fn new(raw_body: String, parsed: serde_json::Value, index: usize) -> Self {
        Self { raw_body, parsed: Some(parsed), index }
    }

    /// Creates an opaque call for non-JSON (or absent) bodies.
    #[must_use]
    pub fn opaque(raw_body: String, index: usize) -> Self {
        Self { raw_body, parsed: None, index }
    }
}

/// Per-call cache lookup outcome, backfilled exactly once on a miss.
#[derive(Debug)]
pub struct CacheLookupResult {
    pub call: RpcCall,
    /// Whether this call was a cache hit at lookup time. Backfilling a
    /// miss with an upstream result never flips this; the `Cached`
    /// header reports lookup-time state.
    pub cached_at_lookup: bool,
    /// The serialized response body, present for hits and for misses
    /// after backfill. An empty-but-present body is a hit with empty
    /// content, not a miss.
    pub response_body: Option<String>,
}

impl CacheLookupResult {
    /// A lookup that found a cached body.
    #[must_use]
    pub fn hit(call: RpcCall, body: String) -> Self {
        Self { call, cached_at_lookup: true, response_body: Some(body) }
    }

    /// A lookup that found nothing.
    #[must_use]
    pub fn miss(call: RpcCall) -> Self {
        Self { call, cached_at_lookup: false, response_body: None }
    }

    /// Attaches the upstream result for a miss. `cached_at_lookup`
    /// deliberately stays `false`.
    pub fn backfill(&mut self, body: String) {
        self.response_body = Some(body);
    }
}

/// Ordered collection of lookup results, one per [`RpcCall`], indexed
/// identically to the call list. Entries are never reordered, only
/// annotated.
#[derive(Debug)]
pub struct BatchContext {
    entries: Vec<CacheLookupResult>,
    was_batch: bool,
}

impl BatchContext {
    #[must_use]
    pub fn new(entries: Vec<CacheLookupResult>, was_batch: bool) -> Self {
        Self { entries, was_batch }
    }

    /// Whether the inbound payload was a JSON array.
    #[must_use]
    pub fn was_batch(&self) -> bool {
        self.was_batch
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[CacheLookupResult] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [CacheLookupResult] {
        &mut self.entries
    }

    /// Calls that were misses at lookup time, in original order.
    #[must_use]
    pub fn missed_calls(&self) -> Vec<&RpcCall> {
        self.entries.iter().filter(|e| !e.cached_at_lookup).map(|e| &e.call).collect()
    }

    /// Indices of the entries that were hits at lookup time.
    #[must_use]
    pub fn hit_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| e.cached_at_lookup)
            .map(|e| e.call.index)
            .collect()
    }
}

/// Transport-agnostic view of the inbound edge request.
///
/// The body is held as an owned copy so downstream stages can read it
/// more than once: the splitter consumes it logically, while the
/// upstream dispatcher still needs the original method and headers.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path and query of the request URI (e.g. `/rpc?height=5`).
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl InboundRequest {
    #[must_use]
    pub fn new(method: Method, path: String, headers: HeaderMap, body: Option<String>) -> Self {
        Self { method, path, headers, body }
    }

    /// The declared `Origin` header, if any.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.headers.get(http::header::ORIGIN).and_then(|v| v.to_str().ok())
    }

    /// The declared `Content-Type` header, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// The response handed back to the transport layer.
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: bytes::Bytes,
}

impl ProxyResponse {
    /// Builds a response with the given status and body and no headers.
    #[must_use]
    pub fn new(status: StatusCode, body: bytes::Bytes) -> Self {
        Self { status, headers: HeaderMap::new(), body }
    }

    /// Inserts a header, replacing any existing value. Invalid values
    /// are dropped rather than panicking; header values here are either
    /// constants or JSON-encoded ASCII.
    pub fn set_header(&mut self, name: http::header::HeaderName, value: &str) {
        if let Ok(value) = http::HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
    }
}
