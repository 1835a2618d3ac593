//! Request pipeline orchestration.
//!
//! One engine instance serves the whole process. Per request the flow is
//! split, resolve, dispatch misses, assemble, then CORS decoration. The
//! engine is also the failure boundary: every pipeline error becomes a
//! plain-text diagnostic response with a success status, so the edge
//! never answers with a hard crash or a protocol violation.

use crate::{
    assembler::ResponseAssembler,
    config::AppConfig,
    cors::CorsPolicy,
    errors::{ProxyError, UpstreamError},
    resolver::BatchCacheResolver,
    splitter,
    store::{CacheStore, MemoryStore},
    types::{InboundRequest, ProxyResponse},
    upstream::{DispatchOutcome, UpstreamDispatcher},
};
use http::{header, StatusCode};
use std::sync::Arc;

/// The caching proxy pipeline.
///
/// Holds no per-request state; safe to share behind an `Arc` across all
/// server tasks.
pub struct ProxyEngine {
    resolver: BatchCacheResolver,
    dispatcher: UpstreamDispatcher,
    assembler: ResponseAssembler,
    cors: CorsPolicy,
    store: Arc<MemoryStore>,
}

impl ProxyEngine {
    /// Wires the pipeline up from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::ConnectionFailed`] if the origin HTTP
    /// client cannot be built.
    pub fn new(config: &AppConfig) -> Result<Self, UpstreamError> {
        let store = Arc::new(MemoryStore::new(config.cache.max_entries));
        let shared: Arc<dyn CacheStore> = Arc::clone(&store) as _;

        Ok(Self {
            resolver: BatchCacheResolver::new(Arc::clone(&shared)),
            dispatcher: UpstreamDispatcher::new(&config.origin.base_url, config.origin_timeout())?,
            assembler: ResponseAssembler::new(shared, config.cache_ttl()),
            cors: CorsPolicy::new(&config.cors.extra_allowed_origins),
            store,
        })
    }

    /// Handles one inbound request end to end. Never returns an error:
    /// pipeline failures are converted into diagnostic responses here.
    pub async fn handle(&self, request: InboundRequest) -> ProxyResponse {
        if CorsPolicy::is_preflight(&request) {
            return self.cors.preflight(&request);
        }

        let origin = request.origin().map(str::to_string);
        let mut response = match self.process(&request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(error = %error, path = %request.path, "request failed, answering with diagnostic");
                diagnostic(&error)
            }
        };

        self.cors.decorate(&mut response, origin.as_deref());
        response
    }

    /// Approximate number of live cache entries, for health reporting.
    #[must_use]
    pub fn cache_entry_count(&self) -> u64 {
        self.store.entry_count()
    }

    async fn process(&self, request: &InboundRequest) -> Result<ProxyResponse, ProxyError> {
        let payload = splitter::split(request.content_type(), request.body.as_deref())?;
        let context = self.resolver.resolve(&request.path, payload.calls, payload.was_batch).await;

        tracing::debug!(
            calls = context.len(),
            hits = context.hit_indices().len(),
            was_batch = context.was_batch(),
            "resolved batch against cache"
        );

        let missed = context.missed_calls();
        match self.dispatcher.dispatch(request, &missed).await? {
            DispatchOutcome::Results(results) => {
                self.assembler.assemble(context, &request.path, results)
            }
            DispatchOutcome::Passthrough(passthrough) => {
                let status = StatusCode::from_u16(passthrough.status)
                    .unwrap_or(StatusCode::OK);
                let mut response = ProxyResponse::new(status, passthrough.body);
                response.set_header(header::CONTENT_TYPE, &passthrough.content_type);
                Ok(response)
            }
        }
    }
}

/// Builds the best-effort plain-text diagnostic for a failed request.
/// Success status on purpose: the caller gets a readable description
/// instead of silence, and the edge instance keeps serving.
fn diagnostic(error: &ProxyError) -> ProxyResponse {
    let mut response =
        ProxyResponse::new(StatusCode::OK, bytes::Bytes::from(error.to_string()));
    response.set_header(header::CONTENT_TYPE, "text/plain; charset=utf-8");
    response
}
