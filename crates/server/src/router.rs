//! HTTP routing and the transport adapter around the proxy engine.
//!
//! Every path except `/health` is forwarded into the engine, since the
//! origin path is part of cache key identity and clients address
//! arbitrary RPC paths through the proxy.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use http::StatusCode;
use serde_json::json;
use shade_core::{engine::ProxyEngine, types::InboundRequest};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer};

/// Shared server state.
pub struct AppState {
    pub engine: ProxyEngine,
    pub origin_base_url: String,
}

/// Builds the application router with its middleware stack.
pub fn create_app(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .fallback(handle_proxy)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CompressionLayer::new())
}

/// Liveness endpoint reporting the configured origin and cache size.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "origin": state.origin_base_url,
        "cache_entries": state.engine.cache_entry_count(),
    }))
}

/// Adapts one transport request into the engine and back.
pub async fn handle_proxy(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path_and_query().map_or("/", |pq| pq.as_str()).to_string();

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return (
                StatusCode::OK,
                [("content-type", "text/plain; charset=utf-8")],
                "Failed to read request body",
            )
                .into_response();
        }
    };

    // Opaque payloads are treated as text downstream; lossy conversion
    // only affects non-UTF8 bodies, which are never valid JSON-RPC.
    let body = if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&bytes).into_owned())
    };

    let inbound = InboundRequest::new(parts.method, path, parts.headers, body);
    let proxied = state.engine.handle(inbound).await;

    let mut response = Response::builder().status(proxied.status);
    if let Some(headers) = response.headers_mut() {
        headers.extend(proxied.headers);
    }
    response.body(Body::from(proxied.body)).map_or_else(
        |e| {
            tracing::error!(error = %e, "failed to build response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
        |response| response,
    )
}
