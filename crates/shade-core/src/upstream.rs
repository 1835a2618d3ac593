//! Origin forwarding for cache misses.
//!
//! The dispatcher sends the uncached subset of a batch to the origin as
//! either a verbatim single-call passthrough or one re-batched JSON array
//! call, then validates that the origin's answer lines up positionally
//! with what was sent. There is no retry here: any transport or
//! validation failure fails the whole miss set and the request with it.

use crate::{
    errors::UpstreamError,
    types::{InboundRequest, RpcCall},
};
use http::{header, HeaderMap};
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;

/// Headers never copied to the origin request. Hop-by-hop headers and
/// lengths must be recomputed by the transport, not forwarded.
const EXCLUDED_HEADERS: &[header::HeaderName] = &[
    header::HOST,
    header::CONTENT_LENGTH,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::ACCEPT_ENCODING,
];

/// Outcome of forwarding the miss set.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// One JSON value per missed call, in dispatch order. Empty when no
    /// calls were missed.
    Results(Vec<Value>),
    /// The origin answered a single passthrough with HTML (e.g. a
    /// documentation landing page). Returned to the caller verbatim,
    /// bypassing caching and assembly.
    Passthrough(PassthroughResponse),
}

/// A verbatim non-RPC origin response.
#[derive(Debug)]
pub struct PassthroughResponse {
    pub status: u16,
    pub content_type: String,
    pub body: bytes::Bytes,
}

/// Forwards uncached calls to the origin RPC service.
pub struct UpstreamDispatcher {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl UpstreamDispatcher {
    /// Builds the dispatcher with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::ConnectionFailed`] if the underlying
    /// reqwest client fails to build.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build origin http client");
                UpstreamError::ConnectionFailed("HTTP client build failed".to_string())
            })?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), timeout })
    }

    /// Forwards the missed calls and returns their results in order.
    ///
    /// - Empty miss set: no origin call is made.
    /// - Exactly one miss: the original request is forwarded with that
    ///   call's raw body (or no body if the inbound had none); an HTML
    ///   origin response short-circuits as [`DispatchOutcome::Passthrough`].
    /// - More than one miss: a single re-batched request whose body is a
    ///   JSON array of the missed calls' parsed values, order preserved.
    ///
    /// Position `i` of the origin's array is taken to correspond to
    /// missed call `i`; standard JSON-RPC batch semantics are trusted to
    /// preserve order, and out-of-order origins are not detected.
    ///
    /// # Errors
    ///
    /// Fails the whole miss set on network errors, non-2xx statuses,
    /// non-array batch responses ([`UpstreamError::ShapeMismatch`]) and
    /// length disagreements ([`UpstreamError::CountMismatch`]). Partial
    /// success is never returned.
    pub async fn dispatch(
        &self,
        inbound: &InboundRequest,
        missed: &[&RpcCall],
    ) -> Result<DispatchOutcome, UpstreamError> {
        match missed {
            [] => Ok(DispatchOutcome::Results(Vec::new())),
            [only] => self.forward_single(inbound, only).await,
            many => self.forward_batch(inbound, many).await,
        }
    }

    async fn forward_single(
        &self,
        inbound: &InboundRequest,
        call: &RpcCall,
    ) -> Result<DispatchOutcome, UpstreamError> {
        let url = format!("{}{}", self.base_url, inbound.path);
        let mut request = self
            .client
            .request(inbound.method.clone(), &url)
            .headers(passthrough_headers(&inbound.headers))
            .timeout(self.timeout);

        if inbound.body.is_some() {
            request = request.body(call.raw_body.clone());
        }

        tracing::debug!(url = %url, "forwarding single call to origin");
        let response = request.send().await.map_err(|e| UpstreamError::from_network(&e))?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Non-RPC responses (landing pages and the like) are passed
        // through verbatim, never cached, never batch-wrapped.
        if content_type.to_ascii_lowercase().contains("text/html") {
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(|e| UpstreamError::from_network(&e))?;
            tracing::debug!(status, "origin answered html, passing through");
            return Ok(DispatchOutcome::Passthrough(PassthroughResponse {
                status,
                content_type,
                body,
            }));
        }

        let value = read_json_body(response).await?;
        Ok(DispatchOutcome::Results(vec![value]))
    }

    async fn forward_batch(
        &self,
        inbound: &InboundRequest,
        missed: &[&RpcCall],
    ) -> Result<DispatchOutcome, UpstreamError> {
        let rebatched: Vec<Value> =
            missed.iter().map(|call| call.parsed.clone().unwrap_or(Value::Null)).collect();
        let body = serde_json::to_string(&rebatched)
            .map_err(|e| UpstreamError::InvalidResponse(format!("rebatch serialization: {e}")))?;

        let url = format!("{}{}", self.base_url, inbound.path);
        tracing::debug!(url = %url, misses = missed.len(), "re-batching misses to origin");

        let response = self
            .client
            .request(inbound.method.clone(), &url)
            .headers(batch_headers(&inbound.headers))
            .body(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::from_network(&e))?;

        let value = read_json_body(response).await?;
        let Value::Array(results) = value else {
            return Err(UpstreamError::ShapeMismatch(
                "origin batch response is not an array".to_string(),
            ));
        };

        if results.len() != missed.len() {
            return Err(UpstreamError::CountMismatch {
                expected: missed.len(),
                actual: results.len(),
            });
        }

        Ok(DispatchOutcome::Results(results))
    }
}

/// Checks the status and parses the origin body as JSON.
async fn read_json_body(response: reqwest::Response) -> Result<Value, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(UpstreamError::HttpStatus(status.as_u16(), truncate_text(&text, 256)));
    }

    let bytes = response.bytes().await.map_err(|e| UpstreamError::from_network(&e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| UpstreamError::InvalidResponse(format!("origin body is not JSON: {e}")))
}

/// Caps a diagnostic body at roughly `limit` bytes, backing up to the
/// nearest char boundary so multibyte content never splits.
fn truncate_text(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Copies inbound headers for origin forwarding, minus the exclusion
/// list.
fn passthrough_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in inbound {
        if !EXCLUDED_HEADERS.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// Headers for a re-batched origin request. The body is rebuilt here,
/// so `Content-Type` is replaced outright; a second value would make it
/// a malformed singleton field.
fn batch_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = passthrough_headers(inbound);
    headers.insert(header::CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
    headers
}
