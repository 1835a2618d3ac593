//! Inbound payload splitting.
//!
//! Normalizes one transport request into an ordered sequence of
//! [`RpcCall`]s: a JSON array becomes one call per element, anything else
//! becomes a single call. The splitter works on the owned body copy held
//! by [`InboundRequest`](crate::types::InboundRequest), so the original
//! method and headers stay available for upstream forwarding.

use crate::{errors::ProxyError, types::RpcCall};
use serde_json::Value;

/// The split payload plus the shape of the inbound body, needed later to
/// mirror batch/non-batch shape in the response.
#[derive(Debug)]
pub struct SplitPayload {
    pub calls: Vec<RpcCall>,
    /// `true` iff the inbound body was a JSON array.
    pub was_batch: bool,
}

/// Splits an inbound body into individual RPC calls.
///
/// - JSON content type, array body: one call per element, each
///   re-serialized individually, indices following array order.
/// - JSON content type, non-array body: exactly one call wrapping the
///   whole value, keeping the original body text.
/// - Non-JSON content type or absent body: exactly one opaque call whose
///   `parsed` is `None` (covers GET requests with no body).
///
/// # Errors
///
/// Returns [`ProxyError::MalformedBody`] when a JSON-declared body fails
/// to parse.
pub fn split(content_type: Option<&str>, body: Option<&str>) -> Result<SplitPayload, ProxyError> {
    let Some(body) = body else {
        return Ok(SplitPayload { calls: vec![RpcCall::opaque(String::new(), 0)], was_batch: false });
    };

    if !is_json(content_type) {
        return Ok(SplitPayload {
            calls: vec![RpcCall::opaque(body.to_string(), 0)],
            was_batch: false,
        });
    }

    let value: Value = serde_json::from_str(body)?;
    match value {
        Value::Array(items) => {
            let calls = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    let raw = serde_json::to_string(&item)?;
                    Ok(RpcCall::new(raw, item, index))
                })
                .collect::<Result<Vec<_>, ProxyError>>()?;
            Ok(SplitPayload { calls, was_batch: true })
        }
        single => Ok(SplitPayload {
            calls: vec![RpcCall::new(body.to_string(), single, 0)],
            was_batch: false,
        }),
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
}
