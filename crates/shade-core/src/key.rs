//! Cache key derivation.
//!
//! Turns an RPC call body into a canonical, content-addressed cache key.
//! The JSON-RPC `id` field is a correlation id chosen by the caller; two
//! callers asking for the same method and params must land on the same
//! cache entry, so `id` is rewritten to a fixed sentinel before hashing.
//!
//! The digest is `ahash` — fast and non-cryptographic. Collision
//! resistance is not a security requirement here: the payload space is
//! small and the cost of a rare collision is a stale cache hit inside a
//! one-second TTL window.

use ahash::AHasher;
use serde_json::Value;
use std::{
    borrow::Cow,
    hash::{Hash, Hasher},
};

/// Sentinel written over the `id` field before hashing.
const ID_SENTINEL: i64 = -1;

/// Derives the cache key for one call body under the given request path.
///
/// If `body` parses as a JSON object containing an `id` field, the object
/// is cloned with `id` rewritten to the sentinel and re-serialized before
/// hashing; any other body (arrays, scalars, non-JSON text, the empty
/// string) is hashed verbatim. The empty body still yields a valid,
/// distinct key, so bodiless GET-style calls are cacheable too.
///
/// The returned key is `path` followed by the hex digest. The store is
/// addressed purely by this string; request method and headers never
/// affect key identity.
#[must_use]
pub fn derive_key(path: &str, body: &str) -> String {
    let normalized = normalize_body(body);
    let mut hasher = AHasher::default();
    normalized.as_bytes().hash(&mut hasher);
    format!("{path}{:016x}", hasher.finish())
}

/// Rewrites the `id` field to the sentinel, when present.
///
/// Re-serialization through `serde_json::Map` also sorts object keys, so
/// two bodies differing only in top-level key order normalize alike.
fn normalize_body(body: &str) -> Cow<'_, str> {
    if body.is_empty() {
        return Cow::Borrowed(body);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut object)) if object.contains_key("id") => {
            object.insert("id".to_string(), Value::from(ID_SENTINEL));
            match serde_json::to_string(&object) {
                Ok(rewritten) => Cow::Owned(rewritten),
                // Re-serialization of a just-parsed value cannot fail in
                // practice; fall back to the raw body.
                Err(_) => Cow::Borrowed(body),
            }
        }
        _ => Cow::Borrowed(body),
    }
}
