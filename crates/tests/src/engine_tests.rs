//! End-to-end pipeline tests against a mock origin.

use crate::mock_infrastructure::OriginMockBuilder;
use http::{header, HeaderMap, Method, StatusCode};
use serde_json::{json, Value};
use shade_core::{config::AppConfig, engine::ProxyEngine, types::InboundRequest};
use std::time::Duration;

fn engine_for(origin_url: &str, ttl_seconds: u64) -> ProxyEngine {
    let mut config = AppConfig::default();
    config.origin.base_url = origin_url.to_string();
    config.origin.timeout_seconds = 5;
    config.cache.ttl_seconds = ttl_seconds;
    ProxyEngine::new(&config).expect("engine construction")
}

fn post(body: &str) -> InboundRequest {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
    InboundRequest::new(Method::POST, "/".to_string(), headers, Some(body.to_string()))
}

fn post_from(body: &str, origin: &str) -> InboundRequest {
    let mut request = post(body);
    request.headers.insert(header::ORIGIN, origin.parse().unwrap());
    request
}

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("JSON response body")
}

fn cached_header(response: &shade_core::types::ProxyResponse) -> Option<&str> {
    response.headers.get("cached").and_then(|v| v.to_str().ok())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_call_miss_then_hit_across_ids() {
    let mut origin = OriginMockBuilder::new().await;
    let call = json!({"jsonrpc": "2.0", "method": "status", "params": [], "id": 1});
    let answer = json!({"jsonrpc": "2.0", "result": {"sync": false}, "id": 1});
    origin.mock_single(&call, &answer, 1);

    let engine = engine_for(&origin.url(), 60);

    let first = engine.handle(post(&call.to_string())).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(cached_header(&first), Some("false"));
    assert_eq!(body_json(&first.body), answer);

    // Same method and params, different correlation id: must be served
    // from cache without touching the origin again.
    let probe = json!({"jsonrpc": "2.0", "method": "status", "params": [], "id": "other"});
    let second = engine.handle(post(&probe.to_string())).await;
    assert_eq!(cached_header(&second), Some("true"));
    assert_eq!(body_json(&second.body), answer);

    origin.assert_all().await;
}

#[tokio::test]
async fn test_batch_preserves_shape_and_order() {
    let mut origin = OriginMockBuilder::new().await;
    let calls = json!([
        {"jsonrpc": "2.0", "method": "status", "id": 1},
        {"jsonrpc": "2.0", "method": "block", "params": ["7"], "id": 2},
    ]);
    let answers = json!([
        {"jsonrpc": "2.0", "result": "up", "id": 1},
        {"jsonrpc": "2.0", "result": "0x7", "id": 2},
    ]);
    origin.mock_batch(&calls, &answers, 1);

    let engine = engine_for(&origin.url(), 60);
    let response = engine.handle(post(&calls.to_string())).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(cached_header(&response), Some("[]"));
    let body = body_json(&response.body);
    let array = body.as_array().expect("batch response is an array");
    assert_eq!(array.len(), 2);
    assert_eq!(array[0]["result"], "up");
    assert_eq!(array[1]["result"], "0x7");

    origin.assert_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_partially_cached_batch_forwards_sole_miss_unbatched() {
    let mut origin = OriginMockBuilder::new().await;
    let status = json!({"jsonrpc": "2.0", "method": "status", "id": 1});
    let status_answer = json!({"jsonrpc": "2.0", "result": "up", "id": 1});
    let block = json!({"jsonrpc": "2.0", "method": "block", "params": ["9"], "id": 2});
    let block_answer = json!({"jsonrpc": "2.0", "result": "0x9", "id": 2});

    // The status call is warmed first; the later batch must forward only
    // the block call, as a bare object rather than an array of one.
    origin.mock_single(&status, &status_answer, 1);
    origin.mock_single(&block, &block_answer, 1);

    let engine = engine_for(&origin.url(), 60);
    engine.handle(post(&status.to_string())).await;

    let batch = json!([
        {"jsonrpc": "2.0", "method": "status", "id": 41},
        block,
    ]);
    let response = engine.handle(post(&batch.to_string())).await;

    assert_eq!(cached_header(&response), Some("[0]"));
    let body = body_json(&response.body);
    let array = body.as_array().expect("batch response is an array");
    assert_eq!(array.len(), 2);
    assert_eq!(array[0], status_answer);
    assert_eq!(array[1], block_answer);

    origin.assert_all().await;
}

#[tokio::test]
async fn test_count_mismatch_fails_whole_request_without_cache_writes() {
    let mut origin = OriginMockBuilder::new().await;
    let batch = json!([
        {"jsonrpc": "2.0", "method": "status", "id": 1},
        {"jsonrpc": "2.0", "method": "block", "id": 2},
    ]);
    // Origin misbehaves: one result for two dispatched calls. Expected
    // twice, proving the failed batch left nothing in the cache.
    origin.mock_batch(&batch, &json!([{"result": "only"}]), 2);

    let engine = engine_for(&origin.url(), 60);

    let first = engine.handle(post(&batch.to_string())).await;
    assert_eq!(first.status, StatusCode::OK);
    let text = String::from_utf8_lossy(&first.body).into_owned();
    assert!(text.contains("Count mismatch"), "got: {text}");
    assert!(cached_header(&first).is_none());

    let second = engine.handle(post(&batch.to_string())).await;
    let text = String::from_utf8_lossy(&second.body).into_owned();
    assert!(text.contains("Count mismatch"));

    origin.assert_all().await;
}

#[tokio::test]
async fn test_html_origin_response_passes_through_uncached() {
    let mut origin = OriginMockBuilder::new().await;
    let html = "<html><body>RPC endpoint docs</body></html>";
    origin.mock_html(html);

    let engine = engine_for(&origin.url(), 60);
    let call = json!({"jsonrpc": "2.0", "method": "status", "id": 1}).to_string();

    for _ in 0..2 {
        let response = engine.handle(post(&call)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], html.as_bytes());
        assert!(
            response
                .headers
                .get(header::CONTENT_TYPE)
                .is_some_and(|ct| ct.to_str().unwrap_or("").contains("text/html")),
        );
        assert!(cached_header(&response).is_none(), "passthrough skips cache reporting");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ttl_expiry_observed_through_cached_header() {
    let mut origin = OriginMockBuilder::new().await;
    origin.mock_any(&json!({"jsonrpc": "2.0", "result": "up", "id": 1}));

    let engine = engine_for(&origin.url(), 1);
    let call = json!({"jsonrpc": "2.0", "method": "status", "id": 1}).to_string();

    let miss = engine.handle(post(&call)).await;
    assert_eq!(cached_header(&miss), Some("false"));

    let hit = engine.handle(post(&call)).await;
    assert_eq!(cached_header(&hit), Some("true"), "hit within the TTL window");

    tokio::time::sleep(Duration::from_millis(1300)).await;
    let expired = engine.handle(post(&call)).await;
    assert_eq!(cached_header(&expired), Some("false"), "miss after the TTL elapses");
}

#[tokio::test]
async fn test_empty_batch_answered_without_origin_call() {
    // No mocks registered: any origin hit would answer 501 and fail the
    // request with a diagnostic instead of an empty array.
    let origin = OriginMockBuilder::new().await;
    let engine = engine_for(&origin.url(), 60);

    let response = engine.handle(post("[]")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(body_json(&response.body), json!([]));
    assert_eq!(cached_header(&response), Some("[]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bodiless_get_is_cacheable() {
    let mut origin = OriginMockBuilder::new().await;
    origin.mock_get(&json!({"result": {"node_info": {}}}));

    let engine = engine_for(&origin.url(), 60);
    let request = || {
        InboundRequest::new(Method::GET, "/".to_string(), HeaderMap::new(), None)
    };

    let miss = engine.handle(request()).await;
    assert_eq!(cached_header(&miss), Some("false"));

    let hit = engine.handle(request()).await;
    assert_eq!(cached_header(&hit), Some("true"));
}

#[tokio::test]
async fn test_cors_gating_on_proxied_responses() {
    let mut origin = OriginMockBuilder::new().await;
    origin.mock_any(&json!({"result": "up", "id": 1}));

    let engine = engine_for(&origin.url(), 60);
    let call = json!({"jsonrpc": "2.0", "method": "status", "id": 1}).to_string();

    let allowed = engine.handle(post_from(&call, "https://app.daodao.zone")).await;
    assert_eq!(
        allowed.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://app.daodao.zone"
    );

    let denied = engine.handle(post_from(&call, "https://evil.example")).await;
    assert!(denied.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_paths_partition_the_cache() {
    let mut origin = OriginMockBuilder::new().await;
    origin.mock_any(&json!({"result": "up"}));

    let engine = engine_for(&origin.url(), 60);
    let call = json!({"jsonrpc": "2.0", "method": "status", "id": 1}).to_string();

    let warm = engine.handle(post(&call)).await;
    assert_eq!(cached_header(&warm), Some("false"));

    // Same body, different path: distinct cache identity.
    let mut other_path = post(&call);
    other_path.path = "/other".to_string();
    let response = engine.handle(other_path).await;
    assert_eq!(cached_header(&response), Some("false"));
}
