//! Mock origin builder for JSON-RPC proxy testing.
//!
//! Wraps mockito to provide origin-shaped response builders: single RPC
//! answers, batched arrays, and non-RPC HTML pages.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::Value;

/// Builder for mock origin RPC responses.
pub struct OriginMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl OriginMockBuilder {
    /// Creates a builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// Returns the URL of the mock origin.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mocks a single-call forward whose body matches `request` exactly,
    /// expected to be hit `expected_hits` times.
    pub fn mock_single(&mut self, request: &Value, response: &Value, expected_hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::Json(request.clone()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response.to_string())
            .expect(expected_hits)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a re-batched forward: the origin expects a JSON array body
    /// and answers with `responses` verbatim.
    pub fn mock_batch(&mut self, request: &Value, responses: &Value, expected_hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::Json(request.clone()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(responses.to_string())
            .expect(expected_hits)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks any POST with a fixed JSON response, regardless of path or
    /// body.
    pub fn mock_any(&mut self, response: &Value) -> &mut Self {
        let mock = self
            .server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response.to_string())
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a bodiless GET forward with a fixed JSON response.
    pub fn mock_get(&mut self, response: &Value) -> &mut Self {
        let mock = self
            .server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response.to_string())
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a non-RPC HTML answer, the way public RPC hosts serve
    /// documentation landing pages.
    pub fn mock_html(&mut self, html: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(html)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Asserts every registered mock saw its expected hit count.
    pub async fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}
