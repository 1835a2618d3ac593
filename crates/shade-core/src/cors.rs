//! Origin allow-listing and CORS response decoration.
//!
//! The policy is built once at startup from a fixed pattern set plus any
//! configured extras, and is stateless afterwards. Disallowed origins
//! are rejected silently: the response simply carries no CORS grant, and
//! the browser enforces same-origin restrictions on its own.

use crate::types::{InboundRequest, ProxyResponse};
use bytes::Bytes;
use http::{header, Method, StatusCode};

const ALLOWED_METHODS: &str = "GET, HEAD, POST, OPTIONS";

/// Preflight grants are cacheable client-side for a day.
const PREFLIGHT_MAX_AGE: &str = "86400";

/// One origin-matching rule.
#[derive(Debug, Clone)]
pub enum OriginPattern {
    /// The full origin string, byte for byte.
    Exact(String),
    /// An https apex domain and all of its subdomains.
    ApexAndSubdomains(String),
    /// Preview deployments named `<prefix>…<suffix>`.
    PrefixSuffix { prefix: String, suffix: String },
}

impl OriginPattern {
    fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Exact(exact) => origin == exact,
            Self::ApexAndSubdomains(apex) => {
                let Some(host) = origin.strip_prefix("https://") else { return false };
                host == apex || host.ends_with(&format!(".{apex}"))
            }
            Self::PrefixSuffix { prefix, suffix } => {
                origin.starts_with(prefix.as_str())
                    && origin.ends_with(suffix.as_str())
                    && origin.len() > prefix.len() + suffix.len()
            }
        }
    }
}

/// Immutable origin allow-list with preflight synthesis.
pub struct CorsPolicy {
    patterns: Vec<OriginPattern>,
}

impl CorsPolicy {
    /// Builds the policy from the fixed pattern set plus configured
    /// extra exact origins.
    #[must_use]
    pub fn new(extra_origins: &[String]) -> Self {
        let mut patterns = vec![
            OriginPattern::Exact("http://localhost:3000".to_string()),
            OriginPattern::Exact("https://localhost:3000".to_string()),
            OriginPattern::ApexAndSubdomains("daodao.zone".to_string()),
            OriginPattern::PrefixSuffix {
                prefix: "https://dao-dao-".to_string(),
                suffix: ".vercel.app".to_string(),
            },
        ];
        patterns.extend(extra_origins.iter().cloned().map(OriginPattern::Exact));
        Self { patterns }
    }

    /// Tests the declared origin against every pattern.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(origin))
    }

    /// Whether this request should be answered as a CORS preflight.
    #[must_use]
    pub fn is_preflight(request: &InboundRequest) -> bool {
        request.method == Method::OPTIONS
    }

    /// Synthesizes the preflight response.
    ///
    /// A grant requires all of: an `Origin` header, an
    /// `Access-Control-Request-Method` header, an
    /// `Access-Control-Request-Headers` header, and an allowed origin.
    /// Anything less gets an empty body with only an `Allow` header, a
    /// silent rejection rather than an error status.
    #[must_use]
    pub fn preflight(&self, request: &InboundRequest) -> ProxyResponse {
        let mut response = ProxyResponse::new(StatusCode::OK, Bytes::new());

        let origin = request.origin();
        let requested_method = header_str(request, header::ACCESS_CONTROL_REQUEST_METHOD);
        let requested_headers = header_str(request, header::ACCESS_CONTROL_REQUEST_HEADERS);

        match (origin, requested_method, requested_headers) {
            (Some(origin), Some(_), Some(requested)) if self.is_allowed(origin) => {
                response.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
                response.set_header(header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS);
                response.set_header(header::ACCESS_CONTROL_ALLOW_HEADERS, requested);
                response.set_header(header::ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE);
            }
            _ => {
                tracing::debug!(origin = ?origin, "preflight rejected silently");
                response.set_header(header::ALLOW, ALLOWED_METHODS);
            }
        }
        response
    }

    /// Appends the per-origin grant to a built response. Never a
    /// wildcard: the caller's own origin is echoed back, or nothing.
    pub fn decorate(&self, response: &mut ProxyResponse, origin: Option<&str>) {
        if let Some(origin) = origin {
            if self.is_allowed(origin) {
                response.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            }
        }
    }
}

fn header_str<'a>(request: &'a InboundRequest, name: header::HeaderName) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}
