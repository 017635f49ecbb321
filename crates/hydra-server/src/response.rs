//! Response head and summary types.

use std::time::Duration;

use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use hydra_core::RequestId;
use tracing::warn;

/// Request id response header.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A fully assembled response, ready to write.
#[derive(Debug, Clone)]
pub struct PreparedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
    /// Whether the render failed and the body carries fallback markup.
    pub degraded: bool,
}

impl PreparedResponse {
    /// HTML response.
    pub fn html(status: StatusCode, request_id: &RequestId, body: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
        insert_request_id(&mut headers, request_id);
        Self {
            status,
            headers,
            body,
            degraded: false,
        }
    }

    /// Redirect response. `None` if `location` is not a valid header value.
    pub fn redirect(location: &str, request_id: &RequestId) -> Option<Self> {
        let value = HeaderValue::from_str(location).ok()?;
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, value);
        insert_request_id(&mut headers, request_id);
        Some(Self {
            status: StatusCode::FOUND,
            headers,
            body: String::new(),
            degraded: false,
        })
    }

    /// Redirect target, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Content type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

fn insert_request_id(headers: &mut HeaderMap, request_id: &RequestId) {
    match HeaderValue::from_str(&request_id.0) {
        Ok(value) => {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        Err(_) => warn!(request_id = %request_id, "Request id is not a valid header value"),
    }
}

/// How the response body ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Every byte was written and the response ended.
    Completed,
    /// The transport failed; remaining writes were dropped.
    Aborted(String),
}

/// What happened to one request.
#[derive(Debug, Clone)]
pub struct ResponseSummary {
    pub request_id: RequestId,
    pub status: StatusCode,
    pub bytes_written: usize,
    pub writes: usize,
    pub outcome: ResponseOutcome,
    pub degraded: bool,
    /// Lifecycle marks relative to request start.
    pub timings: Vec<(String, Duration)>,
}

impl ResponseSummary {
    /// Whether the response ended normally.
    pub fn is_complete(&self) -> bool {
        self.outcome == ResponseOutcome::Completed
    }

    /// Time from request start to a lifecycle mark.
    pub fn timing(&self, mark: &str) -> Option<Duration> {
        self.timings
            .iter()
            .find(|(name, _)| name == mark)
            .map(|(_, d)| *d)
    }
}
