//! Request context with typed parameters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use http::Method;

use crate::cache::DataCache;
use crate::lifecycle::TimingContext;

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

        Self(format!("{:x}-{:04x}", nanos, seq & 0xffff))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracted route parameters (e.g., `:id` from `/agents/:id`).
pub type RouteParams = HashMap<String, String>;

/// Query string parameters.
pub type QueryParams = HashMap<String, String>;

/// HTTP headers.
pub type Headers = HashMap<String, String>;

/// Per-request context.
///
/// Created when a request enters the pipeline and dropped when the response
/// ends. It exclusively owns the request's `DataCache`; nothing in here is
/// shared with other in-flight requests.
#[derive(Debug)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Query string parameters.
    pub query: QueryParams,
    /// HTTP headers.
    pub headers: Headers,
    /// Active data cache for this request.
    pub cache: DataCache,
    /// Serialized data payload, filled in at dehydration time.
    pub dehydrated: Option<String>,
    /// Redirect target recorded by a component during render.
    pub redirect: Option<String>,
    /// Timing context for observability.
    pub timing: TimingContext,
}

impl RequestContext {
    /// Create a new request context.
    ///
    /// `target` may carry a query string (`/jobs?status=open`); it is split
    /// off and decoded into `query`.
    pub fn new(method: Method, target: impl AsRef<str>) -> Self {
        let (path, query) = split_target(target.as_ref());

        Self {
            request_id: RequestId::generate(),
            method,
            path,
            query,
            headers: HashMap::new(),
            cache: DataCache::new(),
            dehydrated: None,
            redirect: None,
            timing: TimingContext::new(),
        }
    }

    /// Create a GET request context.
    pub fn get(target: impl AsRef<str>) -> Self {
        Self::new(Method::GET, target)
    }

    /// Use an existing request ID (e.g. from an `x-request-id` header).
    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = id;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Read-only view handed to components during render.
    pub fn info(&self) -> RequestInfo {
        RequestInfo {
            request_id: self.request_id.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
        }
    }
}

/// The slice of a request that components may observe.
///
/// Present only when rendering on the server; components branch on its
/// presence instead of probing for an ambient environment.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub request_id: RequestId,
    pub path: String,
    pub query: QueryParams,
}

/// Split a request target into its path and decoded query parameters.
pub fn split_target(target: &str) -> (String, QueryParams) {
    let (path, raw_query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };

    let path = if path.is_empty() { "/" } else { path };

    let query = raw_query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(pair), String::new()),
        })
        .collect();

    (path.to_string(), query)
}

/// Decode `%XX` escapes and `+` in a query component.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
