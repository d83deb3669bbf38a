//! Transport traits and HTTP response validation.
//!
//! The dispatchers are written against these traits so the delivery logic
//! can be exercised without a network. The production implementations live
//! in `gateway-http` and `gateway-stream`.

use crate::{GatewayError, GatewayResult};
use async_trait::async_trait;
use std::time::Duration;

/// Content type for JSON request bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type for form-encoded request bodies.
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// A prepared POST exchange.
#[derive(Debug, Clone)]
pub struct PostRequest {
    /// Full request URL.
    pub url: String,
    /// Additional request headers.
    pub headers: Vec<(String, String)>,
    /// Request body, already encoded.
    pub body: String,
    /// Content type of `body`.
    pub content_type: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// HTTP basic auth credentials, if the endpoint requires them.
    pub basic_auth: Option<(String, String)>,
}

impl PostRequest {
    /// A request with no extra headers and no basic auth.
    pub fn new(
        url: impl Into<String>,
        body: impl Into<String>,
        content_type: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body: body.into(),
            content_type: content_type.to_string(),
            timeout,
            basic_auth: None,
        }
    }

    /// Attach a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Attach basic auth credentials.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }
}

/// A completed HTTP exchange.
///
/// Only exchanges that produced a status line make it here; transport-level
/// failures are raised as classified errors by the client instead.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

/// Request/response client used for the token fetch and asset submission.
#[async_trait]
pub trait RequestClient: Send + Sync {
    /// Issue one POST and return the response.
    ///
    /// Transport failures are classified before they surface: expiry of the
    /// request timeout as [`GatewayError::Timeout`], other network-level
    /// failures as [`GatewayError::Connection`].
    async fn post(&self, request: PostRequest) -> GatewayResult<HttpResponse>;
}

/// Persistent bidirectional text-frame connection to the ingest service.
#[async_trait]
pub trait TextStream: Send {
    /// Send one text frame. Blocks up to the configured send timeout.
    async fn send_text(&mut self, text: &str) -> GatewayResult<()>;

    /// Receive one text frame. Blocks up to the configured receive timeout.
    async fn receive_text(&mut self) -> GatewayResult<String>;
}

/// Opens streaming connections to the ingest service.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// The stream type this connector produces.
    type Stream: TextStream;

    /// Open a connection authorized with `bearer_token`.
    ///
    /// An authorization rejection at upgrade time is raised as
    /// [`GatewayError::InvalidToken`], distinct from other connect failures.
    async fn connect(&self, bearer_token: &str) -> GatewayResult<Self::Stream>;
}

/// Reduce a completed HTTP exchange to Ok or a classified failure.
pub fn validate_response(response: &HttpResponse) -> GatewayResult<()> {
    match response.status {
        200..=299 => Ok(()),
        401 | 403 => Err(GatewayError::InvalidCredentials),
        400..=499 => Err(GatewayError::InvalidRequest(format!(
            "HTTP {}: {}",
            response.status,
            truncated(&response.body)
        ))),
        500..=599 => Err(GatewayError::ServerError(response.status)),
        status => Err(GatewayError::Generic(format!(
            "unexpected HTTP status {status}"
        ))),
    }
}

/// Cap response bodies quoted into error messages.
fn truncated(body: &str) -> &str {
    let limit = 200;
    match body.char_indices().nth(limit) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
