//! HTTP request client.

use async_trait::async_trait;
use gateway_core::{GatewayError, GatewayResult, HttpResponse, PostRequest, RequestClient};
use reqwest::Client;
use tracing::debug;

/// Request client backed by a shared reqwest connection pool.
pub struct HttpRequestClient {
    client: Client,
}

impl HttpRequestClient {
    /// Create a new request client.
    pub fn new() -> GatewayResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| GatewayError::Generic(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RequestClient for HttpRequestClient {
    async fn post(&self, request: PostRequest) -> GatewayResult<HttpResponse> {
        debug!(url = %request.url, "issuing POST request");

        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .header("Content-Type", request.content_type.as_str())
            .body(request.body);

        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder.send().await.map_err(classify_transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_transport_error)?;

        Ok(HttpResponse { status, body })
    }
}

/// Map a reqwest transport failure into the gateway classification.
///
/// Certificate/TLS problems will not fix themselves on retry, so they are
/// reported as generic (fatal) rather than as a connection error.
fn classify_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        return GatewayError::Timeout;
    }
    let description = full_chain(&err);
    let lowered = description.to_ascii_lowercase();
    if lowered.contains("certificate") || lowered.contains("tls") {
        GatewayError::Generic(description)
    } else {
        GatewayError::Connection(description)
    }
}

/// Flatten an error and its sources into one message.
fn full_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
