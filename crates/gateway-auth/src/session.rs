//! Bearer-token session management.

use gateway_core::{
    validate_response, GatewayError, GatewayResult, PostRequest, RequestClient, CONTENT_TYPE_FORM,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Form body of the client-credentials exchange.
const TOKEN_REQUEST_BODY: &str = "response_type=token&grant_type=client_credentials";

/// Auth session configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the token service; `/oauth/token` is appended.
    pub uaa_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Whole-request timeout for the token fetch.
    pub timeout: Duration,
}

/// Token response returned by the UAA.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Holds the current bearer token and knows how to refresh it.
///
/// Tokens carry no tracked expiry; a 401 observed anywhere downstream is
/// classified there and makes the dispatch loop call [`AuthSession::login`]
/// again.
pub struct AuthSession {
    client: Arc<dyn RequestClient>,
    config: AuthConfig,
    token: Option<String>,
}

impl AuthSession {
    /// Create a session with no token yet.
    pub fn new(client: Arc<dyn RequestClient>, config: AuthConfig) -> Self {
        Self {
            client,
            config,
            token: None,
        }
    }

    /// Fetch a fresh access token and store it.
    ///
    /// Raises the classified failure on any non-2xx response or transport
    /// error; retry sequencing is owned by the dispatch loop, never here.
    pub async fn login(&mut self) -> GatewayResult<String> {
        info!("fetching OAuth access token");

        let url = format!(
            "{}/oauth/token",
            self.config.uaa_url.trim_end_matches('/')
        );
        let request = PostRequest::new(
            url,
            TOKEN_REQUEST_BODY,
            CONTENT_TYPE_FORM,
            self.config.timeout,
        )
        .basic_auth(&self.config.client_id, &self.config.client_secret);

        let response = self.client.post(request).await?;
        validate_response(&response)?;

        let parsed: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| GatewayError::Generic(format!("malformed token response: {e}")))?;
        self.token = Some(parsed.access_token.clone());

        info!("got OAuth access token");
        Ok(parsed.access_token)
    }

    /// The current bearer token, if a login has succeeded.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Drop the stored token.
    pub fn invalidate(&mut self) {
        self.token = None;
    }
}
