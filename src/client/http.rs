//! Reqwest-based HTTP client for the translator service.
//!
//! The raw transport sits behind the [`Transport`] trait so the manager's
//! retry logic and request shaping can be exercised without a network.

use crate::config::PdfGateConfig;
use crate::errors::PdfGateError;
use crate::protocol::models::{
    error_detail, ServiceHealth, TokenGrant, TokenRequest, TokenResponse,
};
use crate::token::TokenExchange;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

/// Captured HTTP response: status plus raw body.
#[derive(Debug, Clone)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpReply {
    /// Get the body as a UTF-8 string.
    pub fn body_str(&self) -> Result<&str, PdfGateError> {
        std::str::from_utf8(&self.body)
            .map_err(|e| PdfGateError::ProtocolError(format!("Invalid UTF-8 in body: {}", e)))
    }

    /// Whether the status code indicates success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP seam: JSON POST with optional bearer auth, and plain GET.
pub trait Transport: Send + Sync {
    /// POST a JSON body, returning status and raw body for any status code.
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<HttpReply, PdfGateError>;

    /// GET a URL, returning status and raw body.
    fn get(&self, url: &str) -> Result<HttpReply, PdfGateError>;
}

/// Blocking reqwest transport.
pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    /// Create a transport from config with a 30-second request timeout.
    pub fn new(config: &PdfGateConfig) -> Result<Self, PdfGateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PdfGateError::Transport(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: build_user_agent(config),
        })
    }

    fn capture(response: reqwest::blocking::Response) -> Result<HttpReply, PdfGateError> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| PdfGateError::Transport(format!("Failed to read body: {}", e)))?
            .to_vec();
        Ok(HttpReply { status, body })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<HttpReply, PdfGateError> {
        let mut request = self
            .client
            .post(url)
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/json")
            .json(body);

        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| PdfGateError::Transport(format!("Request failed: {}", e)))?;

        Self::capture(response)
    }

    fn get(&self, url: &str) -> Result<HttpReply, PdfGateError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(|e| PdfGateError::Transport(format!("Request failed: {}", e)))?;

        Self::capture(response)
    }
}

/// Typed client for the translator service endpoints.
pub struct ApiClient {
    transport: Box<dyn Transport>,
    base_url: String,
}

impl ApiClient {
    /// Create a client against the given base URL.
    pub fn new(base_url: String, config: &PdfGateConfig) -> Result<Self, PdfGateError> {
        Ok(Self {
            transport: Box::new(HttpTransport::new(config)?),
            base_url: normalize_base(base_url),
        })
    }

    /// Create a client over a custom transport (for tests).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn with_transport(base_url: String, transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: normalize_base(base_url),
        }
    }

    /// The base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body to a path under the base URL.
    pub fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<HttpReply, PdfGateError> {
        let url = format!("{}{}", self.base_url, path);
        self.transport.post_json(&url, body, bearer)
    }

    /// Probe the service health endpoint.
    pub fn health(&self) -> Result<ServiceHealth, PdfGateError> {
        let url = format!("{}/health", self.base_url);
        let reply = self.transport.get(&url)?;
        if !reply.is_success() {
            return Err(reply_error(&reply));
        }
        serde_json::from_slice(&reply.body)
            .map_err(|e| PdfGateError::ProtocolError(format!("Health parse error: {}", e)))
    }
}

impl TokenExchange for ApiClient {
    fn exchange_token(
        &self,
        master_key: &str,
        client_id: Option<&str>,
    ) -> Result<TokenGrant, PdfGateError> {
        let body = serde_json::to_value(TokenRequest {
            master_key,
            client_id,
        })
        .map_err(|e| PdfGateError::ProtocolError(format!("Failed to serialize: {}", e)))?;

        let reply = self.post("/auth/token", &body, None)?;

        if !reply.is_success() {
            let detail = error_detail(&reply.body)
                .unwrap_or_else(|| format!("Token exchange failed with status {}", reply.status));
            return Err(PdfGateError::AuthError { detail });
        }

        let response: TokenResponse = serde_json::from_slice(&reply.body)
            .map_err(|e| PdfGateError::ProtocolError(format!("Token parse error: {}", e)))?;
        TokenGrant::from_response(response)
    }
}

/// Map a non-success reply to an [`PdfGateError::ApiError`].
pub fn reply_error(reply: &HttpReply) -> PdfGateError {
    let detail = error_detail(&reply.body)
        .unwrap_or_else(|| format!("Request failed with status {}", reply.status));
    PdfGateError::ApiError {
        status: reply.status,
        detail,
    }
}

fn normalize_base(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Build a User-Agent string from config.
///
/// Format: `<client_id>/pdfgate-<version>`.
pub fn build_user_agent(config: &PdfGateConfig) -> String {
    format!("{}/pdfgate-{}", config.client_id, env!("CARGO_PKG_VERSION"))
}
