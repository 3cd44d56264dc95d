//! Request/response structs for the translator API.

use crate::PdfGateError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token exchange request body for `POST /auth/token`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest<'a> {
    /// Long-lived master key or a current pairing key; the server accepts both.
    pub master_key: &'a str,
    /// Optional client identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<&'a str>,
}

/// Raw token exchange response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Opaque bearer token.
    pub token: String,
    /// ISO timestamp of expiry; may lack a timezone offset.
    pub expires_at: String,
}

/// A parsed, usable bearer token.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// Opaque bearer token.
    pub token: String,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl TokenGrant {
    /// Parse a raw token response into a grant.
    ///
    /// The server emits `expires_at` via a naive `isoformat()`, so RFC 3339
    /// is tried first and a timezone-less datetime is accepted as UTC.
    pub fn from_response(response: TokenResponse) -> Result<Self, PdfGateError> {
        let expires_at = parse_iso_timestamp(&response.expires_at)?;
        Ok(Self {
            token: response.token,
            expires_at,
        })
    }
}

/// Parse an ISO timestamp that may or may not carry a timezone offset.
pub fn parse_iso_timestamp(s: &str) -> Result<DateTime<Utc>, PdfGateError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| PdfGateError::ProtocolError(format!("Invalid expires_at: {} ({})", s, e)))
}

/// Authenticated translate request body.
#[derive(Debug, Clone, Serialize)]
pub struct TranslateRequest<'a> {
    /// Page text to translate.
    pub text: &'a str,
    /// 1-based page number, if the text belongs to a specific page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Request timestamp in epoch seconds.
    pub timestamp: i64,
    /// Fresh per-request nonce.
    pub nonce: &'a str,
    /// Request signature.
    pub signature: &'a str,
}

/// Translate response.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateResponse {
    /// Translated text.
    pub translation: String,
}

/// Authenticated question request body.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionRequest<'a> {
    /// Document content the question is about.
    pub content: &'a str,
    /// The user's question.
    pub question: &'a str,
    /// Request timestamp in epoch seconds.
    pub timestamp: i64,
    /// Fresh per-request nonce.
    pub nonce: &'a str,
    /// Request signature.
    pub signature: &'a str,
}

/// Question response.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionResponse {
    /// The answer text.
    pub answer: String,
}

/// Health probe response from `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceHealth {
    /// Reported status string (e.g., "healthy").
    pub status: String,
    /// Number of tokens the server currently considers active.
    #[serde(default)]
    pub active_tokens: u64,
}

/// Error body shape shared by all endpoints.
#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

/// Extract the `detail` field from an error response body, if parsable.
pub fn error_detail(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_grant_parses_rfc3339() {
        let grant = TokenGrant::from_response(TokenResponse {
            token: "tok".to_string(),
            expires_at: "2025-01-15T13:00:00+00:00".to_string(),
        })
        .unwrap();
        assert_eq!(grant.expires_at.to_rfc3339(), "2025-01-15T13:00:00+00:00");
    }

    #[test]
    fn token_grant_parses_naive_isoformat() {
        // Shape the server actually emits: datetime.fromtimestamp().isoformat()
        let grant = TokenGrant::from_response(TokenResponse {
            token: "tok".to_string(),
            expires_at: "2025-01-15T13:00:00.123456".to_string(),
        })
        .unwrap();
        assert_eq!(grant.expires_at.timestamp(), 1736946000);
    }

    #[test]
    fn token_grant_rejects_garbage() {
        let result = TokenGrant::from_response(TokenResponse {
            token: "tok".to_string(),
            expires_at: "not a timestamp".to_string(),
        });
        assert!(matches!(result, Err(PdfGateError::ProtocolError(_))));
    }

    #[test]
    fn token_request_omits_absent_client_id() {
        let body = serde_json::to_value(TokenRequest {
            master_key: "mk",
            client_id: None,
        })
        .unwrap();
        assert!(body.get("client_id").is_none());
    }

    #[test]
    fn translate_request_serializes_all_fields() {
        let body = serde_json::to_value(TranslateRequest {
            text: "hello",
            page_number: Some(2),
            timestamp: 1736942400,
            nonce: "abc",
            signature: "def",
        })
        .unwrap();
        assert_eq!(body["text"], "hello");
        assert_eq!(body["page_number"], 2);
        assert_eq!(body["timestamp"], 1736942400i64);
        assert_eq!(body["nonce"], "abc");
        assert_eq!(body["signature"], "def");
    }

    #[test]
    fn translate_request_omits_absent_page() {
        let body = serde_json::to_value(TranslateRequest {
            text: "hello",
            page_number: None,
            timestamp: 0,
            nonce: "a",
            signature: "b",
        })
        .unwrap();
        assert!(body.get("page_number").is_none());
    }

    #[test]
    fn error_detail_extraction() {
        assert_eq!(
            error_detail(br#"{"detail":"Invalid or expired token"}"#),
            Some("Invalid or expired token".to_string())
        );
        assert_eq!(error_detail(br#"{"other":1}"#), None);
        assert_eq!(error_detail(b"not json"), None);
    }

    #[test]
    fn health_parses_with_and_without_token_count() {
        let health: ServiceHealth =
            serde_json::from_str(r#"{"status":"healthy","active_tokens":3}"#).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.active_tokens, 3);

        let health: ServiceHealth = serde_json::from_str(r#"{"status":"healthy"}"#).unwrap();
        assert_eq!(health.active_tokens, 0);
    }
}
