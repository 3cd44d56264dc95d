//! Bearer token acquisition and caching.
//!
//! The manager holds at most one token in memory and moves between three
//! states: Absent (never fetched), Valid (held and outside the refresh
//! margin), and Stale (held but within the margin or past expiry). Valid
//! tokens are returned without a network call; Absent and Stale both
//! trigger a fresh exchange. Staleness happens purely by time passing.

use crate::clock::Clock;
use crate::errors::PdfGateError;
use crate::protocol::models::TokenGrant;
use std::time::Duration;

/// Token exchange seam, implemented by the API client.
pub trait TokenExchange {
    /// Exchange a master key (or pairing key) for a bearer token.
    fn exchange_token(
        &self,
        master_key: &str,
        client_id: Option<&str>,
    ) -> Result<TokenGrant, PdfGateError>;
}

/// Caches a bearer token and refreshes it before expiry.
pub struct TokenManager {
    master_key: Option<String>,
    client_id: Option<String>,
    refresh_margin_secs: i64,
    current: Option<TokenGrant>,
}

impl TokenManager {
    /// Create a token manager. The master key may be supplied later via
    /// [`TokenManager::set_master_key`].
    pub fn new(
        master_key: Option<String>,
        client_id: Option<String>,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            master_key,
            client_id,
            refresh_margin_secs: refresh_margin.as_secs() as i64,
            current: None,
        }
    }

    /// Whether a master key is configured.
    pub fn has_master_key(&self) -> bool {
        self.master_key.is_some()
    }

    /// Replace the master key and drop any cached token, since it may have
    /// been minted under the old key.
    pub fn set_master_key(&mut self, master_key: String) {
        self.master_key = Some(master_key);
        self.current = None;
    }

    /// Return a token that is valid for at least the refresh margin,
    /// exchanging the master key for a fresh one when needed.
    ///
    /// # Errors
    /// - `ConfigError` if no master key is configured
    /// - `AuthError` if the exchange is rejected, carrying the server detail
    pub fn ensure_valid_token(
        &mut self,
        exchange: &dyn TokenExchange,
        clock: &dyn Clock,
    ) -> Result<String, PdfGateError> {
        if let Some(grant) = &self.current {
            let now = clock.now_utc().timestamp();
            if now < grant.expires_at.timestamp() - self.refresh_margin_secs {
                return Ok(grant.token.clone());
            }
        }

        let master_key = self.master_key.as_deref().ok_or_else(|| {
            PdfGateError::ConfigError("no master key configured".to_string())
        })?;

        let grant = exchange.exchange_token(master_key, self.client_id.as_deref())?;
        tracing::debug!(expires_at = %grant.expires_at, "bearer token refreshed");

        let token = grant.token.clone();
        self.current = Some(grant);
        Ok(token)
    }

    /// Drop the cached token, forcing a re-exchange on the next call.
    pub fn invalidate(&mut self) {
        self.current = None;
    }
}
