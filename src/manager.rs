//! Translator manager - the main public API for pdfgate.
//!
//! `TranslatorManager` composes the settings store, usage ledger, token
//! manager, and API client into the front-end-facing surface: register an
//! uploaded PDF, translate page text, ask questions about a document, and
//! display the pairing key and remaining quota.

use crate::client::http::{reply_error, ApiClient, HttpReply};
use crate::clock::{Clock, SystemClock};
use crate::config::PdfGateConfig;
use crate::crypto::pairing::derive_pairing_key;
use crate::crypto::signing::{
    generate_nonce, question_digest_input, sign_request, translate_digest_input,
};
use crate::errors::PdfGateError;
use crate::ledger::usage::{hash_pdf_content, Remaining, UsageCaps, UsageKind, UsageLedger};
use crate::protocol::models::{
    error_detail, QuestionRequest, QuestionResponse, ServiceHealth, TranslateRequest,
    TranslateResponse,
};
use crate::store::file::{SettingsStore, KEY_MASTER_KEY, KEY_MODAL_URL};
use crate::token::TokenManager;
use std::sync::Arc;

/// Main manager for the translator client.
///
/// Create one instance per application and reuse it for all calls. Methods
/// that touch the cached token or the ledger take `&mut self`; the client
/// is single-threaded by design.
pub struct TranslatorManager {
    config: PdfGateConfig,
    clock: Arc<dyn Clock>,
    api: ApiClient,
    tokens: TokenManager,
    ledger: UsageLedger,
    store: SettingsStore,
}

impl TranslatorManager {
    /// Create a manager with the given configuration.
    ///
    /// Loads persisted settings (master key, service URL override) and the
    /// usage ledger from the platform data directory under the configured
    /// namespace. Uses the system clock.
    ///
    /// # Errors
    /// Returns an error if configuration validation fails, the HTTP client
    /// cannot be built, or local state cannot be read.
    pub fn new(config: PdfGateConfig) -> Result<Self, PdfGateError> {
        config.validate()?;
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager with a custom clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_clock(
        config: PdfGateConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PdfGateError> {
        config.validate()?;
        Self::with_clock(config, clock)
    }

    fn with_clock(config: PdfGateConfig, clock: Arc<dyn Clock>) -> Result<Self, PdfGateError> {
        let store = SettingsStore::with_namespace(config.store_namespace)?;

        // A persisted modal_url overrides the configured base URL.
        let base_url = store
            .get(KEY_MODAL_URL)
            .unwrap_or(&config.base_url)
            .to_string();
        let api = ApiClient::new(base_url, &config)?;

        let tokens = TokenManager::new(
            store.get(KEY_MASTER_KEY).map(String::from),
            Some(config.client_id.to_string()),
            config.refresh_margin,
        );

        let ledger = UsageLedger::with_namespace(
            config.store_namespace,
            UsageCaps {
                pdf_uploads: config.monthly_pdf_limit,
                questions: config.monthly_question_limit,
            },
        )?;

        Ok(Self {
            config,
            clock,
            api,
            tokens,
            ledger,
            store,
        })
    }

    /// Assemble a manager from parts (for tests).
    #[cfg(test)]
    pub(crate) fn from_parts(
        config: PdfGateConfig,
        clock: Arc<dyn Clock>,
        api: ApiClient,
        ledger: UsageLedger,
        store: SettingsStore,
    ) -> Self {
        let tokens = TokenManager::new(
            store.get(KEY_MASTER_KEY).map(String::from),
            Some(config.client_id.to_string()),
            config.refresh_margin,
        );
        Self {
            config,
            clock,
            api,
            tokens,
            ledger,
            store,
        }
    }

    /// The pairing key for the current UTC hour, for display to the user.
    pub fn pairing_key(&self) -> String {
        derive_pairing_key(self.clock.as_ref())
    }

    /// Persist a new master key and drop any cached token.
    pub fn set_master_key(&mut self, master_key: &str) -> Result<(), PdfGateError> {
        self.store.set(KEY_MASTER_KEY, master_key)?;
        self.tokens.set_master_key(master_key.to_string());
        Ok(())
    }

    /// Whether a master key is available for token exchange.
    pub fn has_master_key(&self) -> bool {
        self.tokens.has_master_key()
    }

    /// Persist a service URL override. Applied the next time the manager is
    /// constructed, matching how the original front-end reloads its config.
    pub fn set_service_url(&mut self, url: &str) -> Result<(), PdfGateError> {
        self.store.set(KEY_MODAL_URL, url)
    }

    /// Register an uploaded PDF against the monthly quota.
    ///
    /// The content is hashed and deduplicated within the month: re-uploading
    /// known bytes returns `Ok(false)` without consuming quota, even at the
    /// cap. Genuinely new content at the cap fails with `LimitReached`.
    pub fn register_pdf(&mut self, content: &[u8]) -> Result<bool, PdfGateError> {
        let dedup_key = hash_pdf_content(content);
        let clock = self.clock.as_ref();

        if self.ledger.is_known_pdf(&dedup_key, clock) {
            return Ok(false);
        }
        if !self.ledger.check_limit(UsageKind::PdfUpload, clock) {
            return Err(PdfGateError::LimitReached {
                kind: UsageKind::PdfUpload.label(),
            });
        }
        self.ledger
            .record_usage(UsageKind::PdfUpload, Some(&dedup_key), clock)
    }

    /// Translate page text, returning the translation.
    pub fn translate(
        &mut self,
        text: &str,
        page_number: Option<u32>,
    ) -> Result<String, PdfGateError> {
        let digest_input = translate_digest_input(text, page_number);
        let reply = self.signed_call("/translate", &digest_input, |timestamp, nonce, signature| {
            serde_json::to_value(TranslateRequest {
                text,
                page_number,
                timestamp,
                nonce,
                signature,
            })
        })?;

        let response: TranslateResponse = serde_json::from_slice(&reply.body)
            .map_err(|e| PdfGateError::ProtocolError(format!("Translate parse error: {}", e)))?;
        Ok(response.translation)
    }

    /// Ask a question about document content, returning the answer.
    ///
    /// Gated on the monthly question quota; usage is recorded only after a
    /// successful response.
    pub fn ask(&mut self, content: &str, question: &str) -> Result<String, PdfGateError> {
        if !self.ledger.check_limit(UsageKind::Question, self.clock.as_ref()) {
            return Err(PdfGateError::LimitReached {
                kind: UsageKind::Question.label(),
            });
        }

        let digest_input = question_digest_input(content, question);
        let reply = self.signed_call("/question", &digest_input, |timestamp, nonce, signature| {
            serde_json::to_value(QuestionRequest {
                content,
                question,
                timestamp,
                nonce,
                signature,
            })
        })?;

        let response: QuestionResponse = serde_json::from_slice(&reply.body)
            .map_err(|e| PdfGateError::ProtocolError(format!("Question parse error: {}", e)))?;

        self.ledger
            .record_usage(UsageKind::Question, None, self.clock.as_ref())?;
        Ok(response.answer)
    }

    /// Remaining quota for the current month (may be negative; clamp for display).
    pub fn remaining(&self) -> Remaining {
        self.ledger.remaining(self.clock.as_ref())
    }

    /// Probe the service health endpoint.
    pub fn health(&self) -> Result<ServiceHealth, PdfGateError> {
        self.api.health()
    }

    /// The current configuration.
    pub fn config(&self) -> &PdfGateConfig {
        &self.config
    }

    /// Issue one signed call, retrying exactly once after invalidating the
    /// token if the server flags it as expired.
    fn signed_call(
        &mut self,
        path: &str,
        digest_input: &str,
        build: impl Fn(i64, &str, &str) -> Result<serde_json::Value, serde_json::Error>,
    ) -> Result<HttpReply, PdfGateError> {
        let mut retried = false;
        loop {
            let token = self
                .tokens
                .ensure_valid_token(&self.api, self.clock.as_ref())?;
            let timestamp = self.clock.now_utc().timestamp();
            let nonce = generate_nonce();
            let signature = sign_request(&token, timestamp, &nonce, digest_input);

            let body = build(timestamp, &nonce, &signature)
                .map_err(|e| PdfGateError::ProtocolError(format!("Failed to serialize: {}", e)))?;

            let reply = self.api.post(path, &body, Some(&token))?;
            if reply.is_success() {
                return Ok(reply);
            }

            if reply.status == 401 && !retried {
                let detail = error_detail(&reply.body).unwrap_or_default();
                if is_expiry_detail(&detail) {
                    tracing::warn!(%detail, "token rejected, retrying once with a fresh token");
                    self.tokens.invalidate();
                    retried = true;
                    continue;
                }
            }

            return Err(reply_error(&reply));
        }
    }
}

/// Whether a 401 detail message signals an expired token or timestamp, the
/// two rejections a single fresh-token retry can cure.
fn is_expiry_detail(detail: &str) -> bool {
    detail.to_ascii_lowercase().contains("expired")
}
