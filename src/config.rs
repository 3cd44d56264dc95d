//! Pdfgate configuration.

use std::time::Duration;

/// Configuration for the translator client.
///
/// The base URL points at the deployed translation service. A persisted
/// `modal_url` setting, when present, overrides it at construction time.
#[derive(Debug, Clone)]
pub struct PdfGateConfig {
    /// Default service base URL (e.g., "https://example--pdf-translator.modal.run").
    pub base_url: String,

    /// Client identifier sent during token exchange (optional on the wire).
    pub client_id: &'static str,

    /// Monthly cap on counted PDF uploads.
    pub monthly_pdf_limit: u64,

    /// Monthly cap on questions asked.
    pub monthly_question_limit: u64,

    /// Safety buffer before token expiry: tokens within this margin of
    /// `expires_at` are re-exchanged before use, absorbing clock skew and
    /// in-flight latency.
    pub refresh_margin: Duration,

    /// Namespace for local state (ledger and settings) under the platform
    /// data directory. Each deployment should use a unique namespace.
    pub store_namespace: &'static str,
}

impl Default for PdfGateConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            client_id: "pdfgate",
            monthly_pdf_limit: 20,
            monthly_question_limit: 100,
            refresh_margin: Duration::from_secs(60),
            store_namespace: "pdfgate",
        }
    }
}

impl PdfGateConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), crate::PdfGateError> {
        if self.base_url.is_empty() {
            return Err(crate::PdfGateError::ConfigError(
                "base_url cannot be empty".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(crate::PdfGateError::ConfigError(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        if self.store_namespace.is_empty() {
            return Err(crate::PdfGateError::ConfigError(
                "store_namespace cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
