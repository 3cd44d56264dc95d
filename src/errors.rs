//! Pdfgate error types.

use thiserror::Error;

/// Errors that can occur while talking to the translator service or
/// maintaining local state.
#[derive(Debug, Error)]
pub enum PdfGateError {
    /// Configuration is invalid or incomplete (e.g., no master key set).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Token exchange was rejected by the server.
    #[error("Authentication failed: {detail}")]
    AuthError {
        /// Server-provided detail message, propagated verbatim.
        detail: String,
    },

    /// An authenticated API call failed for a reason other than token expiry.
    #[error("API error ({status}): {detail}")]
    ApiError {
        /// HTTP status code of the failed response.
        status: u16,
        /// Server-provided detail, or a generic message if unparsable.
        detail: String,
    },

    /// HTTP transport error reaching the service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Failed to parse a service response.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Monthly usage cap reached for the given kind of request.
    #[error("Monthly {kind} limit reached")]
    LimitReached {
        /// Which counter hit its cap ("pdf" or "question").
        kind: &'static str,
    },

    /// Usage ledger I/O error.
    #[error("Ledger I/O error: {0}")]
    LedgerIO(String),

    /// Settings store I/O error.
    #[error("Settings I/O error: {0}")]
    StoreIO(String),
}
