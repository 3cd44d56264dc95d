//! # Pdfgate
//!
//! **Signed client for a token-authenticated PDF translation/Q&A service.**
//!
//! Pdfgate is the authentication and usage-tracking side of a PDF
//! translator front-end: it derives the hour-scoped pairing key shown to
//! the user, exchanges a master key for short-lived bearer tokens, signs
//! every request with a nonce and a content digest, and keeps a local
//! monthly usage ledger with content-addressed deduplication of uploads.
//!
//! ## Features
//!
//! - **Hour-windowed pairing key** — SHA-256 over a shared salt and the UTC
//!   hour, identical on client and server within the same hour
//! - **Token caching with proactive refresh** — tokens are re-exchanged
//!   60 seconds before expiry, and once more on an expiry-flagged 401
//! - **Per-request signing** — token + timestamp + nonce + payload digest,
//!   with a fresh 16-byte nonce per call
//! - **Monthly usage ledger** — per-calendar-month caps on uploads and
//!   questions, with SHA-256 dedup of repeated PDF content
//! - **Atomic local persistence** — ledger and settings survive restarts
//!   via temp-file + rename writes under the platform data directory
//!
//! ## Quickstart
//!
//! ```no_run
//! use pdfgate::{PdfGateConfig, TranslatorManager};
//!
//! fn main() -> Result<(), pdfgate::PdfGateError> {
//!     let config = PdfGateConfig {
//!         base_url: "https://example--pdf-translator.modal.run".to_string(),
//!         ..PdfGateConfig::default()
//!     };
//!
//!     let mut manager = TranslatorManager::new(config)?;
//!     manager.set_master_key("your-master-key")?;
//!
//!     manager.register_pdf(b"%PDF-1.4 ...")?;
//!     let translation = manager.translate("Page text to translate", Some(1))?;
//!     println!("{}", translation);
//!     Ok(())
//! }
//! ```
//!
//! ## Enforcement model
//!
//! Quota enforcement is client-side and soft: the ledger stops the client
//! from issuing requests past its caps, but nothing prevents a modified
//! client from ignoring it. The request signature binds only a 100-character
//! prefix of large payloads; it detects tampering with a request's
//! identifying fields, not arbitrary content substitution past the prefix.

#![deny(warnings)]
#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// Token layer
pub mod token;

// Ledger layer
pub mod ledger;

// Settings layer
pub mod store;

// Manager (main public API)
pub mod manager;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::PdfGateConfig;
pub use errors::PdfGateError;
pub use ledger::usage::{Remaining, UsageCaps, UsageKind};
pub use manager::TranslatorManager;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
