//! Per-request signature construction.
//!
//! Every authenticated call carries a signature binding the bearer token,
//! a timestamp, a fresh nonce, and an endpoint-specific digest input:
//!
//! ```text
//! signature = hex(SHA-256(token + timestamp + nonce + digest_input))
//! ```
//!
//! The digest input is intentionally partial: only a 100-character prefix
//! of the large payload field participates, which keeps signing cost
//! bounded but means two long payloads sharing a prefix sign identically.
//! The server treats this as a light integrity check on the request's
//! identifying fields, not full content binding.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// How many characters of the large payload field enter the digest input.
pub const DIGEST_PREFIX_CHARS: usize = 100;

/// Generate a fresh request nonce: 16 random bytes as 32 lowercase hex chars.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest input for a translate call: text prefix plus the page number.
///
/// An absent page number contributes an empty string. The prefix is taken
/// in characters, not bytes, matching how the server slices the text.
pub fn translate_digest_input(text: &str, page_number: Option<u32>) -> String {
    let prefix: String = text.chars().take(DIGEST_PREFIX_CHARS).collect();
    match page_number {
        Some(page) => format!("{}{}", prefix, page),
        None => prefix,
    }
}

/// Digest input for a question call: context prefix plus the full question.
pub fn question_digest_input(content: &str, question: &str) -> String {
    let prefix: String = content.chars().take(DIGEST_PREFIX_CHARS).collect();
    format!("{}{}", prefix, question)
}

/// Compute the request signature over token, timestamp, nonce, and digest input.
pub fn sign_request(token: &str, timestamp: i64, nonce: &str, digest_input: &str) -> String {
    let data = format!("{}{}{}{}", token, timestamp, nonce, digest_input);
    hex::encode(Sha256::digest(data.as_bytes()))
}
