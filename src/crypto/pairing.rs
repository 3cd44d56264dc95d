//! Hour-windowed pairing key derivation.
//!
//! The pairing key is a human-copyable shared secret valid for the current
//! UTC clock hour. Client and server derive it independently from a fixed
//! salt and the hour string `YYYY-MM-DD-HH`; any two parties computing it
//! within the same UTC hour obtain the same value. There is no grace window
//! at the boundary — a request carrying a just-rotated key is rejected and
//! the user must read off the new key.

use crate::clock::Clock;
use chrono::{Datelike, Timelike};
use sha2::{Digest, Sha256};

/// Salt mixed into every pairing key. Must match the server's value.
pub const PAIRING_SALT: &str = "pdf-translator-2024-salt";

/// Length of the displayed key: a 32-hex-char prefix of the full digest.
pub const PAIRING_KEY_LEN: usize = 32;

/// Derive the pairing key for the current UTC hour.
///
/// Computes `SHA-256(salt + "YYYY-MM-DD-HH")`, hex-encodes it, and keeps the
/// first [`PAIRING_KEY_LEN`] characters. Pure function of the clock.
pub fn derive_pairing_key(clock: &dyn Clock) -> String {
    let now = clock.now_utc();
    let window = format!(
        "{:04}-{:02}-{:02}-{:02}",
        now.year(),
        now.month(),
        now.day(),
        now.hour()
    );
    let digest = Sha256::digest(format!("{}{}", PAIRING_SALT, window).as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(PAIRING_KEY_LEN);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use chrono::Duration;

    #[test]
    fn known_answer_vectors() {
        // Independently computed from SHA-256(salt + hour string).
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        assert_eq!(derive_pairing_key(&clock), "adba805f1a3bb1d84fb8b33dac69dfe6");

        let clock = MockClock::from_rfc3339("2025-01-15T13:00:00Z");
        assert_eq!(derive_pairing_key(&clock), "545a52a8c0b3f0ea2950e2df8ec931c6");
    }

    #[test]
    fn zero_padded_components() {
        // Single-digit month, day, and hour must all be zero-padded.
        let clock = MockClock::from_rfc3339("2025-03-05T07:30:00Z");
        assert_eq!(derive_pairing_key(&clock), "2f1c769914441b8a19ada2e73a374494");
    }

    #[test]
    fn constant_within_the_hour() {
        let start = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let end = MockClock::from_rfc3339("2025-01-15T12:59:59Z");
        assert_eq!(derive_pairing_key(&start), derive_pairing_key(&end));
    }

    #[test]
    fn rotates_at_the_hour_boundary() {
        let mut clock = MockClock::from_rfc3339("2025-01-15T12:59:59Z");
        let before = derive_pairing_key(&clock);
        clock.advance(Duration::seconds(1));
        let after = derive_pairing_key(&clock);
        assert_ne!(before, after);
    }

    #[test]
    fn key_is_32_lowercase_hex_chars() {
        let clock = MockClock::from_rfc3339("2025-06-30T23:00:00Z");
        let key = derive_pairing_key(&clock);
        assert_eq!(key.len(), PAIRING_KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
