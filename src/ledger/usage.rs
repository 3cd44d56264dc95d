//! Monthly usage ledger with content-hash deduplication.
//!
//! Counters are bucketed by calendar month (`YYYY-MM`, UTC). A month never
//! seen before starts at zero on first access; no reset job runs. PDF
//! uploads are deduplicated within a month by a content hash, so the same
//! binary counted twice costs one unit of quota. Enforcement is soft and
//! client-side only.
//!
//! The ledger file is shared across processes; concurrent writers race
//! last-writer-wins.

use crate::clock::Clock;
use crate::PdfGateError;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

/// Which counter a usage event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    /// A PDF upload (deduplicated by content hash).
    PdfUpload,
    /// A question asked against a document.
    Question,
}

impl UsageKind {
    /// Short label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            UsageKind::PdfUpload => "pdf",
            UsageKind::Question => "question",
        }
    }
}

/// Configured monthly caps.
#[derive(Debug, Clone, Copy)]
pub struct UsageCaps {
    /// Maximum counted PDF uploads per month.
    pub pdf_uploads: u64,
    /// Maximum questions per month.
    pub questions: u64,
}

/// One calendar month's counters and dedup set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonthBucket {
    /// Counted PDF uploads this month.
    #[serde(default)]
    pub pdf_uploads: u64,
    /// Questions asked this month.
    #[serde(default)]
    pub questions: u64,
    /// Content hashes of PDFs already counted this month.
    #[serde(default)]
    pub pdf_ids: BTreeSet<String>,
}

/// All recorded usage, keyed by `YYYY-MM` month key.
///
/// Buckets persist indefinitely; old months are never compacted away.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageStats {
    months: BTreeMap<String, MonthBucket>,
}

/// Format a UTC instant as a `YYYY-MM` month key.
pub fn month_key(now: &DateTime<Utc>) -> String {
    format!("{:04}-{:02}", now.year(), now.month())
}

impl UsageStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a month's bucket without creating it.
    pub fn bucket(&self, key: &str) -> Option<&MonthBucket> {
        self.months.get(key)
    }

    /// Get or create the bucket for a month key. This is the only place
    /// rollover happens: an unseen month materializes at zero.
    pub fn bucket_mut(&mut self, key: &str) -> &mut MonthBucket {
        self.months.entry(key.to_string()).or_default()
    }

    /// Current month's count for a kind.
    pub fn count(&self, kind: UsageKind, clock: &dyn Clock) -> u64 {
        let key = month_key(&clock.now_utc());
        match self.bucket(&key) {
            Some(bucket) => match kind {
                UsageKind::PdfUpload => bucket.pdf_uploads,
                UsageKind::Question => bucket.questions,
            },
            None => 0,
        }
    }

    /// Whether a PDF content hash has already been counted this month.
    pub fn is_known_pdf(&self, dedup_key: &str, clock: &dyn Clock) -> bool {
        let key = month_key(&clock.now_utc());
        self.bucket(&key)
            .is_some_and(|b| b.pdf_ids.contains(dedup_key))
    }

    /// Record one usage event. Returns whether a counter was incremented:
    /// a PDF whose dedup key is already present this month is not re-counted
    /// and its key is not re-inserted.
    pub fn record(&mut self, kind: UsageKind, dedup_key: Option<&str>, clock: &dyn Clock) -> bool {
        let key = month_key(&clock.now_utc());
        let bucket = self.bucket_mut(&key);

        match kind {
            UsageKind::PdfUpload => {
                if let Some(id) = dedup_key {
                    if bucket.pdf_ids.contains(id) {
                        return false;
                    }
                    bucket.pdf_ids.insert(id.to_string());
                }
                bucket.pdf_uploads += 1;
            }
            UsageKind::Question => {
                bucket.questions += 1;
            }
        }
        true
    }
}

/// Remaining quota for the current month. Values go negative when caps were
/// lowered after usage accrued; clamp for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    /// Uploads left this month.
    pub pdf_uploads: i64,
    /// Questions left this month.
    pub questions: i64,
}

impl Remaining {
    /// Clamp both counters at zero for display.
    pub fn clamped(self) -> Self {
        Self {
            pdf_uploads: self.pdf_uploads.max(0),
            questions: self.questions.max(0),
        }
    }
}

/// File-backed usage ledger.
pub struct UsageLedger {
    path: PathBuf,
    caps: UsageCaps,
    stats: UsageStats,
}

impl UsageLedger {
    /// Open a ledger at the given path, loading existing stats if present.
    pub fn new(path: PathBuf, caps: UsageCaps) -> Result<Self, PdfGateError> {
        let stats = if path.exists() {
            let json = fs::read_to_string(&path)
                .map_err(|e| PdfGateError::LedgerIO(format!("Failed to read ledger: {}", e)))?;
            serde_json::from_str(&json)
                .map_err(|e| PdfGateError::LedgerIO(format!("Failed to parse ledger: {}", e)))?
        } else {
            UsageStats::new()
        };

        Ok(Self { path, caps, stats })
    }

    /// Open a ledger under `dirs::data_dir()/<namespace>/usage.json`.
    pub fn with_namespace(namespace: &str, caps: UsageCaps) -> Result<Self, PdfGateError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| PdfGateError::LedgerIO("Could not find data directory".to_string()))?;

        let dir = base_dir.join(namespace);
        fs::create_dir_all(&dir)
            .map_err(|e| PdfGateError::LedgerIO(format!("Failed to create dir: {}", e)))?;

        Self::new(dir.join("usage.json"), caps)
    }

    /// True iff the current month's counter for `kind` is strictly below its cap.
    pub fn check_limit(&self, kind: UsageKind, clock: &dyn Clock) -> bool {
        let cap = match kind {
            UsageKind::PdfUpload => self.caps.pdf_uploads,
            UsageKind::Question => self.caps.questions,
        };
        self.stats.count(kind, clock) < cap
    }

    /// Whether a PDF content hash was already counted this month.
    pub fn is_known_pdf(&self, dedup_key: &str, clock: &dyn Clock) -> bool {
        self.stats.is_known_pdf(dedup_key, clock)
    }

    /// Record a usage event and persist the ledger. Returns whether a
    /// counter was actually incremented (false for a deduplicated upload).
    pub fn record_usage(
        &mut self,
        kind: UsageKind,
        dedup_key: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<bool, PdfGateError> {
        let counted = self.stats.record(kind, dedup_key, clock);
        self.save()?;
        Ok(counted)
    }

    /// Caps minus current counters for the current month.
    pub fn remaining(&self, clock: &dyn Clock) -> Remaining {
        Remaining {
            pdf_uploads: self.caps.pdf_uploads as i64
                - self.stats.count(UsageKind::PdfUpload, clock) as i64,
            questions: self.caps.questions as i64
                - self.stats.count(UsageKind::Question, clock) as i64,
        }
    }

    /// The raw stats.
    pub fn stats(&self) -> &UsageStats {
        &self.stats
    }

    /// Save stats to disk via temp file + rename.
    fn save(&self) -> Result<(), PdfGateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PdfGateError::LedgerIO(format!("Failed to create dir: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(&self.stats)
            .map_err(|e| PdfGateError::LedgerIO(format!("Failed to serialize: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .map_err(|e| PdfGateError::LedgerIO(format!("Failed to write temp: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| PdfGateError::LedgerIO(format!("Failed to rename: {}", e)))?;

        Ok(())
    }
}

/// Content hash used as the upload dedup key: SHA-256 hex of the raw bytes.
pub fn hash_pdf_content(content: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use tempfile::TempDir;

    const CAPS: UsageCaps = UsageCaps {
        pdf_uploads: 3,
        questions: 5,
    };

    fn january() -> MockClock {
        MockClock::from_rfc3339("2025-01-15T12:00:00Z")
    }

    fn february() -> MockClock {
        MockClock::from_rfc3339("2025-02-01T00:00:00Z")
    }

    fn temp_ledger(dir: &TempDir, caps: UsageCaps) -> UsageLedger {
        UsageLedger::new(dir.path().join("usage.json"), caps).unwrap()
    }

    #[test]
    fn unseen_month_counts_zero() {
        let stats = UsageStats::new();
        assert_eq!(stats.count(UsageKind::PdfUpload, &january()), 0);
        assert_eq!(stats.count(UsageKind::Question, &january()), 0);
    }

    #[test]
    fn record_increments_current_month() {
        let clock = january();
        let mut stats = UsageStats::new();

        assert!(stats.record(UsageKind::Question, None, &clock));
        assert!(stats.record(UsageKind::Question, None, &clock));
        assert!(stats.record(UsageKind::PdfUpload, Some("hash-a"), &clock));

        assert_eq!(stats.count(UsageKind::Question, &clock), 2);
        assert_eq!(stats.count(UsageKind::PdfUpload, &clock), 1);
    }

    #[test]
    fn duplicate_pdf_counts_at_most_once() {
        let clock = january();
        let mut stats = UsageStats::new();

        assert!(stats.record(UsageKind::PdfUpload, Some("hash-a"), &clock));
        assert!(!stats.record(UsageKind::PdfUpload, Some("hash-a"), &clock));
        assert!(!stats.record(UsageKind::PdfUpload, Some("hash-a"), &clock));

        assert_eq!(stats.count(UsageKind::PdfUpload, &clock), 1);
        let bucket = stats.bucket(&month_key(&clock.now_utc())).unwrap();
        assert_eq!(bucket.pdf_ids.len(), 1);
    }

    #[test]
    fn same_pdf_counts_again_next_month() {
        let mut stats = UsageStats::new();
        assert!(stats.record(UsageKind::PdfUpload, Some("hash-a"), &january()));
        assert!(stats.record(UsageKind::PdfUpload, Some("hash-a"), &february()));

        assert_eq!(stats.count(UsageKind::PdfUpload, &january()), 1);
        assert_eq!(stats.count(UsageKind::PdfUpload, &february()), 1);
    }

    #[test]
    fn month_rollover_starts_at_zero_and_keeps_history() {
        let mut stats = UsageStats::new();
        stats.record(UsageKind::Question, None, &january());
        stats.record(UsageKind::Question, None, &january());

        assert_eq!(stats.count(UsageKind::Question, &february()), 0);
        // January's bucket is still there.
        assert_eq!(stats.count(UsageKind::Question, &january()), 2);
    }

    #[test]
    fn check_limit_is_strictly_below_cap() {
        let dir = TempDir::new().unwrap();
        let mut ledger = temp_ledger(&dir, UsageCaps { pdf_uploads: 1, questions: 2 });
        let clock = january();

        assert!(ledger.check_limit(UsageKind::Question, &clock));
        ledger.record_usage(UsageKind::Question, None, &clock).unwrap();
        assert!(ledger.check_limit(UsageKind::Question, &clock));
        ledger.record_usage(UsageKind::Question, None, &clock).unwrap();
        assert!(!ledger.check_limit(UsageKind::Question, &clock));
    }

    #[test]
    fn duplicate_upload_scenario_with_cap_of_one() {
        let dir = TempDir::new().unwrap();
        let mut ledger = temp_ledger(&dir, UsageCaps { pdf_uploads: 1, questions: 5 });
        let clock = january();
        let id = hash_pdf_content(b"%PDF-1.4 same bytes");

        assert!(ledger.record_usage(UsageKind::PdfUpload, Some(&id), &clock).unwrap());
        assert!(!ledger.record_usage(UsageKind::PdfUpload, Some(&id), &clock).unwrap());

        assert_eq!(ledger.remaining(&clock).pdf_uploads, 0);
        assert!(!ledger.check_limit(UsageKind::PdfUpload, &clock));
    }

    #[test]
    fn remaining_goes_negative_when_caps_lowered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");
        let clock = january();

        {
            let mut ledger =
                UsageLedger::new(path.clone(), UsageCaps { pdf_uploads: 5, questions: 5 }).unwrap();
            for _ in 0..4 {
                ledger.record_usage(UsageKind::Question, None, &clock).unwrap();
            }
        }

        // Reopen with a lower cap than accrued usage.
        let ledger = UsageLedger::new(path, UsageCaps { pdf_uploads: 5, questions: 2 }).unwrap();
        let remaining = ledger.remaining(&clock);
        assert_eq!(remaining.questions, -2);
        assert_eq!(remaining.clamped().questions, 0);
        assert_eq!(remaining.clamped().pdf_uploads, 5);
    }

    #[test]
    fn ledger_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");
        let clock = january();

        {
            let mut ledger = UsageLedger::new(path.clone(), CAPS).unwrap();
            ledger.record_usage(UsageKind::PdfUpload, Some("hash-a"), &clock).unwrap();
            ledger.record_usage(UsageKind::Question, None, &clock).unwrap();
        }

        let ledger = UsageLedger::new(path, CAPS).unwrap();
        assert_eq!(ledger.stats().count(UsageKind::PdfUpload, &clock), 1);
        assert_eq!(ledger.stats().count(UsageKind::Question, &clock), 1);
        assert!(ledger.is_known_pdf("hash-a", &clock));
    }

    #[test]
    fn dedup_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");
        let clock = january();

        {
            let mut ledger = UsageLedger::new(path.clone(), CAPS).unwrap();
            ledger.record_usage(UsageKind::PdfUpload, Some("hash-a"), &clock).unwrap();
        }

        let mut ledger = UsageLedger::new(path, CAPS).unwrap();
        assert!(!ledger.record_usage(UsageKind::PdfUpload, Some("hash-a"), &clock).unwrap());
        assert_eq!(ledger.stats().count(UsageKind::PdfUpload, &clock), 1);
    }

    #[test]
    fn stats_serialize_as_month_key_map() {
        let clock = january();
        let mut stats = UsageStats::new();
        stats.record(UsageKind::PdfUpload, Some("hash-a"), &clock);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["2025-01"]["pdf_uploads"], 1);
        assert_eq!(json["2025-01"]["pdf_ids"][0], "hash-a");
    }

    #[test]
    fn parses_buckets_with_missing_fields() {
        // Older ledgers may predate the dedup set.
        let stats: UsageStats =
            serde_json::from_str(r#"{"2025-01":{"pdf_uploads":2,"questions":1}}"#).unwrap();
        assert_eq!(stats.count(UsageKind::PdfUpload, &january()), 2);
        assert!(!stats.is_known_pdf("anything", &january()));
    }

    #[test]
    fn hash_pdf_content_known_answer() {
        assert_eq!(
            hash_pdf_content(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn usage_kind_labels() {
        assert_eq!(UsageKind::PdfUpload.label(), "pdf");
        assert_eq!(UsageKind::Question.label(), "question");
    }
}
