//! Durable outcomes of successful mutate-and-capture cycles.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::Dimension;

/// The durable outcome of one successful mutate-and-capture cycle.
///
/// Within a single page no two records may share the same
/// `(position, dimension)` pair; the orchestrator enforces this with a
/// per-page dedup set before mutating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacementRecord {
    /// Document-relative position key, `"top:<t>,left:<l>"` with rounded
    /// coordinates.
    pub position: String,
    /// Identifier of the creative that was substituted in.
    pub creative_id: String,
    /// Dimension of the substituted slot.
    pub dimension: Dimension,
    /// When the capture was taken.
    pub timestamp: DateTime<Utc>,
    /// Where the screenshot was written.
    pub screenshot: PathBuf,
    /// Page the substitution happened on.
    pub page_url: String,
}

/// End-of-session summary, serializable for the optional JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Pages that were navigated and scanned.
    pub pages_processed: u32,
    /// Pages abandoned on navigation failure.
    pub pages_skipped: u32,
    /// Total successful captures (equals `records.len()`).
    pub captures: u32,
    /// Why the session stopped.
    pub outcome: SessionOutcome,
    pub records: Vec<ReplacementRecord>,
}

/// Terminal condition of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The configured capture target was reached.
    TargetReached,
    /// Every candidate page was processed.
    PagesExhausted,
    /// Too many consecutive pages yielded no capture.
    FailureLimit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ReplacementRecord {
        ReplacementRecord {
            position: "top:412,left:20".into(),
            creative_id: "img_300x250".into(),
            dimension: Dimension::new(300, 250),
            timestamp: Utc::now(),
            screenshot: PathBuf::from("data/screenshots/ad_20260805_101500.png"),
            page_url: "https://example.com/article/1".into(),
        }
    }

    #[test]
    fn record_json_roundtrip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ReplacementRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn report_serializes_outcome_snake_case() {
        let report = SessionReport {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            pages_processed: 2,
            pages_skipped: 1,
            captures: 1,
            outcome: SessionOutcome::TargetReached,
            records: vec![sample_record()],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"target_reached\""));
        assert!(json.contains("img_300x250"));
    }
}
