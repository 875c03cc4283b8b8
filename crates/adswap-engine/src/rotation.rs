//! Creative rotation: processing order, usage buckets, session halt.
//!
//! Creatives are processed in stable identifier order. Usage is tracked per
//! dimension bucket; a configured cap on a bucket permanently retires every
//! creative of that dimension once reached. The orchestrator consults
//! [`RotationPolicy::should_halt`] after every capture and stops the whole
//! run the instant it returns true, even with unprocessed pages remaining.

use std::collections::HashMap;

use adswap_types::{Dimension, SessionState};

use crate::inventory::Creative;

/// Per-page iteration state over the rotation order.
#[derive(Debug, Default, Clone)]
pub struct RotationCursor {
    next: usize,
}

/// Ordering, usage accounting, and halt condition for one session's
/// creatives.
#[derive(Debug)]
pub struct RotationPolicy {
    creatives: Vec<Creative>,
    caps: HashMap<Dimension, u32>,
    used: HashMap<Dimension, u32>,
}

impl RotationPolicy {
    /// Build a policy over the loaded inventory.
    ///
    /// Creatives are (re)sorted by identifier and stamped with the usage
    /// limit configured for their dimension bucket.
    pub fn new(mut creatives: Vec<Creative>, caps: HashMap<Dimension, u32>) -> Self {
        creatives.sort_by(|a, b| a.id.cmp(&b.id));
        for creative in &mut creatives {
            creative.usage_limit = caps.get(&creative.dimension).copied();
        }
        Self {
            creatives,
            caps,
            used: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.creatives.is_empty()
    }

    pub fn creatives(&self) -> &[Creative] {
        &self.creatives
    }

    /// Usage recorded so far for a dimension bucket.
    pub fn bucket_usage(&self, dimension: Dimension) -> u32 {
        self.used.get(&dimension).copied().unwrap_or(0)
    }

    /// Start iterating the rotation order for a new page.
    pub fn cursor(&self) -> RotationCursor {
        RotationCursor::default()
    }

    /// The next usable creative in rotation order, or `None` when the
    /// page's creative list is exhausted.
    ///
    /// Creatives whose dimension bucket has hit its cap (or whose own
    /// usage limit is spent) are skipped, never returned.
    pub fn next(&self, cursor: &mut RotationCursor) -> Option<Creative> {
        while cursor.next < self.creatives.len() {
            let creative = &self.creatives[cursor.next];
            cursor.next += 1;
            if !self.exhausted(creative) {
                return Some(creative.clone());
            }
            tracing::debug!(creative = %creative.id, "bucket exhausted, skipping");
        }
        None
    }

    /// Record one successful use of a creative.
    pub fn record_use(&mut self, id: &str) {
        if let Some(creative) = self.creatives.iter_mut().find(|c| c.id == id) {
            creative.usage_count += 1;
            *self.used.entry(creative.dimension).or_insert(0) += 1;
        }
    }

    /// Whether the session must stop now.
    pub fn should_halt(&self, session: &SessionState) -> bool {
        session.target_met()
    }

    fn exhausted(&self, creative: &Creative) -> bool {
        if let Some(cap) = self.caps.get(&creative.dimension) {
            if self.bucket_usage(creative.dimension) >= *cap {
                return true;
            }
        }
        match creative.usage_limit {
            Some(limit) => creative.usage_count >= limit,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn creative(id: &str, width: u32, height: u32) -> Creative {
        Creative {
            id: id.into(),
            path: PathBuf::from(format!("{id}.jpg")),
            dimension: Dimension::new(width, height),
            usage_count: 0,
            usage_limit: None,
        }
    }

    #[test]
    fn order_is_identifier_sorted_and_stable() {
        let policy = RotationPolicy::new(
            vec![
                creative("img_728x90", 728, 90),
                creative("img_300x250", 300, 250),
                creative("google_160x600", 160, 600),
            ],
            HashMap::new(),
        );
        let mut cursor = policy.cursor();
        let ids: Vec<String> = std::iter::from_fn(|| policy.next(&mut cursor))
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, ["google_160x600", "img_300x250", "img_728x90"]);

        // A fresh cursor replays the same order.
        let mut cursor = policy.cursor();
        assert_eq!(policy.next(&mut cursor).unwrap().id, "google_160x600");
    }

    #[test]
    fn bucket_cap_retires_dimension() {
        let caps = HashMap::from([(Dimension::new(300, 250), 2)]);
        let mut policy = RotationPolicy::new(
            vec![creative("img_300x250", 300, 250), creative("img_728x90", 728, 90)],
            caps,
        );

        policy.record_use("img_300x250");
        policy.record_use("img_300x250");
        assert_eq!(policy.bucket_usage(Dimension::new(300, 250)), 2);

        let mut cursor = policy.cursor();
        let remaining: Vec<String> = std::iter::from_fn(|| policy.next(&mut cursor))
            .map(|c| c.id)
            .collect();
        assert_eq!(remaining, ["img_728x90"]);
    }

    #[test]
    fn cap_is_never_exceeded_over_many_pages() {
        let dim = Dimension::new(300, 250);
        let caps = HashMap::from([(dim, 3)]);
        let mut policy = RotationPolicy::new(vec![creative("img_300x250", 300, 250)], caps);

        // Simulate many page passes, recording a use whenever the policy
        // still offers the creative.
        for _ in 0..10 {
            let mut cursor = policy.cursor();
            if let Some(c) = policy.next(&mut cursor) {
                policy.record_use(&c.id);
            }
        }
        assert_eq!(policy.bucket_usage(dim), 3);
    }

    #[test]
    fn shared_bucket_counts_all_creatives_of_dimension() {
        let dim = Dimension::new(300, 250);
        let caps = HashMap::from([(dim, 2)]);
        let mut policy = RotationPolicy::new(
            vec![creative("google_300x250", 300, 250), creative("img_300x250", 300, 250)],
            caps,
        );
        policy.record_use("google_300x250");
        policy.record_use("img_300x250");

        let mut cursor = policy.cursor();
        assert!(policy.next(&mut cursor).is_none());
    }

    #[test]
    fn uncapped_dimension_never_retires() {
        let mut policy = RotationPolicy::new(vec![creative("img_728x90", 728, 90)], HashMap::new());
        for _ in 0..50 {
            policy.record_use("img_728x90");
        }
        let mut cursor = policy.cursor();
        assert!(policy.next(&mut cursor).is_some());
    }

    #[test]
    fn halt_tracks_session_target() {
        let policy = RotationPolicy::new(vec![creative("img_728x90", 728, 90)], HashMap::new());
        let mut session = SessionState::new(2);
        assert!(!policy.should_halt(&session));
        session.record_capture();
        session.record_capture();
        assert!(policy.should_halt(&session));
    }
}
