//! Session-wide counters, owned exclusively by the orchestrator.

use std::collections::HashSet;

use uuid::Uuid;

/// Mutable state of one replacement session.
///
/// Threaded explicitly through the orchestrator and rotation policy so
/// multiple sessions can run independently and be unit-tested in isolation.
/// Terminal when `total >= target` or no candidate pages remain.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: Uuid,
    /// Stop once this many captures have been taken.
    pub target: u32,
    /// Running total of successful captures.
    pub total: u32,
    /// Pages already processed this session.
    pub visited: HashSet<String>,
    /// Pages in a row that produced no capture.
    pub consecutive_failures: u32,
}

impl SessionState {
    pub fn new(target: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            total: 0,
            visited: HashSet::new(),
            consecutive_failures: 0,
        }
    }

    /// Record a page visit; returns false if the page was already visited.
    pub fn visit(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Bump the running total after a successful capture.
    pub fn record_capture(&mut self) {
        self.total += 1;
        self.consecutive_failures = 0;
    }

    /// Record the outcome of a finished page.
    pub fn finish_page(&mut self, captures_on_page: u32) {
        if captures_on_page == 0 {
            self.consecutive_failures += 1;
        }
    }

    /// Whether the capture target has been met.
    pub fn target_met(&self) -> bool {
        self.total >= self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_met_at_exact_count() {
        let mut session = SessionState::new(3);
        assert!(!session.target_met());
        session.record_capture();
        session.record_capture();
        assert!(!session.target_met());
        session.record_capture();
        assert!(session.target_met());
    }

    #[test]
    fn zero_target_is_immediately_met() {
        let session = SessionState::new(0);
        assert!(session.target_met());
    }

    #[test]
    fn visit_dedups() {
        let mut session = SessionState::new(1);
        assert!(session.visit("https://example.com/a"));
        assert!(!session.visit("https://example.com/a"));
        assert!(session.visit("https://example.com/b"));
        assert_eq!(session.visited.len(), 2);
    }

    #[test]
    fn consecutive_failures_reset_on_capture() {
        let mut session = SessionState::new(10);
        session.finish_page(0);
        session.finish_page(0);
        assert_eq!(session.consecutive_failures, 2);
        session.record_capture();
        assert_eq!(session.consecutive_failures, 0);
        session.finish_page(2);
        assert_eq!(session.consecutive_failures, 0);
    }
}
