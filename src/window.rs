//! Temporal windowing
//!
//! Per-type dedup windows suppress repeated identical incidents; the switch history
//! is a bounded ring of instants used to detect rate patterns.

use crate::types::IncidentType;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

/// Last emission instant per incident type
#[derive(Debug, Clone, Default)]
pub struct DedupWindow {
    last_seen: HashMap<IncidentType, DateTime<Utc>>,
}

impl DedupWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records `at` when no incident of `kind` was admitted in the
    /// preceding `window_ms`. Suppressed attempts leave the window untouched.
    pub fn admit(&mut self, kind: IncidentType, at: DateTime<Utc>, window_ms: i64) -> bool {
        if let Some(last) = self.last_seen.get(&kind) {
            if (at - *last) < Duration::milliseconds(window_ms) {
                return false;
            }
        }
        self.last_seen.insert(kind, at);
        true
    }

    pub fn last_seen(&self, kind: IncidentType) -> Option<DateTime<Utc>> {
        self.last_seen.get(&kind).copied()
    }
}

/// Bounded history of switch instants (oldest dropped first)
#[derive(Debug, Clone)]
pub struct SwitchHistory {
    instants: VecDeque<DateTime<Utc>>,
    capacity: usize,
}

impl SwitchHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            instants: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, at: DateTime<Utc>) {
        self.instants.push_back(at);
        while self.instants.len() > self.capacity {
            self.instants.pop_front();
        }
    }

    /// Entries strictly younger than `window_ms` relative to `now`
    pub fn count_within(&self, now: DateTime<Utc>, window_ms: i64) -> usize {
        let window = Duration::milliseconds(window_ms);
        self.instants
            .iter()
            .filter(|instant| now - **instant < window)
            .count()
    }

    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    #[test]
    fn test_dedup_is_per_type() {
        let mut dedup = DedupWindow::new();
        assert!(dedup.admit(IncidentType::AudioAnomaly, t(0), 10_000));
        assert!(dedup.admit(IncidentType::MultiplePeople, t(100), 10_000));
        assert!(!dedup.admit(IncidentType::AudioAnomaly, t(200), 10_000));
    }

    #[test]
    fn test_dedup_reopens_after_window() {
        let mut dedup = DedupWindow::new();
        assert!(dedup.admit(IncidentType::MultiplePeople, t(0), 5_000));
        assert!(!dedup.admit(IncidentType::MultiplePeople, t(4_999), 5_000));
        assert!(dedup.admit(IncidentType::MultiplePeople, t(5_000), 5_000));
        assert_eq!(dedup.last_seen(IncidentType::MultiplePeople), Some(t(5_000)));
    }

    #[test]
    fn test_suppressed_attempt_does_not_extend_window() {
        let mut dedup = DedupWindow::new();
        assert!(dedup.admit(IncidentType::AudioAnomaly, t(0), 1_000));
        assert!(!dedup.admit(IncidentType::AudioAnomaly, t(900), 1_000));
        assert!(dedup.admit(IncidentType::AudioAnomaly, t(1_100), 1_000));
    }

    #[test]
    fn test_switch_history_is_bounded() {
        let mut history = SwitchHistory::new(10);
        for i in 0..15 {
            history.push(t(i * 100));
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.count_within(t(1_400), 5_000), 10);
    }

    #[test]
    fn test_count_within_excludes_old_entries() {
        let mut history = SwitchHistory::new(10);
        history.push(t(0));
        history.push(t(1_000));
        history.push(t(6_000));
        assert_eq!(history.count_within(t(6_000), 5_000), 1);
        assert_eq!(history.count_within(t(5_999), 5_000), 2);
    }
}
