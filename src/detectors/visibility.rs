//! Visibility / focus detector
//!
//! Counts tab switches, classifies them by count, detects rapid switching inside a
//! short window, and reports raw window blur separately from tab visibility.
//!
//! A switch is counted when the candidate returns to the tab (hidden → shown); leaving
//! the tab only updates state.

use crate::config::ProctorConfig;
use crate::detectors::Outcome;
use crate::types::{Incident, IncidentType, Severity};
use crate::window::SwitchHistory;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

pub struct VisibilityDetector {
    debounce_ms: i64,
    rapid_window_ms: i64,
    rapid_threshold: usize,
    warning_threshold: u32,
    violation_threshold: u32,
    hidden: bool,
    last_transition: Option<DateTime<Utc>>,
    /// Monotonic for the lifetime of the detector
    switch_count: u32,
    history: SwitchHistory,
}

impl VisibilityDetector {
    pub fn new(config: &ProctorConfig) -> Self {
        Self {
            debounce_ms: config.visibility_debounce_ms,
            rapid_window_ms: config.rapid_switch_window_ms,
            rapid_threshold: config.rapid_switch_threshold,
            warning_threshold: config.tab_switch_warning_threshold,
            violation_threshold: config.tab_switch_violation_threshold,
            hidden: false,
            last_transition: None,
            switch_count: 0,
            history: SwitchHistory::new(config.switch_history_len),
        }
    }

    pub fn switch_count(&self) -> u32 {
        self.switch_count
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Handle a page visibility change
    pub fn observe_visibility(&mut self, at: DateTime<Utc>, hidden: bool) -> Outcome {
        if hidden == self.hidden {
            return Outcome::none();
        }
        if let Some(last) = self.last_transition {
            if at - last < Duration::milliseconds(self.debounce_ms) {
                debug!(hidden, "visibility change inside debounce window ignored");
                return Outcome::none();
            }
        }

        self.hidden = hidden;
        self.last_transition = Some(at);

        if hidden {
            return Outcome::none();
        }
        let mut outcome = self.record_switch(at);
        outcome.extend(self.check_rapid_switching(at));
        outcome
    }

    /// Handle OS-level window focus; every blur is reported, no dedup
    pub fn observe_focus(&mut self, at: DateTime<Utc>, focused: bool) -> Outcome {
        if focused {
            return Outcome::none();
        }
        Outcome::incident(
            Incident::new(
                IncidentType::WindowBlur,
                Severity::Medium,
                at,
                "Interview window lost focus",
            )
            .with_metadata("focused", false),
        )
    }

    fn record_switch(&mut self, at: DateTime<Utc>) -> Outcome {
        self.switch_count += 1;
        self.history.push(at);
        let count = self.switch_count;

        let incident = Incident::new(
            IncidentType::TabSwitch,
            switch_severity(count),
            at,
            format!(
                "Candidate returned after switching away from the interview tab ({} {})",
                count,
                if count == 1 { "time" } else { "times" }
            ),
        )
        .with_metadata("switch_count", count)
        .with_metadata(
            "recent_switches",
            self.history.count_within(at, self.rapid_window_ms),
        );

        let mut outcome = Outcome::incident(incident);
        if count >= self.warning_threshold {
            outcome = outcome.warn(format!(
                "You have switched tabs {} times. Please stay on the interview page.",
                count
            ));
        }
        if count >= self.violation_threshold {
            outcome = outcome.violate(format!(
                "Excessive tab switching detected ({} times)",
                count
            ));
        }
        outcome
    }

    fn check_rapid_switching(&mut self, at: DateTime<Utc>) -> Outcome {
        let recent = self.history.count_within(at, self.rapid_window_ms);
        if recent < self.rapid_threshold {
            return Outcome::none();
        }

        let seconds = self.rapid_window_ms / 1000;
        Outcome::incident(
            Incident::new(
                IncidentType::TabSwitch,
                Severity::High,
                at,
                format!(
                    "Rapid tab switching detected: {} switches within {} seconds",
                    recent, seconds
                ),
            )
            .with_metadata("rapid", true)
            .with_metadata("recent_switches", recent)
            .with_metadata("window_ms", self.rapid_window_ms)
            .with_metadata("switch_count", self.switch_count),
        )
        .violate("Rapid tab switching detected")
    }
}

/// `low` for the first switch, `medium` for the second, `high` from the third on
pub fn switch_severity(count: u32) -> Severity {
    match count {
        0 | 1 => Severity::Low,
        2 => Severity::Medium,
        _ => Severity::High,
    }
}
