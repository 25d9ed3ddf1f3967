//! Device orientation monitor
//!
//! A significant rotation is a delta strictly inside the configured band. The first
//! significant changes are treated as noise; later ones suggest the device is being
//! handled (e.g. a phone turned to show the screen to someone).
//!
//! Deltas are measured against a reference seeded from `initial_orientation_deg`.
//! Without a seed the first reading only establishes the reference.

use crate::config::ProctorConfig;
use crate::detectors::Outcome;
use crate::types::{Incident, IncidentType, Severity};
use chrono::{DateTime, Utc};

pub struct OrientationMonitor {
    min_delta: f64,
    max_delta: f64,
    suppressed: u32,
    previous: Option<f64>,
    significant_changes: u32,
}

impl OrientationMonitor {
    pub fn new(config: &ProctorConfig) -> Self {
        Self {
            min_delta: config.orientation_min_delta_deg,
            max_delta: config.orientation_max_delta_deg,
            suppressed: config.orientation_suppressed_changes,
            previous: config.initial_orientation_deg,
            significant_changes: 0,
        }
    }

    pub fn significant_changes(&self) -> u32 {
        self.significant_changes
    }

    pub fn is_significant(&self, delta: f64) -> bool {
        delta > self.min_delta && delta < self.max_delta
    }

    pub fn observe(&mut self, at: DateTime<Utc>, angle: f64) -> Outcome {
        if !angle.is_finite() {
            return Outcome::none();
        }
        let Some(previous) = self.previous.replace(angle) else {
            return Outcome::none();
        };
        let delta = (angle - previous).abs();

        if !self.is_significant(delta) {
            return Outcome::none();
        }
        self.significant_changes += 1;
        if self.significant_changes <= self.suppressed {
            return Outcome::none();
        }

        Outcome::incident(
            Incident::new(
                IncidentType::PhoneDetected,
                Severity::Medium,
                at,
                format!(
                    "Significant device orientation change detected \
                     ({} changes, {:.0}° rotation)",
                    self.significant_changes, delta
                ),
            )
            .with_metadata("orientation_delta", delta)
            .with_metadata("previous_orientation", previous)
            .with_metadata("orientation", angle)
            .with_metadata("significant_changes", self.significant_changes),
        )
        .warn("Device movement detected. Please keep your device steady and in view.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Escalation;

    fn monitor() -> OrientationMonitor {
        OrientationMonitor::new(&ProctorConfig::default())
    }

    #[test]
    fn test_band_is_exclusive() {
        let m = monitor();
        assert!(!m.is_significant(45.0));
        assert!(m.is_significant(45.1));
        assert!(m.is_significant(180.0));
        assert!(!m.is_significant(315.0));
    }

    #[test]
    fn test_first_significant_change_suppressed() {
        let mut m = monitor();
        let now = Utc::now();

        assert!(m.observe(now, 90.0).is_empty());
        assert_eq!(m.significant_changes(), 1);

        let outcome = m.observe(now, 0.0);
        assert_eq!(outcome.incidents.len(), 1);
        assert_eq!(outcome.incidents[0].incident_type, IncidentType::PhoneDetected);
        assert_eq!(outcome.incidents[0].severity, Severity::Medium);
        assert!(matches!(outcome.escalations.as_slice(), [Escalation::Warning(_)]));
    }

    #[test]
    fn test_wraparound_is_not_significant() {
        let mut m = monitor();
        let now = Utc::now();
        // 0 → -90 is a 90° turn, -90 → 270 is a full turn (360) and ignored
        assert!(m.observe(now, -90.0).is_empty());
        assert!(m.observe(now, 270.0).is_empty());
        assert_eq!(m.significant_changes(), 1);
    }

    #[test]
    fn test_seeded_reference_counts_first_reading() {
        let config = ProctorConfig {
            initial_orientation_deg: Some(90.0),
            ..ProctorConfig::default()
        };
        let mut m = OrientationMonitor::new(&config);
        let now = Utc::now();

        // 90 → 0 is the suppressed first change, 0 → 90 reports
        assert!(m.observe(now, 0.0).is_empty());
        assert_eq!(m.significant_changes(), 1);
        let outcome = m.observe(now, 90.0);
        assert_eq!(outcome.incidents.len(), 1);
        assert_eq!(
            outcome.incidents[0].metadata_value("previous_orientation").unwrap(),
            0.0
        );
    }

    #[test]
    fn test_device_held_at_ninety_from_the_start() {
        let config = ProctorConfig {
            initial_orientation_deg: Some(90.0),
            ..ProctorConfig::default()
        };
        let mut m = OrientationMonitor::new(&config);
        let now = Utc::now();

        for _ in 0..3 {
            assert!(m.observe(now, 90.0).is_empty());
        }
        assert_eq!(m.significant_changes(), 0);
    }

    #[test]
    fn test_unseeded_first_reading_sets_reference() {
        let config = ProctorConfig {
            initial_orientation_deg: None,
            ..ProctorConfig::default()
        };
        let mut m = OrientationMonitor::new(&config);
        let now = Utc::now();

        assert!(m.observe(now, 90.0).is_empty());
        assert_eq!(m.significant_changes(), 0);
        assert!(m.observe(now, 0.0).is_empty());
        assert_eq!(m.significant_changes(), 1);
        assert_eq!(m.observe(now, 90.0).incidents.len(), 1);
    }

    #[test]
    fn test_small_jitter_ignored() {
        let mut m = monitor();
        let now = Utc::now();
        for angle in [10.0, 20.0, 5.0, 30.0] {
            assert!(m.observe(now, angle).is_empty());
        }
        assert_eq!(m.significant_changes(), 0);
    }
}
