//! Inactivity monitor
//!
//! Input events refresh the last-activity instant; each poll past the threshold
//! re-emits an inactivity incident for as long as the candidate stays idle.

use crate::config::ProctorConfig;
use crate::detectors::Outcome;
use crate::types::{Incident, IncidentType, Severity};
use chrono::{DateTime, Utc};

pub struct ActivityMonitor {
    threshold_ms: i64,
    last_activity_at: Option<DateTime<Utc>>,
}

impl ActivityMonitor {
    pub fn new(config: &ProctorConfig) -> Self {
        Self {
            threshold_ms: config.inactivity_threshold_ms,
            last_activity_at: None,
        }
    }

    /// Seed the reference instant when monitoring starts
    pub fn reset(&mut self, at: DateTime<Utc>) {
        self.last_activity_at = Some(at);
    }

    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        self.last_activity_at
    }

    pub fn record_activity(&mut self, at: DateTime<Utc>) {
        match self.last_activity_at {
            Some(last) if last >= at => {}
            _ => self.last_activity_at = Some(at),
        }
    }

    pub fn poll(&self, at: DateTime<Utc>) -> Outcome {
        let Some(last) = self.last_activity_at else {
            return Outcome::none();
        };
        let idle_ms = (at - last).num_milliseconds();
        if idle_ms <= self.threshold_ms {
            return Outcome::none();
        }

        Outcome::incident(
            Incident::new(
                IncidentType::WindowBlur,
                Severity::Medium,
                at,
                format!(
                    "Prolonged inactivity detected ({} seconds without input)",
                    idle_ms / 1000
                ),
            )
            .with_metadata("inactive_ms", idle_ms)
            .with_metadata("threshold_ms", self.threshold_ms),
        )
    }
}
