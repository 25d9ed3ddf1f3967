//! Audio anomaly classification
//!
//! A frequency snapshot is anomalous when its peak bin dominates the mean by the
//! configured ratio and also clears an absolute floor, so near-silence with a single
//! noisy bin does not qualify.

use crate::config::ProctorConfig;
use crate::detectors::Outcome;
use crate::types::{Incident, IncidentType, Severity};
use crate::window::DedupWindow;
use chrono::{DateTime, Utc};
use tracing::debug;

pub struct AudioClassifier {
    peak_ratio: f64,
    peak_floor: f64,
    dedup_ms: i64,
}

impl AudioClassifier {
    pub fn new(config: &ProctorConfig) -> Self {
        Self {
            peak_ratio: config.audio_peak_ratio,
            peak_floor: config.audio_peak_floor,
            dedup_ms: config.audio_dedup_ms,
        }
    }

    pub fn is_anomalous(&self, peak: f64, mean: f64) -> bool {
        peak > self.peak_ratio * mean && peak > self.peak_floor
    }

    pub fn observe(
        &self,
        at: DateTime<Utc>,
        peak: f64,
        mean: f64,
        dedup: &mut DedupWindow,
    ) -> Outcome {
        if !self.is_anomalous(peak, mean) {
            return Outcome::none();
        }
        if !dedup.admit(IncidentType::AudioAnomaly, at, self.dedup_ms) {
            debug!(peak, mean, "audio_anomaly suppressed by dedup window");
            return Outcome::none();
        }

        Outcome::incident(
            Incident::new(
                IncidentType::AudioAnomaly,
                Severity::Medium,
                at,
                format!(
                    "Unusual audio pattern detected (peak {:.0} vs mean {:.1})",
                    peak, mean
                ),
            )
            .with_metadata("max_frequency", peak)
            .with_metadata("avg_frequency", mean),
        )
    }
}
