//! Face-presence classification for sampled video frames

use crate::config::ProctorConfig;
use crate::detectors::Outcome;
use crate::types::{Incident, IncidentType, Severity};
use crate::window::DedupWindow;
use chrono::{DateTime, Utc};
use tracing::debug;

pub struct FaceClassifier {
    dedup_ms: i64,
}

impl FaceClassifier {
    pub fn new(config: &ProctorConfig) -> Self {
        Self {
            dedup_ms: config.multiple_people_dedup_ms,
        }
    }

    pub fn observe(
        &self,
        at: DateTime<Utc>,
        faces: u32,
        skin_ratio: Option<f64>,
        dedup: &mut DedupWindow,
    ) -> Outcome {
        if faces <= 1 {
            return Outcome::none();
        }
        if !dedup.admit(IncidentType::MultiplePeople, at, self.dedup_ms) {
            debug!(faces, "multiple_people suppressed by dedup window");
            return Outcome::none();
        }

        let mut incident = Incident::new(
            IncidentType::MultiplePeople,
            Severity::High,
            at,
            format!("Multiple people detected in camera view ({} faces)", faces),
        )
        .with_metadata("face_count", faces);
        if let Some(ratio) = skin_ratio {
            incident = incident.with_metadata("skin_ratio", ratio);
        }

        Outcome::incident(incident).violate("Multiple people detected in the camera view")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    #[test]
    fn test_single_face_is_normal() {
        let classifier = FaceClassifier::new(&ProctorConfig::default());
        let mut dedup = DedupWindow::new();
        assert!(classifier.observe(t(0), 0, None, &mut dedup).is_empty());
        assert!(classifier.observe(t(0), 1, Some(0.2), &mut dedup).is_empty());
    }

    #[test]
    fn test_multiple_faces_deduplicated_for_five_seconds() {
        let classifier = FaceClassifier::new(&ProctorConfig::default());
        let mut dedup = DedupWindow::new();

        let first = classifier.observe(t(0), 2, None, &mut dedup);
        assert_eq!(first.incidents.len(), 1);
        assert_eq!(first.incidents[0].severity, Severity::High);
        assert_eq!(first.escalations.len(), 1);

        assert!(classifier.observe(t(3_000), 3, None, &mut dedup).is_empty());
        assert_eq!(classifier.observe(t(6_000), 2, None, &mut dedup).incidents.len(), 1);
    }
}
