//! Media stream health classification

use crate::detectors::Outcome;
use crate::observation::{ReadyState, TrackStatus};
use crate::types::{Incident, IncidentType, Severity};
use chrono::{DateTime, Utc};

#[derive(Debug, Default)]
pub struct StreamHealthClassifier;

impl StreamHealthClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn observe(&self, at: DateTime<Utc>, video_tracks: &[TrackStatus]) -> Outcome {
        if video_tracks.is_empty() {
            return Outcome::incident(
                Incident::new(
                    IncidentType::VideoInterrupted,
                    Severity::High,
                    at,
                    "Camera disabled: no video track available",
                )
                .with_metadata("track_count", 0),
            )
            .warn("Camera disabled. Please turn your camera back on.");
        }

        let Some(track) = video_tracks.iter().find(|track| track.is_interrupted()) else {
            return Outcome::none();
        };
        let ready_state = match track.ready_state {
            ReadyState::Live => "live",
            ReadyState::Ended => "ended",
        };
        let reason = if track.ready_state == ReadyState::Ended {
            "ended"
        } else {
            "muted"
        };

        Outcome::incident(
            Incident::new(
                IncidentType::VideoInterrupted,
                Severity::Medium,
                at,
                format!("Video feed interrupted (track {})", reason),
            )
            .with_metadata("track_count", video_tracks.len())
            .with_metadata("ready_state", ready_state)
            .with_metadata("muted", track.muted),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Escalation;

    #[test]
    fn test_missing_track_is_high_with_warning() {
        let outcome = StreamHealthClassifier::new().observe(Utc::now(), &[]);
        assert_eq!(outcome.incidents[0].severity, Severity::High);
        assert!(matches!(outcome.escalations.as_slice(), [Escalation::Warning(_)]));
    }

    #[test]
    fn test_ended_or_muted_track_is_medium_without_callback() {
        let ended = TrackStatus {
            ready_state: ReadyState::Ended,
            muted: false,
        };
        let outcome = StreamHealthClassifier::new().observe(Utc::now(), &[ended]);
        assert_eq!(outcome.incidents.len(), 1);
        assert_eq!(outcome.incidents[0].severity, Severity::Medium);
        assert_eq!(outcome.incidents[0].metadata_value("ready_state").unwrap(), "ended");
        assert!(outcome.escalations.is_empty());

        let muted = TrackStatus {
            ready_state: ReadyState::Live,
            muted: true,
        };
        let outcome = StreamHealthClassifier::new().observe(Utc::now(), &[muted]);
        assert!(outcome.incidents[0].description.contains("muted"));
    }

    #[test]
    fn test_live_track_is_healthy() {
        let outcome = StreamHealthClassifier::new().observe(Utc::now(), &[TrackStatus::live()]);
        assert!(outcome.is_empty());
    }
}
