//! Per-detector classification
//!
//! Each detector owns the rolling state for one signal and maps an observation onto
//! zero or more incidents plus the escalations its policy calls for. Detectors never
//! talk to the host; the engine publishes their outcome to the sink.
//!
//! Observation → Detector (classify + dedup + escalation policy) → Outcome → Sink

pub mod activity;
pub mod audio;
pub mod clipboard;
pub mod orientation;
pub mod stream;
pub mod video;
pub mod visibility;

pub use activity::ActivityMonitor;
pub use audio::AudioClassifier;
pub use clipboard::{match_shortcut, ClipboardGuard, ShortcutRule, Trigger, SHORTCUT_POLICY};
pub use orientation::OrientationMonitor;
pub use stream::StreamHealthClassifier;
pub use video::FaceClassifier;
pub use visibility::VisibilityDetector;

use crate::types::{Escalation, Incident};

/// Result of classifying one observation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub incidents: Vec<Incident>,
    pub escalations: Vec<Escalation>,
}

impl Outcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn incident(incident: Incident) -> Self {
        Self {
            incidents: vec![incident],
            escalations: Vec::new(),
        }
    }

    pub fn warn(mut self, message: impl Into<String>) -> Self {
        self.escalations.push(Escalation::Warning(message.into()));
        self
    }

    pub fn violate(mut self, message: impl Into<String>) -> Self {
        self.escalations.push(Escalation::Violation(message.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty() && self.escalations.is_empty()
    }

    pub fn extend(&mut self, other: Outcome) {
        self.incidents.extend(other.incidents);
        self.escalations.extend(other.escalations);
    }
}
