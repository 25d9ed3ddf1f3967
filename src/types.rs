//! Incident data types
//!
//! An [`Incident`] is the single record the engine produces. It is built once by a
//! detector and never mutated afterwards; the log and the sink only ever see shared
//! references to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of incident categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    TabSwitch,
    MultiplePeople,
    PhoneDetected,
    CopyPaste,
    WindowBlur,
    VideoInterrupted,
    AudioAnomaly,
    /// Reserved for devtools / printscreen-class events
    MultipleWindows,
}

impl IncidentType {
    pub const ALL: [IncidentType; 8] = [
        IncidentType::TabSwitch,
        IncidentType::MultiplePeople,
        IncidentType::PhoneDetected,
        IncidentType::CopyPaste,
        IncidentType::WindowBlur,
        IncidentType::VideoInterrupted,
        IncidentType::AudioAnomaly,
        IncidentType::MultipleWindows,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::TabSwitch => "tab_switch",
            IncidentType::MultiplePeople => "multiple_people",
            IncidentType::PhoneDetected => "phone_detected",
            IncidentType::CopyPaste => "copy_paste",
            IncidentType::WindowBlur => "window_blur",
            IncidentType::VideoInterrupted => "video_interrupted",
            IncidentType::AudioAnomaly => "audio_anomaly",
            IncidentType::MultipleWindows => "multiple_windows",
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal severity (`low < medium < high`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, timestamped behavioral or environmental event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Incident category
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    /// Instant of detection (serialized as RFC3339)
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    /// Human-readable reason, including the dynamic evidence (counts, durations)
    pub description: String,
    /// Numeric/boolean evidence behind the classification
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Incident {
    pub fn new(
        incident_type: IncidentType,
        severity: Severity,
        timestamp: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            incident_type,
            timestamp,
            severity,
            description: description.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a piece of evidence. Only used while the incident is being built.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}

/// Advisory notification distinct from the incident record itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", content = "message", rename_all = "snake_case")]
pub enum Escalation {
    /// Soft threshold crossed
    Warning(String),
    /// Hard policy threshold crossed
    Violation(String),
}

impl Escalation {
    pub fn message(&self) -> &str {
        match self {
            Escalation::Warning(message) | Escalation::Violation(message) => message,
        }
    }
}

/// What the host must do with the native event that triggered a guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Let the default browser/OS action proceed
    Allow,
    /// Cancel the default action
    Prevent,
    /// Cancel the default action and wipe the outgoing clipboard payload
    PreventAndClearClipboard,
}

impl Disposition {
    pub fn is_prevented(&self) -> bool {
        !matches!(self, Disposition::Allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_incident_type_serialization() {
        let json = serde_json::to_string(&IncidentType::MultipleWindows).unwrap();
        assert_eq!(json, "\"multiple_windows\"");

        let parsed: IncidentType = serde_json::from_str("\"audio_anomaly\"").unwrap();
        assert_eq!(parsed, IncidentType::AudioAnomaly);

        for kind in IncidentType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(
            [Severity::Medium, Severity::High, Severity::Low].iter().max(),
            Some(&Severity::High)
        );
    }

    #[test]
    fn test_incident_wire_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let incident = Incident::new(
            IncidentType::TabSwitch,
            Severity::Medium,
            at,
            "Switched away from the interview tab 2 times",
        )
        .with_metadata("switch_count", 2);

        let value = serde_json::to_value(&incident).unwrap();
        assert_eq!(value["type"], "tab_switch");
        assert_eq!(value["severity"], "medium");
        assert_eq!(value["timestamp"], "2024-01-15T14:00:00Z");
        assert_eq!(value["metadata"]["switch_count"], 2);
    }

    #[test]
    fn test_escalation_serialization() {
        let json = serde_json::to_value(Escalation::Violation("stop".to_string())).unwrap();
        assert_eq!(json["level"], "violation");
        assert_eq!(json["message"], "stop");
    }

    #[test]
    fn test_disposition_prevented() {
        assert!(!Disposition::Allow.is_prevented());
        assert!(Disposition::Prevent.is_prevented());
        assert!(Disposition::PreventAndClearClipboard.is_prevented());
    }
}
