//! Session report encoder
//!
//! Assembles the incident log, summary and collector health of one engine into a
//! self-describing JSON report for upload or offline review.

use crate::collectors::CollectorHealth;
use crate::engine::ProctoringEngine;
use crate::error::ProctorError;
use crate::incident_log::IncidentSummary;
use crate::types::Incident;
use crate::{PROCTOR_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Report format version
pub const REPORT_VERSION: &str = "1.0";

/// Software that produced the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Snapshot of one proctoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub monitoring_active: bool,
    pub tab_switch_count: u32,
    pub summary: IncidentSummary,
    pub collectors: Vec<CollectorHealth>,
    pub incidents: Vec<Incident>,
}

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a random instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Snapshot the engine's session state
    pub fn encode(&self, engine: &ProctoringEngine, generated_at: DateTime<Utc>) -> IncidentReport {
        IncidentReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: PROCTOR_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            session_id: engine.session_id(),
            generated_at,
            monitoring_active: engine.is_active(),
            tab_switch_count: engine.tab_switch_count(),
            summary: engine.summary(),
            collectors: engine.health(),
            incidents: engine.log().iter().cloned().collect(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        engine: &ProctoringEngine,
        generated_at: DateTime<Utc>,
    ) -> Result<String, ProctorError> {
        let report = self.encode(engine, generated_at);
        serde_json::to_string_pretty(&report).map_err(ProctorError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProctorConfig;
    use crate::observation::ClipboardOperation;
    use crate::sink::RecordingSink;
    use crate::types::{IncidentType, Severity};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn engine_with_incidents() -> ProctoringEngine {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let mut engine =
            ProctoringEngine::new(ProctorConfig::default(), RecordingSink::new()).unwrap();
        engine.start(at);
        engine.visibility_changed(at + chrono::Duration::seconds(1), true);
        engine.visibility_changed(at + chrono::Duration::milliseconds(1_500), false);
        engine.clipboard(at + chrono::Duration::seconds(2), ClipboardOperation::Paste);
        engine
    }

    #[test]
    fn test_report_snapshot() {
        let engine = engine_with_incidents();
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let generated_at = Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap();

        let report = encoder.encode(&engine, generated_at);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.session_id, engine.session_id());
        assert!(report.monitoring_active);
        assert_eq!(report.tab_switch_count, 1);
        assert_eq!(report.incidents.len(), 2);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.highest_severity, Some(Severity::High));
        assert_eq!(report.collectors.len(), 7);
        assert_eq!(report.incidents[1].incident_type, IncidentType::CopyPaste);
    }

    #[test]
    fn test_report_json_roundtrip() {
        let engine = engine_with_incidents();
        let encoder = ReportEncoder::new();
        let generated_at = Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap();

        let json = encoder.encode_to_json(&engine, generated_at).unwrap();
        assert!(json.contains("\"type\": \"tab_switch\""));
        assert!(json.contains("\"copy_paste\""));

        let parsed: IncidentReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, encoder.encode(&engine, generated_at));
    }
}
