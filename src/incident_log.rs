//! Bounded, append-only incident log

use crate::types::{Incident, IncidentType, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Ordered in-memory record of emitted incidents.
///
/// Appends never reorder; once `capacity` is reached the oldest entry is evicted and
/// counted so long sessions stay bounded.
#[derive(Debug, Clone)]
pub struct IncidentLog {
    entries: VecDeque<Incident>,
    capacity: usize,
    evicted: u64,
}

/// Aggregate counts over the retained incidents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub total: usize,
    /// Incidents evicted from the bounded log
    pub evicted: u64,
    pub by_type: BTreeMap<IncidentType, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_severity: Option<Severity>,
}

impl IncidentLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
            evicted: 0,
        }
    }

    pub fn append(&mut self, incident: Incident) {
        self.entries.push_back(incident);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Incident> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Incident> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn count_of(&self, kind: IncidentType) -> usize {
        self.entries
            .iter()
            .filter(|incident| incident.incident_type == kind)
            .count()
    }

    pub fn summary(&self) -> IncidentSummary {
        let mut summary = IncidentSummary {
            total: self.entries.len(),
            evicted: self.evicted,
            ..IncidentSummary::default()
        };

        for incident in &self.entries {
            *summary.by_type.entry(incident.incident_type).or_insert(0) += 1;
            *summary.by_severity.entry(incident.severity).or_insert(0) += 1;
        }
        summary.highest_severity = self.entries.iter().map(|i| i.severity).max();

        summary
    }

    /// Serialize retained incidents as a JSON array
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }

    /// Serialize retained incidents as newline-delimited JSON
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for incident in &self.entries {
            out.push_str(&serde_json::to_string(incident)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn incident(kind: IncidentType, severity: Severity, offset_sec: i64) -> Incident {
        let at =
            Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + Duration::seconds(offset_sec);
        Incident::new(kind, severity, at, format!("{} at {}", kind, offset_sec))
    }

    #[test]
    fn test_append_preserves_order() {
        let mut log = IncidentLog::new(10);
        log.append(incident(IncidentType::TabSwitch, Severity::Low, 0));
        log.append(incident(IncidentType::CopyPaste, Severity::High, 1));

        let kinds: Vec<_> = log.iter().map(|i| i.incident_type).collect();
        assert_eq!(kinds, vec![IncidentType::TabSwitch, IncidentType::CopyPaste]);
        assert_eq!(log.last().map(|i| i.incident_type), Some(IncidentType::CopyPaste));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = IncidentLog::new(3);
        for i in 0..5 {
            log.append(incident(IncidentType::WindowBlur, Severity::Medium, i));
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.evicted(), 2);
        assert_eq!(log.iter().next().unwrap().description, "window_blur at 2");
    }

    #[test]
    fn test_summary_counts() {
        let mut log = IncidentLog::new(10);
        log.append(incident(IncidentType::TabSwitch, Severity::Low, 0));
        log.append(incident(IncidentType::TabSwitch, Severity::Medium, 1));
        log.append(incident(IncidentType::AudioAnomaly, Severity::Medium, 2));

        let summary = log.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_type.get(&IncidentType::TabSwitch), Some(&2));
        assert_eq!(summary.by_severity.get(&Severity::Medium), Some(&2));
        assert_eq!(summary.highest_severity, Some(Severity::Medium));
        assert_eq!(log.count_of(IncidentType::AudioAnomaly), 1);
    }

    #[test]
    fn test_empty_summary() {
        let log = IncidentLog::new(10);
        let summary = log.summary();
        assert_eq!(summary, IncidentSummary::default());
    }

    #[test]
    fn test_ndjson_export() {
        let mut log = IncidentLog::new(10);
        log.append(incident(IncidentType::TabSwitch, Severity::Low, 0));
        log.append(incident(IncidentType::WindowBlur, Severity::Medium, 1));

        let ndjson = log.to_ndjson().unwrap();
        let lines: Vec<_> = ndjson.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "tab_switch");
    }
}
