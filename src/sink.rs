//! Incident sink
//!
//! The sink is the single boundary between the engine and the host: incidents are
//! forwarded unconditionally, warnings and violations are advisory and never queued
//! or retried.

use crate::types::{Escalation, Incident};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Host-facing subscriber interface
pub trait IncidentSink: Send {
    /// Called once per classified, non-deduplicated incident
    fn on_incident(&mut self, incident: &Incident);

    /// Advisory threshold crossed
    fn on_warning(&mut self, _message: &str) {}

    /// Hard policy threshold crossed
    fn on_violation(&mut self, _message: &str) {}

    /// Route an escalation to the matching callback
    fn escalate(&mut self, escalation: &Escalation) {
        match escalation {
            Escalation::Warning(message) => self.on_warning(message),
            Escalation::Violation(message) => self.on_violation(message),
        }
    }
}

type IncidentCallback = Box<dyn FnMut(&Incident) + Send>;
type MessageCallback = Box<dyn FnMut(&str) + Send>;

/// Sink assembled from host closures: `on_incident` is required, the rest optional
pub struct CallbackSink {
    on_incident: IncidentCallback,
    on_warning: Option<MessageCallback>,
    on_violation: Option<MessageCallback>,
}

impl CallbackSink {
    pub fn new(on_incident: impl FnMut(&Incident) + Send + 'static) -> Self {
        Self {
            on_incident: Box::new(on_incident),
            on_warning: None,
            on_violation: None,
        }
    }

    pub fn with_warning(mut self, on_warning: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_warning = Some(Box::new(on_warning));
        self
    }

    pub fn with_violation(mut self, on_violation: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_violation = Some(Box::new(on_violation));
        self
    }
}

impl IncidentSink for CallbackSink {
    fn on_incident(&mut self, incident: &Incident) {
        (self.on_incident)(incident);
    }

    fn on_warning(&mut self, message: &str) {
        if let Some(callback) = self.on_warning.as_mut() {
            callback(message);
        }
    }

    fn on_violation(&mut self, message: &str) {
        if let Some(callback) = self.on_violation.as_mut() {
            callback(message);
        }
    }
}

/// Everything a sink received, in delivery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Incident { incident: Incident },
    Warning { message: String },
    Violation { message: String },
}

/// Sink that queues deliveries behind a shared handle.
///
/// Cloning yields another handle onto the same queue, so a host (or test) can keep
/// one clone while the engine owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SinkEvent>> {
        // A poisoned queue still holds valid events
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of every event received so far
    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().clone()
    }

    /// Remove and return every queued event
    pub fn drain(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Incident { incident } => Some(incident.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Warning { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn violations(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Violation { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl IncidentSink for RecordingSink {
    fn on_incident(&mut self, incident: &Incident) {
        self.lock().push(SinkEvent::Incident {
            incident: incident.clone(),
        });
    }

    fn on_warning(&mut self, message: &str) {
        self.lock().push(SinkEvent::Warning {
            message: message.to_string(),
        });
    }

    fn on_violation(&mut self, message: &str) {
        self.lock().push(SinkEvent::Violation {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IncidentType, Severity};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_incident() -> Incident {
        Incident::new(
            IncidentType::CopyPaste,
            Severity::High,
            Utc::now(),
            "Copy operation blocked",
        )
    }

    #[test]
    fn test_callback_sink_routes_escalations() {
        let incidents = Arc::new(AtomicUsize::new(0));
        let warnings = Arc::new(AtomicUsize::new(0));
        let violations = Arc::new(AtomicUsize::new(0));

        let (i, w, v) = (incidents.clone(), warnings.clone(), violations.clone());
        let mut sink = CallbackSink::new(move |_| {
            i.fetch_add(1, Ordering::SeqCst);
        })
        .with_warning(move |_| {
            w.fetch_add(1, Ordering::SeqCst);
        })
        .with_violation(move |_| {
            v.fetch_add(1, Ordering::SeqCst);
        });

        sink.on_incident(&sample_incident());
        sink.escalate(&Escalation::Warning("careful".to_string()));
        sink.escalate(&Escalation::Violation("stop".to_string()));
        sink.escalate(&Escalation::Violation("stop again".to_string()));

        assert_eq!(incidents.load(Ordering::SeqCst), 1);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert_eq!(violations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_optional_callbacks_may_be_absent() {
        let mut sink = CallbackSink::new(|_| {});
        sink.on_warning("ignored");
        sink.on_violation("ignored");
    }

    #[test]
    fn test_recording_sink_shares_queue_between_clones() {
        let recorder = RecordingSink::new();
        let mut engine_side = recorder.clone();

        engine_side.on_incident(&sample_incident());
        engine_side.on_violation("Copy/paste is not allowed");

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.incidents().len(), 1);
        assert_eq!(recorder.violations(), vec!["Copy/paste is not allowed".to_string()]);

        let drained = recorder.drain();
        assert_eq!(drained.len(), 2);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_sink_event_json() {
        let event = SinkEvent::Warning {
            message: "Camera disabled".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "warning");
        assert_eq!(value["message"], "Camera disabled");
    }
}
