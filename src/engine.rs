//! Proctoring engine
//!
//! One engine instance per monitored session. It owns every detector's rolling state,
//! the timed collectors and their schedules, the bounded incident log and the host
//! sink. The host drives it with stamped observations and clock ticks:
//!
//! ```ignore
//! let mut engine = ProctoringEngine::builder(ProctorConfig::default())
//!     .sink(RecordingSink::new())
//!     .audio_source(mic)
//!     .build()?;
//! engine.start(now);
//! let disposition = engine.key_down(now, &KeyChord::new("c").with_ctrl());
//! engine.tick(now + Duration::seconds(5));
//! engine.stop();
//! ```

use crate::collectors::{
    AudioSource, CollectorHealth, CollectorKind, CollectorStatus, FaceCountEstimator,
    FrameSource, Schedule, SkinToneEstimator, SpectrumSummary, StreamProbe,
};
use crate::config::ProctorConfig;
use crate::detectors::clipboard::{clipboard_disposition, context_menu_disposition, key_disposition};
use crate::detectors::{
    ActivityMonitor, AudioClassifier, ClipboardGuard, FaceClassifier, OrientationMonitor,
    Outcome, StreamHealthClassifier, VisibilityDetector,
};
use crate::error::ProctorError;
use crate::incident_log::{IncidentLog, IncidentSummary};
use crate::observation::{ActivityKind, ClipboardOperation, KeyChord, Observation};
use crate::sink::IncidentSink;
use crate::types::Disposition;
use crate::window::DedupWindow;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Builder for [`ProctoringEngine`]
pub struct EngineBuilder {
    config: ProctorConfig,
    sink: Option<Box<dyn IncidentSink>>,
    frame_source: Option<Box<dyn FrameSource>>,
    estimator: Option<Box<dyn FaceCountEstimator>>,
    audio_source: Option<Box<dyn AudioSource>>,
    stream_probe: Option<Box<dyn StreamProbe>>,
}

impl EngineBuilder {
    pub fn sink(mut self, sink: impl IncidentSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn frame_source(mut self, source: impl FrameSource + 'static) -> Self {
        self.frame_source = Some(Box::new(source));
        self
    }

    /// Replace the skin-tone heuristic with another face counter
    pub fn face_estimator(mut self, estimator: impl FaceCountEstimator + 'static) -> Self {
        self.estimator = Some(Box::new(estimator));
        self
    }

    pub fn audio_source(mut self, source: impl AudioSource + 'static) -> Self {
        self.audio_source = Some(Box::new(source));
        self
    }

    pub fn stream_probe(mut self, probe: impl StreamProbe + 'static) -> Self {
        self.stream_probe = Some(Box::new(probe));
        self
    }

    pub fn build(self) -> Result<ProctoringEngine, ProctorError> {
        self.config.validate()?;
        let sink = self.sink.ok_or_else(|| {
            ProctorError::InvalidConfig("an incident sink is required".to_string())
        })?;
        let estimator: Box<dyn FaceCountEstimator> = match self.estimator {
            Some(estimator) => estimator,
            None => Box::new(SkinToneEstimator::new(self.config.skin_ratio_threshold)),
        };
        let config = self.config;

        let health = CollectorKind::ALL
            .iter()
            .map(|kind| (*kind, CollectorHealth::new(*kind)))
            .collect();

        Ok(ProctoringEngine {
            session_id: Uuid::new_v4(),
            active: false,
            sink,
            log: IncidentLog::new(config.max_log_entries),
            dedup: DedupWindow::new(),
            visibility: VisibilityDetector::new(&config),
            clipboard: ClipboardGuard::new(),
            orientation: OrientationMonitor::new(&config),
            faces: FaceClassifier::new(&config),
            audio: AudioClassifier::new(&config),
            stream: StreamHealthClassifier::new(),
            activity: ActivityMonitor::new(&config),
            frame_source: self.frame_source,
            estimator,
            audio_source: self.audio_source,
            audio_acquired: false,
            stream_probe: self.stream_probe,
            frame_schedule: Schedule::every_ms(config.frame_interval_ms),
            audio_schedule: Schedule::every_ms(config.audio_interval_ms),
            stream_schedule: Schedule::every_ms(config.stream_interval_ms),
            inactivity_schedule: Schedule::every_ms(config.inactivity_poll_ms),
            health,
            config,
        })
    }
}

/// Session-scoped signal-fusion engine
pub struct ProctoringEngine {
    config: ProctorConfig,
    session_id: Uuid,
    active: bool,
    sink: Box<dyn IncidentSink>,
    log: IncidentLog,
    /// Last emission per incident type
    dedup: DedupWindow,

    visibility: VisibilityDetector,
    clipboard: ClipboardGuard,
    orientation: OrientationMonitor,
    faces: FaceClassifier,
    audio: AudioClassifier,
    stream: StreamHealthClassifier,
    activity: ActivityMonitor,

    frame_source: Option<Box<dyn FrameSource>>,
    estimator: Box<dyn FaceCountEstimator>,
    audio_source: Option<Box<dyn AudioSource>>,
    audio_acquired: bool,
    stream_probe: Option<Box<dyn StreamProbe>>,

    frame_schedule: Schedule,
    audio_schedule: Schedule,
    stream_schedule: Schedule,
    inactivity_schedule: Schedule,
    health: BTreeMap<CollectorKind, CollectorHealth>,
}

impl ProctoringEngine {
    pub fn builder(config: ProctorConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            sink: None,
            frame_source: None,
            estimator: None,
            audio_source: None,
            stream_probe: None,
        }
    }

    /// Engine with only event-driven collectors (no video, audio or stream sources)
    pub fn new(
        config: ProctorConfig,
        sink: impl IncidentSink + 'static,
    ) -> Result<Self, ProctorError> {
        Self::builder(config).sink(sink).build()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &ProctorConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn log(&self) -> &IncidentLog {
        &self.log
    }

    pub fn summary(&self) -> IncidentSummary {
        self.log.summary()
    }

    pub fn tab_switch_count(&self) -> u32 {
        self.visibility.switch_count()
    }

    pub fn health(&self) -> Vec<CollectorHealth> {
        self.health.values().cloned().collect()
    }

    pub fn collector_health(&self, kind: CollectorKind) -> Option<&CollectorHealth> {
        self.health.get(&kind)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Arm every enabled collector. Sources that are unavailable disable only their
    /// own collector. Calling `start` on an active engine is a no-op.
    pub fn start(&mut self, at: DateTime<Utc>) {
        if self.active {
            return;
        }
        self.active = true;
        self.activity.reset(at);

        let toggles = self.config.detectors;
        let enabled = [
            (CollectorKind::Visibility, toggles.visibility),
            (CollectorKind::Clipboard, toggles.clipboard),
            (CollectorKind::Orientation, toggles.orientation),
            (CollectorKind::Video, toggles.video),
            (CollectorKind::Audio, toggles.audio),
            (CollectorKind::Stream, toggles.stream),
            (CollectorKind::Activity, toggles.activity),
        ];
        for (kind, on) in enabled {
            if !on {
                self.set_status(kind, CollectorStatus::Disabled {
                    reason: "disabled by configuration".to_string(),
                });
                continue;
            }
            match self.acquire(kind) {
                Ok(()) => self.set_status(kind, CollectorStatus::Active),
                Err(err) => {
                    info!(collector = %kind, reason = %err, "collector disabled");
                    self.set_status(kind, CollectorStatus::Disabled {
                        reason: err.to_string(),
                    });
                }
            }
        }

        if self.is_collecting(CollectorKind::Video) {
            self.frame_schedule.arm(at);
        }
        if self.is_collecting(CollectorKind::Audio) {
            self.audio_schedule.arm(at);
        }
        if self.is_collecting(CollectorKind::Stream) {
            self.stream_schedule.arm(at);
        }
        if self.is_collecting(CollectorKind::Activity) {
            self.inactivity_schedule.arm(at);
        }

        info!(session_id = %self.session_id, "proctoring started");
    }

    /// Disarm every schedule and release owned audio resources. Counters survive so
    /// a later `start` resumes the same session.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        self.frame_schedule.disarm();
        self.audio_schedule.disarm();
        self.stream_schedule.disarm();
        self.inactivity_schedule.disarm();
        self.release_audio();

        for health in self.health.values_mut() {
            if health.is_active() {
                health.status = CollectorStatus::Stopped;
            }
        }

        info!(
            session_id = %self.session_id,
            incidents = self.log.len(),
            tab_switches = self.visibility.switch_count(),
            "proctoring stopped"
        );
    }

    /// Apply the host's monitoring flag
    pub fn set_monitoring(&mut self, active: bool, at: DateTime<Utc>) {
        if active {
            self.start(at);
        } else {
            self.stop();
        }
    }

    fn acquire(&mut self, kind: CollectorKind) -> Result<(), ProctorError> {
        match kind {
            CollectorKind::Video => match self.frame_source.as_mut() {
                Some(source) => source.start(),
                None => Err(ProctorError::Unavailable("no video source attached".to_string())),
            },
            CollectorKind::Audio => match self.audio_source.as_mut() {
                Some(source) => {
                    source.start(self.config.fft_size)?;
                    self.audio_acquired = true;
                    Ok(())
                }
                None => Err(ProctorError::Unavailable("no audio source attached".to_string())),
            },
            CollectorKind::Stream => match self.stream_probe.as_mut() {
                Some(probe) => probe.start(),
                None => Err(ProctorError::Unavailable("no media stream attached".to_string())),
            },
            _ => Ok(()),
        }
    }

    fn release_audio(&mut self) {
        if !self.audio_acquired {
            return;
        }
        if let Some(source) = self.audio_source.as_mut() {
            source.release();
        }
        self.audio_acquired = false;
    }

    fn set_status(&mut self, kind: CollectorKind, status: CollectorStatus) {
        if let Some(health) = self.health.get_mut(&kind) {
            health.status = status;
        }
    }

    fn is_collecting(&self, kind: CollectorKind) -> bool {
        self.active && self.health.get(&kind).is_some_and(|h| h.is_active())
    }

    // ------------------------------------------------------------------
    // Event-driven input
    // ------------------------------------------------------------------

    /// Classify one observation and publish the outcome. Returns what the host should
    /// do with the native event behind it.
    pub fn ingest(&mut self, at: DateTime<Utc>, observation: Observation) -> Disposition {
        if !self.active {
            return Disposition::Allow;
        }
        let (disposition, outcome) = self.classify(at, observation);
        self.publish(outcome);
        disposition
    }

    pub fn visibility_changed(&mut self, at: DateTime<Utc>, hidden: bool) {
        self.ingest(at, Observation::Visibility { hidden });
    }

    pub fn focus_changed(&mut self, at: DateTime<Utc>, focused: bool) {
        self.ingest(at, Observation::Focus { focused });
    }

    pub fn clipboard(&mut self, at: DateTime<Utc>, operation: ClipboardOperation) -> Disposition {
        self.ingest(at, Observation::Clipboard { operation })
    }

    pub fn key_down(&mut self, at: DateTime<Utc>, chord: &KeyChord) -> Disposition {
        self.ingest(at, Observation::Key { chord: chord.clone() })
    }

    pub fn pointer_moved(&mut self, at: DateTime<Utc>) {
        self.ingest(at, Observation::Activity {
            activity: ActivityKind::MouseMove,
        });
    }

    pub fn orientation_changed(&mut self, at: DateTime<Utc>, angle: f64) {
        self.ingest(at, Observation::Orientation { angle });
    }

    /// Right-click menu; suppressed while the guard is active, never an incident
    pub fn context_menu(&self) -> Disposition {
        if self.is_collecting(CollectorKind::Clipboard) {
            context_menu_disposition()
        } else {
            Disposition::Allow
        }
    }

    fn classify(&mut self, at: DateTime<Utc>, observation: Observation) -> (Disposition, Outcome) {
        let mut disposition = Disposition::Allow;
        let outcome = match observation {
            Observation::Visibility { hidden } if self.is_collecting(CollectorKind::Visibility) => {
                self.visibility.observe_visibility(at, hidden)
            }
            Observation::Focus { focused } if self.is_collecting(CollectorKind::Visibility) => {
                self.visibility.observe_focus(at, focused)
            }
            Observation::Clipboard { operation }
                if self.is_collecting(CollectorKind::Clipboard) =>
            {
                disposition = clipboard_disposition(operation);
                self.clipboard.observe_clipboard(at, operation)
            }
            Observation::Key { chord } => {
                if self.is_collecting(CollectorKind::Activity) {
                    self.activity.record_activity(at);
                }
                if self.is_collecting(CollectorKind::Clipboard) {
                    disposition = key_disposition(&chord);
                    self.clipboard.observe_key(at, &chord)
                } else {
                    Outcome::none()
                }
            }
            Observation::Orientation { angle }
                if self.is_collecting(CollectorKind::Orientation) =>
            {
                self.orientation.observe(at, angle)
            }
            Observation::FrameSampled { faces, skin_ratio }
                if self.is_collecting(CollectorKind::Video) =>
            {
                self.faces.observe(at, faces, skin_ratio, &mut self.dedup)
            }
            Observation::AudioSampled { peak, mean }
                if self.is_collecting(CollectorKind::Audio) =>
            {
                self.audio.observe(at, peak, mean, &mut self.dedup)
            }
            Observation::StreamHealthChecked { video_tracks }
                if self.is_collecting(CollectorKind::Stream) =>
            {
                self.stream.observe(at, &video_tracks)
            }
            Observation::Activity { .. } if self.is_collecting(CollectorKind::Activity) => {
                self.activity.record_activity(at);
                Outcome::none()
            }
            Observation::ActivityPolled if self.is_collecting(CollectorKind::Activity) => {
                self.activity.poll(at)
            }
            other => {
                debug!(observation = other.label(), "observation for inactive collector dropped");
                Outcome::none()
            }
        };
        (disposition, outcome)
    }

    /// Record incidents and forward them, then fire escalations
    fn publish(&mut self, outcome: Outcome) {
        for incident in outcome.incidents {
            debug!(
                incident_type = %incident.incident_type,
                severity = %incident.severity,
                "incident recorded"
            );
            self.sink.on_incident(&incident);
            self.log.append(incident);
        }
        for escalation in &outcome.escalations {
            self.sink.escalate(escalation);
        }
    }

    // ------------------------------------------------------------------
    // Timed collectors
    // ------------------------------------------------------------------

    /// Fire every collector due at `now`. Each collector is isolated: a fault is
    /// logged and counted, and the remaining collectors still run.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if !self.active {
            return;
        }
        if self.frame_schedule.take_due(now) {
            self.run_collector(CollectorKind::Video, now);
        }
        if self.audio_schedule.take_due(now) {
            self.run_collector(CollectorKind::Audio, now);
        }
        if self.stream_schedule.take_due(now) {
            self.run_collector(CollectorKind::Stream, now);
        }
        if self.inactivity_schedule.take_due(now) {
            self.run_collector(CollectorKind::Activity, now);
        }
    }

    fn run_collector(&mut self, kind: CollectorKind, now: DateTime<Utc>) {
        if !self.is_collecting(kind) {
            return;
        }
        let sampled = match kind {
            CollectorKind::Video => self.sample_video(),
            CollectorKind::Audio => self.sample_audio(),
            CollectorKind::Stream => self.sample_stream(),
            CollectorKind::Activity => Ok(Some(Observation::ActivityPolled)),
            _ => Ok(None),
        };

        let observation = match sampled {
            Ok(Some(observation)) => {
                if let Some(health) = self.health.get_mut(&kind) {
                    health.record_success();
                }
                observation
            }
            Ok(None) => {
                if let Some(health) = self.health.get_mut(&kind) {
                    health.record_skip();
                }
                debug!(collector = %kind, "source not ready, tick skipped");
                return;
            }
            Err(ProctorError::Unavailable(reason)) => {
                info!(collector = %kind, %reason, "source became unavailable, collector disabled");
                self.disable_collector(kind, reason);
                return;
            }
            Err(err) => {
                if let Some(health) = self.health.get_mut(&kind) {
                    health.record_fault();
                }
                warn!(collector = %kind, error = %err, "collector tick failed");
                return;
            }
        };

        let (_, outcome) = self.classify(now, observation);
        self.publish(outcome);
    }

    fn disable_collector(&mut self, kind: CollectorKind, reason: String) {
        match kind {
            CollectorKind::Video => self.frame_schedule.disarm(),
            CollectorKind::Audio => {
                self.audio_schedule.disarm();
                self.release_audio();
            }
            CollectorKind::Stream => self.stream_schedule.disarm(),
            CollectorKind::Activity => self.inactivity_schedule.disarm(),
            _ => {}
        }
        if let Some(health) = self.health.get_mut(&kind) {
            health.disable(reason);
        }
    }

    fn sample_video(&mut self) -> Result<Option<Observation>, ProctorError> {
        let source = self
            .frame_source
            .as_mut()
            .ok_or_else(|| ProctorError::Unavailable("no video source attached".to_string()))?;
        let Some(frame) = source.capture()? else {
            return Ok(None);
        };
        let estimate = self.estimator.estimate(&frame)?;
        Ok(Some(Observation::FrameSampled {
            faces: estimate.faces,
            skin_ratio: estimate.skin_ratio,
        }))
    }

    fn sample_audio(&mut self) -> Result<Option<Observation>, ProctorError> {
        let source = self
            .audio_source
            .as_mut()
            .ok_or_else(|| ProctorError::Unavailable("no audio source attached".to_string()))?;
        let Some(bins) = source.frequency_data()? else {
            return Ok(None);
        };
        Ok(SpectrumSummary::from_bins(&bins).map(|summary| Observation::AudioSampled {
            peak: summary.peak,
            mean: summary.mean,
        }))
    }

    fn sample_stream(&mut self) -> Result<Option<Observation>, ProctorError> {
        let probe = self
            .stream_probe
            .as_mut()
            .ok_or_else(|| ProctorError::Unavailable("no media stream attached".to_string()))?;
        let video_tracks = probe.video_tracks()?;
        Ok(Some(Observation::StreamHealthChecked { video_tracks }))
    }
}

impl Drop for ProctoringEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
