//! Synheart Proctor - Real-time proctoring signal-fusion engine
//!
//! Proctor watches a live interview session through several independent signals
//! (page visibility and focus, clipboard and keyboard, device orientation, sampled
//! video frames, microphone spectrum, media-stream health and input inactivity) and
//! turns them into typed, severity-ranked incidents with a warning/violation
//! escalation policy:
//!
//! observation → detector (classify + dedup) → incident log → sink
//!
//! ## Modules
//!
//! - **Engine**: session state, collector schedules and fault isolation
//! - **Detectors**: one classifier per signal
//! - **Collectors**: host capability traits and the on-device frame/spectrum analysis
//! - **Driver**: tokio task that ticks an engine against the wall clock

pub mod collectors;
pub mod config;
pub mod detectors;
pub mod driver;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod incident_log;
pub mod observation;
pub mod sink;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use collectors::{
    AudioSource, CollectorHealth, CollectorKind, CollectorStatus, FaceCountEstimator,
    FrameSource, StreamProbe, VideoFrame,
};
pub use config::{DetectorToggles, ProctorConfig};
pub use driver::{spawn_monitor, MonitorHandle};
pub use encoder::{IncidentReport, ReportEncoder};
pub use engine::{EngineBuilder, ProctoringEngine};
pub use error::ProctorError;
pub use incident_log::{IncidentLog, IncidentSummary};
pub use observation::{ClipboardOperation, KeyChord, Observation, TrackStatus};
pub use sink::{CallbackSink, IncidentSink, RecordingSink, SinkEvent};
pub use types::{Disposition, Escalation, Incident, IncidentType, Severity};

/// Proctor version embedded in session reports
pub const PROCTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for session reports
pub const PRODUCER_NAME: &str = "synheart-proctor";
