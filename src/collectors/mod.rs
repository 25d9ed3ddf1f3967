//! Signal collectors
//!
//! Timed collectors own a host-supplied capability (video frames, audio spectrum,
//! stream tracks) and turn one sample into one [`Observation`]. Each collector has
//! its own schedule and health record so a fault in one never stalls another.
//!
//! [`Observation`]: crate::observation::Observation

pub mod face;
pub mod sources;
pub mod spectrum;

pub use face::{FaceCountEstimator, FaceEstimate, SkinToneEstimator};
pub use sources::{AudioSource, FrameSource, StreamProbe, VideoFrame};
pub use spectrum::SpectrumSummary;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one collector / detector pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorKind {
    Visibility,
    Clipboard,
    Orientation,
    Video,
    Audio,
    Stream,
    Activity,
}

impl CollectorKind {
    pub const ALL: [CollectorKind; 7] = [
        CollectorKind::Visibility,
        CollectorKind::Clipboard,
        CollectorKind::Orientation,
        CollectorKind::Video,
        CollectorKind::Audio,
        CollectorKind::Stream,
        CollectorKind::Activity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectorKind::Visibility => "visibility",
            CollectorKind::Clipboard => "clipboard",
            CollectorKind::Orientation => "orientation",
            CollectorKind::Video => "video",
            CollectorKind::Audio => "audio",
            CollectorKind::Stream => "stream",
            CollectorKind::Activity => "activity",
        }
    }
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CollectorStatus {
    /// Not running (monitoring inactive, or never started)
    Stopped,
    Active,
    /// Turned off by configuration or because its source is unavailable
    Disabled { reason: String },
}

/// Health record reported per collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorHealth {
    pub kind: CollectorKind,
    pub status: CollectorStatus,
    /// Faults since the last successful sample
    pub consecutive_faults: u32,
    pub total_faults: u64,
    /// Ticks skipped because the source was not ready
    pub skipped_ticks: u64,
}

impl CollectorHealth {
    pub fn new(kind: CollectorKind) -> Self {
        Self {
            kind,
            status: CollectorStatus::Stopped,
            consecutive_faults: 0,
            total_faults: 0,
            skipped_ticks: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CollectorStatus::Active
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.status, CollectorStatus::Disabled { .. })
    }

    pub fn disable(&mut self, reason: impl Into<String>) {
        self.status = CollectorStatus::Disabled {
            reason: reason.into(),
        };
    }

    pub fn record_fault(&mut self) {
        self.consecutive_faults += 1;
        self.total_faults += 1;
    }

    pub fn record_success(&mut self) {
        self.consecutive_faults = 0;
    }

    pub fn record_skip(&mut self) {
        self.skipped_ticks += 1;
    }
}

/// Fixed-period timer driven by an external clock.
///
/// A due schedule fires once per [`Schedule::take_due`] call; periods missed while the
/// clock jumped forward are coalesced rather than replayed.
#[derive(Debug, Clone)]
pub struct Schedule {
    period: Duration,
    next_due: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn every_ms(period_ms: i64) -> Self {
        Self {
            period: Duration::milliseconds(period_ms.max(1)),
            next_due: None,
        }
    }

    /// First firing one period after `now`
    pub fn arm(&mut self, now: DateTime<Utc>) {
        self.next_due = Some(now + self.period);
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.next_due
    }

    /// True when the schedule is due at `now`; advances to the first boundary after it
    pub fn take_due(&mut self, now: DateTime<Utc>) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if due > now {
            return false;
        }
        let period_ms = self.period.num_milliseconds();
        let missed = (now - due).num_milliseconds() / period_ms;
        self.next_due = Some(due + Duration::milliseconds(period_ms * (missed + 1)));
        true
    }
}
