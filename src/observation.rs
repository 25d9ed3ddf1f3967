//! Internal observation types
//!
//! Every collector, and every host event pushed into the engine, is reduced to one
//! [`Observation`] before classification. Detectors never branch on raw platform
//! event shapes.

use serde::{Deserialize, Serialize};

/// Clipboard operation intercepted by the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardOperation {
    Copy,
    Paste,
}

impl ClipboardOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipboardOperation::Copy => "copy",
            ClipboardOperation::Paste => "paste",
        }
    }
}

/// A key press with its modifier state.
///
/// `key` follows the DOM `KeyboardEvent.key` convention (`"c"`, `"F12"`,
/// `"PrintScreen"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChord {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    /// Command key on macOS
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl KeyChord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            meta: false,
            shift: false,
            alt: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Ctrl on most platforms, Cmd on macOS
    pub fn command_modifier(&self) -> bool {
        self.ctrl || self.meta
    }

    /// True when the key is the given character, ignoring case
    pub fn is_char(&self, c: char) -> bool {
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(first), None) => first.eq_ignore_ascii_case(&c),
            _ => false,
        }
    }
}

/// `MediaStreamTrack.readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    Live,
    Ended,
}

/// Snapshot of one video track of the host's media stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackStatus {
    pub ready_state: ReadyState,
    #[serde(default)]
    pub muted: bool,
}

impl TrackStatus {
    pub fn live() -> Self {
        Self {
            ready_state: ReadyState::Live,
            muted: false,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.ready_state == ReadyState::Ended || self.muted
    }
}

/// Kind of user input seen by the activity monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    MouseMove,
    KeyDown,
}

/// A single raw observation handed to the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// Page visibility changed
    Visibility { hidden: bool },
    /// OS-level window focus changed
    Focus { focused: bool },
    /// Native copy/paste event intercepted
    Clipboard { operation: ClipboardOperation },
    /// Key pressed while the interview page had focus
    Key { chord: KeyChord },
    /// Device orientation reading in degrees
    Orientation { angle: f64 },
    /// Face count estimated from one sampled video frame
    FrameSampled {
        faces: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skin_ratio: Option<f64>,
    },
    /// Frequency-domain snapshot summary of the microphone
    AudioSampled { peak: f64, mean: f64 },
    /// Video tracks of the host media stream
    StreamHealthChecked { video_tracks: Vec<TrackStatus> },
    /// Mouse or keyboard input
    Activity { activity: ActivityKind },
    /// Periodic inactivity check
    ActivityPolled,
}

impl Observation {
    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Observation::Visibility { .. } => "visibility",
            Observation::Focus { .. } => "focus",
            Observation::Clipboard { .. } => "clipboard",
            Observation::Key { .. } => "key",
            Observation::Orientation { .. } => "orientation",
            Observation::FrameSampled { .. } => "frame_sampled",
            Observation::AudioSampled { .. } => "audio_sampled",
            Observation::StreamHealthChecked { .. } => "stream_health_checked",
            Observation::Activity { .. } => "activity",
            Observation::ActivityPolled => "activity_polled",
        }
    }
}
