//! Engine configuration
//!
//! Every threshold, interval and window used by the detectors lives here so a host
//! can tune them from JSON without touching classification code.

use crate::error::ProctorError;
use serde::{Deserialize, Serialize};

/// Default capacity of the in-memory incident log
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 500;

/// Per-detector enable switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorToggles {
    pub visibility: bool,
    pub clipboard: bool,
    pub orientation: bool,
    pub video: bool,
    pub audio: bool,
    pub stream: bool,
    pub activity: bool,
}

impl Default for DetectorToggles {
    fn default() -> Self {
        Self {
            visibility: true,
            clipboard: true,
            orientation: true,
            video: true,
            audio: true,
            stream: true,
            activity: true,
        }
    }
}

/// Tunable parameters for a proctoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctorConfig {
    // Visibility / focus
    /// Visibility changes closer than this to the previous accepted one are ignored
    pub visibility_debounce_ms: i64,
    /// Window used for rapid tab-switch detection
    pub rapid_switch_window_ms: i64,
    /// Switches inside the rapid window needed to flag rapid switching
    pub rapid_switch_threshold: usize,
    /// Number of switch timestamps retained
    pub switch_history_len: usize,
    /// Switch count at which the warning callback fires
    pub tab_switch_warning_threshold: u32,
    /// Switch count at which the violation callback fires
    pub tab_switch_violation_threshold: u32,

    // Orientation
    /// Lower bound (exclusive) of a significant orientation delta, in degrees
    pub orientation_min_delta_deg: f64,
    /// Upper bound (exclusive) of a significant orientation delta, in degrees
    pub orientation_max_delta_deg: f64,
    /// Significant changes suppressed as noise before incidents are emitted
    pub orientation_suppressed_changes: u32,
    /// Reference angle before the first reading; `None` lets the first reading set it
    pub initial_orientation_deg: Option<f64>,

    // Video
    pub frame_interval_ms: i64,
    /// Fraction of skin-tone pixels above which a face is reported
    pub skin_ratio_threshold: f64,
    pub multiple_people_dedup_ms: i64,

    // Audio
    pub audio_interval_ms: i64,
    pub fft_size: usize,
    /// Peak magnitude must exceed this multiple of the mean magnitude
    pub audio_peak_ratio: f64,
    /// Absolute peak floor guarding against near-silence
    pub audio_peak_floor: f64,
    pub audio_dedup_ms: i64,

    // Stream health
    pub stream_interval_ms: i64,

    // Activity
    pub inactivity_poll_ms: i64,
    pub inactivity_threshold_ms: i64,

    /// Maximum incidents retained in memory (oldest are evicted)
    pub max_log_entries: usize,

    pub detectors: DetectorToggles,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            visibility_debounce_ms: 100,
            rapid_switch_window_ms: 5_000,
            rapid_switch_threshold: 3,
            switch_history_len: 10,
            tab_switch_warning_threshold: 2,
            tab_switch_violation_threshold: 5,
            orientation_min_delta_deg: 45.0,
            orientation_max_delta_deg: 315.0,
            orientation_suppressed_changes: 1,
            initial_orientation_deg: Some(0.0),
            frame_interval_ms: 3_000,
            skin_ratio_threshold: 0.05,
            multiple_people_dedup_ms: 5_000,
            audio_interval_ms: 5_000,
            fft_size: 2048,
            audio_peak_ratio: 3.0,
            audio_peak_floor: 150.0,
            audio_dedup_ms: 10_000,
            stream_interval_ms: 5_000,
            inactivity_poll_ms: 30_000,
            inactivity_threshold_ms: 120_000,
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
            detectors: DetectorToggles::default(),
        }
    }
}

impl ProctorConfig {
    /// Parse and validate a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ProctorError> {
        let config: ProctorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String, ProctorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that would disarm timers or make windows meaningless
    pub fn validate(&self) -> Result<(), ProctorError> {
        let intervals = [
            ("frame_interval_ms", self.frame_interval_ms),
            ("audio_interval_ms", self.audio_interval_ms),
            ("stream_interval_ms", self.stream_interval_ms),
            ("inactivity_poll_ms", self.inactivity_poll_ms),
        ];
        for (name, value) in intervals {
            if value <= 0 {
                return Err(ProctorError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let windows = [
            ("visibility_debounce_ms", self.visibility_debounce_ms),
            ("rapid_switch_window_ms", self.rapid_switch_window_ms),
            ("multiple_people_dedup_ms", self.multiple_people_dedup_ms),
            ("audio_dedup_ms", self.audio_dedup_ms),
            ("inactivity_threshold_ms", self.inactivity_threshold_ms),
        ];
        for (name, value) in windows {
            if value < 0 {
                return Err(ProctorError::InvalidConfig(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if self.max_log_entries == 0 {
            return Err(ProctorError::InvalidConfig(
                "max_log_entries must be at least 1".to_string(),
            ));
        }
        if self.switch_history_len == 0 || self.rapid_switch_threshold == 0 {
            return Err(ProctorError::InvalidConfig(
                "switch_history_len and rapid_switch_threshold must be at least 1".to_string(),
            ));
        }
        if self.rapid_switch_threshold > self.switch_history_len {
            return Err(ProctorError::InvalidConfig(format!(
                "rapid_switch_threshold ({}) exceeds switch_history_len ({})",
                self.rapid_switch_threshold, self.switch_history_len
            )));
        }
        if self.orientation_min_delta_deg >= self.orientation_max_delta_deg {
            return Err(ProctorError::InvalidConfig(format!(
                "orientation band ({}, {}) is empty",
                self.orientation_min_delta_deg, self.orientation_max_delta_deg
            )));
        }
        if let Some(angle) = self.initial_orientation_deg {
            if !angle.is_finite() {
                return Err(ProctorError::InvalidConfig(format!(
                    "initial_orientation_deg must be finite, got {}",
                    angle
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.skin_ratio_threshold) {
            return Err(ProctorError::InvalidConfig(format!(
                "skin_ratio_threshold must be within 0-1, got {}",
                self.skin_ratio_threshold
            )));
        }
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return Err(ProctorError::InvalidConfig(format!(
                "fft_size must be a power of two >= 32, got {}",
                self.fft_size
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProctorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rapid_switch_window_ms, 5_000);
        assert_eq!(config.audio_dedup_ms, 10_000);
        assert_eq!(config.fft_size, 2048);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{ "audio_dedup_ms": 2000, "detectors": { "video": false } }"#;
        let config = ProctorConfig::from_json(json).unwrap();

        assert_eq!(config.audio_dedup_ms, 2000);
        assert_eq!(config.frame_interval_ms, 3_000);
        assert!(!config.detectors.video);
        assert!(config.detectors.audio);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let json = r#"{ "frame_interval_ms": 0 }"#;
        let result = ProctorConfig::from_json(json);
        assert!(matches!(result, Err(ProctorError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_orientation_band_rejected() {
        let config = ProctorConfig {
            orientation_min_delta_deg: 200.0,
            orientation_max_delta_deg: 100.0,
            ..ProctorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_orientation_seed_from_json() {
        let seeded = ProctorConfig::from_json(r#"{ "initial_orientation_deg": 90 }"#).unwrap();
        assert_eq!(seeded.initial_orientation_deg, Some(90.0));

        let unseeded = ProctorConfig::from_json(r#"{ "initial_orientation_deg": null }"#).unwrap();
        assert_eq!(unseeded.initial_orientation_deg, None);

        let default = ProctorConfig::from_json("{}").unwrap();
        assert_eq!(default.initial_orientation_deg, Some(0.0));
    }

    #[test]
    fn test_non_finite_orientation_seed_rejected() {
        let config = ProctorConfig {
            initial_orientation_deg: Some(f64::NAN),
            ..ProctorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ProctorError::InvalidConfig(_))));
    }

    #[test]
    fn test_fft_size_must_be_power_of_two() {
        let config = ProctorConfig {
            fft_size: 1000,
            ..ProctorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_preserves_toggles() {
        let mut config = ProctorConfig::default();
        config.detectors.orientation = false;
        let parsed = ProctorConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
