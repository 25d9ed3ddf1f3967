//! Face-count estimation
//!
//! [`SkinToneEstimator`] is a placeholder heuristic: it counts skin-coloured pixels
//! and reports at most one face. It cannot tell one face from two; a trained detector
//! can be dropped in behind [`FaceCountEstimator`] without touching classification.

use crate::collectors::sources::VideoFrame;
use crate::error::ProctorError;

/// Estimated faces in one frame, plus the evidence the estimator used
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceEstimate {
    pub faces: u32,
    /// Fraction of pixels classified as skin, when the estimator computes one
    pub skin_ratio: Option<f64>,
}

pub trait FaceCountEstimator: Send {
    fn estimate(&self, frame: &VideoFrame) -> Result<FaceEstimate, ProctorError>;
}

/// Pixel colour-range heuristic
#[derive(Debug, Clone, Copy)]
pub struct SkinToneEstimator {
    /// Skin-pixel fraction above which one face is reported
    pub ratio_threshold: f64,
}

impl Default for SkinToneEstimator {
    fn default() -> Self {
        Self {
            ratio_threshold: 0.05,
        }
    }
}

impl SkinToneEstimator {
    pub fn new(ratio_threshold: f64) -> Self {
        Self { ratio_threshold }
    }

    /// RGB skin rule: r>95, g>40, b>20, channel spread >15, red dominant
    pub fn is_skin(r: u8, g: u8, b: u8) -> bool {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        r > 95 && g > 40 && b > 20 && (max - min) > 15 && r > g && r > b
    }

    pub fn skin_ratio(frame: &VideoFrame) -> f64 {
        let total = frame.pixel_count();
        if total == 0 {
            return 0.0;
        }
        let skin = frame
            .pixels()
            .filter(|&(r, g, b)| Self::is_skin(r, g, b))
            .count();
        skin as f64 / total as f64
    }
}

impl FaceCountEstimator for SkinToneEstimator {
    fn estimate(&self, frame: &VideoFrame) -> Result<FaceEstimate, ProctorError> {
        let ratio = Self::skin_ratio(frame);
        let faces = if ratio > self.ratio_threshold { 1 } else { 0 };
        Ok(FaceEstimate {
            faces,
            skin_ratio: Some(ratio),
        })
    }
}
