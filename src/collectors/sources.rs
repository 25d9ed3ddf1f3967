//! Host capability traits
//!
//! The engine only reads from these handles. It never stops the host's media stream;
//! the one resource it owns is the transient audio analysis context, which it
//! releases through [`AudioSource::release`] when monitoring stops.

use crate::error::ProctorError;
use crate::observation::TrackStatus;

/// One decoded video frame in RGBA byte order at native resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, ProctorError> {
        if width == 0 || height == 0 {
            return Err(ProctorError::InvalidFrame(format!(
                "frame has no pixels ({}x{})",
                width, height
            )));
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(ProctorError::InvalidFrame(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Frame filled with a single colour
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, ProctorError> {
        let pixels = width as usize * height as usize;
        let mut rgba = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self::new(width, height, rgba)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGB triples, alpha dropped
    pub fn pixels(&self) -> impl Iterator<Item = (u8, u8, u8)> + '_ {
        self.rgba.chunks_exact(4).map(|px| (px[0], px[1], px[2]))
    }
}

/// Read-only handle to the live self-view video
pub trait FrameSource: Send {
    /// Called when monitoring starts. `Err(Unavailable)` disables the video collector.
    fn start(&mut self) -> Result<(), ProctorError> {
        Ok(())
    }

    /// Current frame. `Ok(None)` when not enough data is buffered or a previous draw
    /// is still in flight; the tick is skipped.
    fn capture(&mut self) -> Result<Option<VideoFrame>, ProctorError>;
}

/// Frequency analysis of the live microphone track
pub trait AudioSource: Send {
    /// Build the analysis graph. `Err(Unavailable)` disables the audio collector.
    fn start(&mut self, fft_size: usize) -> Result<(), ProctorError>;

    /// Byte magnitudes for `fft_size / 2` bins. `Ok(None)` when the analyser is not ready.
    fn frequency_data(&mut self) -> Result<Option<Vec<u8>>, ProctorError>;

    /// Close the analysis context created by `start`. Must be idempotent.
    fn release(&mut self);
}

/// Read-only view of the host media stream's video tracks
pub trait StreamProbe: Send {
    fn start(&mut self) -> Result<(), ProctorError> {
        Ok(())
    }

    fn video_tracks(&mut self) -> Result<Vec<TrackStatus>, ProctorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_validation() {
        assert!(VideoFrame::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            VideoFrame::new(2, 2, vec![0; 15]),
            Err(ProctorError::InvalidFrame(_))
        ));
        assert!(VideoFrame::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_pixels_drop_alpha() {
        let frame = VideoFrame::new(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let pixels: Vec<_> = frame.pixels().collect();
        assert_eq!(pixels, vec![(1, 2, 3), (5, 6, 7)]);
        assert_eq!(frame.pixel_count(), 2);
    }

    #[test]
    fn test_solid_frame() {
        let frame = VideoFrame::solid(4, 3, [200, 120, 90]).unwrap();
        assert_eq!(frame.pixel_count(), 12);
        assert!(frame.pixels().all(|px| px == (200, 120, 90)));
    }
}
