//! Frequency snapshot summary

/// Peak and mean magnitude of one frequency-domain snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumSummary {
    pub peak: f64,
    pub mean: f64,
    pub bins: usize,
}

impl SpectrumSummary {
    /// `None` for an empty snapshot
    pub fn from_bins(bins: &[u8]) -> Option<Self> {
        if bins.is_empty() {
            return None;
        }
        let peak = bins.iter().copied().max().unwrap_or(0) as f64;
        let sum: u64 = bins.iter().map(|&b| b as u64).sum();
        Some(Self {
            peak,
            mean: sum as f64 / bins.len() as f64,
            bins: bins.len(),
        })
    }
}
