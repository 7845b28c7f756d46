//! Time-stretching types and parameters.

use serde::{Deserialize, Serialize};

/// Time-stretch parameters
///
/// ## Range Limits
///
/// - `stretch_factor`: 0.25 - 4.0 (quarter length to four times the length)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStretchParams {
    /// Duration multiplier (1.0 = unchanged, 2.0 = twice as long, 0.5 = half as long)
    pub stretch_factor: f64,

    /// Analysis frame size
    pub fft_size: FftSize,
}

impl TimeStretchParams {
    /// Minimum stretch factor
    pub const MIN_STRETCH: f64 = 0.25;
    /// Maximum stretch factor
    pub const MAX_STRETCH: f64 = 4.0;

    /// Parameters with no effect.
    pub fn new() -> Self {
        Self {
            stretch_factor: 1.0,
            fft_size: FftSize::default(),
        }
    }

    pub fn stretch_factor(mut self, factor: f64) -> Self {
        self.stretch_factor = if factor.is_finite() {
            factor.clamp(Self::MIN_STRETCH, Self::MAX_STRETCH)
        } else {
            1.0
        };
        self
    }

    pub fn fft_size(mut self, fft_size: FftSize) -> Self {
        self.fft_size = fft_size;
        self
    }

    /// Check if the stretch changes anything
    pub fn is_active(&self) -> bool {
        (self.stretch_factor - 1.0).abs() > 1e-6
    }
}

impl Default for TimeStretchParams {
    fn default() -> Self {
        Self::new()
    }
}

/// FFT size presets for the phase vocoder
///
/// Larger frames resolve low partials better but smear transients.
///
/// - **Small (1024)**: percussive material
/// - **Medium (2048)**: default, good for melodic lines
/// - **Large (4096)**: sustained, low-register material
/// - **XLarge (8192)**: extreme stretching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FftSize {
    Small = 1024,

    #[default]
    Medium = 2048,

    Large = 4096,

    XLarge = 8192,
}

impl FftSize {
    /// Get the FFT size as usize
    pub fn size(&self) -> usize {
        *self as usize
    }

    /// Get the analysis hop size (FFT size / 4 = 75% overlap)
    pub fn hop_size(&self) -> usize {
        self.size() / 4
    }

    /// Frequency resolution in Hz at the given sample rate
    pub fn bin_width(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 / self.size() as f64
    }
}
