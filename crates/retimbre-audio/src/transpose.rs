//! Pitch transposition with duration correction.
//!
//! A shift by `n` semitones stretches the buffer by `2^(n/12)` and resamples
//! it back by the inverse ratio, which raises or lowers every partial by the
//! same factor. Rounding in both steps leaves a small length drift; when it
//! exceeds [`DRIFT_TOLERANCE_SECS`] a single corrective stretch is applied.
//! The corrected length is not re-checked.

use crate::buffer::AudioBuffer;
use crate::error::{Error, Result};
use crate::resample::{resample_by, ResampleQuality};
use crate::time_stretch::{time_stretch, FftSize, TimeStretchParams};
use tracing::{debug, info};

/// Largest shift accepted in either direction (two octaves).
pub const MAX_STEPS: i32 = 24;

/// Duration mismatch tolerated before a corrective stretch.
pub const DRIFT_TOLERANCE_SECS: f64 = 0.01;

/// Frequency ratio of `steps` equal-tempered semitones.
#[inline]
pub fn semitone_ratio(steps: i32) -> f64 {
    2.0_f64.powf(steps as f64 / 12.0)
}

/// Pitch shifter with a fixed vocoder and resampler configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transposer {
    fft_size: FftSize,
    quality: ResampleQuality,
}

impl Transposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fft_size(mut self, fft_size: FftSize) -> Self {
        self.fft_size = fft_size;
        self
    }

    pub fn resample_quality(mut self, quality: ResampleQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Shift pitch by `steps` semitones. Duration is approximately kept.
    pub fn pitch_shift(&self, buffer: &AudioBuffer, steps: i32) -> Result<AudioBuffer> {
        validate_steps(steps)?;

        let ratio = semitone_ratio(steps);
        let params = TimeStretchParams::new()
            .stretch_factor(ratio)
            .fft_size(self.fft_size);
        let stretched = time_stretch(buffer, &params);
        let samples = resample_by(stretched.samples(), 1.0 / ratio, self.quality)?;

        AudioBuffer::new(samples, buffer.sample_rate())
    }

    /// Shift `reference` by `steps` semitones and match its duration.
    ///
    /// The result is peak-normalized.
    pub fn transpose(&self, reference: &AudioBuffer, steps: i32) -> Result<AudioBuffer> {
        validate_steps(steps)?;

        let reference_duration = reference.duration();
        let shifted = self.pitch_shift(reference, steps)?;
        let shifted_duration = shifted.duration();
        let drift = reference_duration - shifted_duration;

        let corrected = if drift.abs() > DRIFT_TOLERANCE_SECS && shifted_duration > 0.0 {
            let factor = reference_duration / shifted_duration;
            debug!(
                "Correcting duration drift of {:.4}s (stretch {:.5})",
                drift, factor
            );
            let params = TimeStretchParams::new()
                .stretch_factor(factor)
                .fft_size(self.fft_size);
            time_stretch(&shifted, &params)
        } else {
            shifted
        };

        info!(
            "Transposed {:+} semitones: {:.3}s -> {:.3}s",
            steps,
            reference_duration,
            corrected.duration()
        );

        Ok(corrected.normalized())
    }
}

/// Shift `reference` by `steps` semitones with the default configuration.
pub fn transpose(reference: &AudioBuffer, steps: i32) -> Result<AudioBuffer> {
    Transposer::new().transpose(reference, steps)
}

fn validate_steps(steps: i32) -> Result<()> {
    if (-MAX_STEPS..=MAX_STEPS).contains(&steps) {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "steps must be within ±{}, got {}",
            MAX_STEPS, steps
        )))
    }
}
