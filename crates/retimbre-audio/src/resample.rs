//! Audio resampling using rubato
//!
//! Sinc interpolation with an arbitrary ratio, used both for sample rate
//! conversion and for the rate change step of pitch shifting.

use crate::buffer::AudioBuffer;
use crate::error::{Error, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Resampling quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleQuality {
    /// Fast resampling (lower quality)
    Fast,
    /// Balanced quality/speed (default)
    #[default]
    Medium,
    /// High quality
    High,
}

impl ResampleQuality {
    fn chunk_size(&self) -> usize {
        match self {
            ResampleQuality::Fast => 512,
            ResampleQuality::Medium => 1024,
            ResampleQuality::High => 2048,
        }
    }

    fn sinc_len(&self) -> usize {
        match self {
            ResampleQuality::Fast => 64,
            ResampleQuality::Medium => 128,
            ResampleQuality::High => 256,
        }
    }

    fn sinc_params(&self) -> SincInterpolationParameters {
        let (oversampling_factor, interpolation) = match self {
            ResampleQuality::Fast => (64, SincInterpolationType::Linear),
            ResampleQuality::Medium => (128, SincInterpolationType::Linear),
            ResampleQuality::High => (256, SincInterpolationType::Cubic),
        };
        SincInterpolationParameters {
            sinc_len: self.sinc_len(),
            f_cutoff: 0.95,
            interpolation,
            oversampling_factor,
            window: WindowFunction::BlackmanHarris2,
        }
    }
}

fn resampler(ratio: f64, quality: ResampleQuality) -> Result<SincFixedIn<f32>> {
    Ok(SincFixedIn::<f32>::new(
        ratio,
        1.0,
        quality.sinc_params(),
        quality.chunk_size(),
        1,
    )?)
}

/// Feed `samples` through `resampler`, then flush until at least `min_len`
/// frames have come out.
fn drive(resampler: &mut SincFixedIn<f32>, samples: &[f32], min_len: usize) -> Result<Vec<f32>> {
    let mut output = Vec::with_capacity(min_len + resampler.output_frames_max());

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let chunk = resampler.process(&[&samples[pos..pos + needed]], None)?;
        output.extend_from_slice(&chunk[0]);
        pos += needed;
    }

    if pos < samples.len() {
        let chunk = resampler.process_partial(Some(&[&samples[pos..]]), None)?;
        output.extend_from_slice(&chunk[0]);
    }

    // Flush the filter tail
    while output.len() < min_len {
        let chunk = resampler.process_partial::<&[f32]>(None, None)?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    Ok(output)
}

/// Output offset of the resampler relative to the input timeline, located
/// by passing an impulse through a fresh instance.
///
/// Negative when output runs ahead of the input.
fn filter_delay(ratio: f64, quality: ResampleQuality) -> Result<isize> {
    let chunk_size = quality.chunk_size();
    let impulse_at = chunk_size / 2;
    let mut impulse = vec![0.0f32; chunk_size];
    impulse[impulse_at] = 1.0;

    let reach = ((chunk_size + 2 * quality.sinc_len()) as f64 * ratio).ceil() as usize;
    let response = drive(&mut resampler(ratio, quality)?, &impulse, reach)?;
    let peak = response
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(i, _)| i)
        .ok_or_else(|| Error::Resample("resampler produced no output".into()))?;

    Ok(peak as isize - (impulse_at as f64 * ratio).round() as isize)
}

/// Resample `samples` by `ratio` (output length / input length).
///
/// Returns exactly `round(samples.len() * ratio)` samples aligned with the
/// input timeline.
pub fn resample_by(samples: &[f32], ratio: f64, quality: ResampleQuality) -> Result<Vec<f32>> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "resample ratio must be positive, got {}",
            ratio
        )));
    }
    if (ratio - 1.0).abs() < f64::EPSILON {
        return Ok(samples.to_vec());
    }

    let expected = (samples.len() as f64 * ratio).round() as usize;
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let delay = filter_delay(ratio, quality)?;
    let skip = delay.max(0) as usize;
    let output = drive(&mut resampler(ratio, quality)?, samples, expected + skip)?;

    let mut output: Vec<f32> = if delay >= 0 {
        output.into_iter().skip(skip).take(expected).collect()
    } else {
        std::iter::repeat(0.0)
            .take(delay.unsigned_abs())
            .chain(output)
            .take(expected)
            .collect()
    };
    output.resize(expected, 0.0);
    Ok(output)
}

/// Convert `buffer` to `target_rate`.
pub fn resample(
    buffer: AudioBuffer,
    target_rate: u32,
    quality: ResampleQuality,
) -> Result<AudioBuffer> {
    if buffer.sample_rate() == target_rate {
        return Ok(buffer);
    }

    let ratio = target_rate as f64 / buffer.sample_rate() as f64;
    let samples = resample_by(buffer.samples(), ratio, quality)?;
    debug!(
        "Resampled {} Hz -> {} Hz ({} -> {} samples)",
        buffer.sample_rate(),
        target_rate,
        buffer.len(),
        samples.len()
    );

    AudioBuffer::new(samples, target_rate)
}
