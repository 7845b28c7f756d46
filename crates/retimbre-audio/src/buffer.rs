//! Mono sample buffers.

use crate::error::{Error, Result};

/// Mono audio at a fixed sample rate.
///
/// Buffers are owned values handed from stage to stage; every transform
/// consumes its input or returns a new buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidData("sample rate must be non-zero".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Rate already validated by the buffer it came from.
    pub(crate) fn from_parts(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// `num_samples` of silence.
    pub fn silent(num_samples: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![0.0; num_samples], sample_rate)
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Number of whole samples covering `seconds` at this rate.
    pub fn samples_for(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.sample_rate as f64).floor() as usize
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    /// Keep at most the first `len` samples.
    pub fn truncated(mut self, len: usize) -> Self {
        self.samples.truncate(len);
        self
    }

    /// Scale so the loudest sample has magnitude 1.0.
    ///
    /// Silent buffers are returned unchanged.
    pub fn normalized(mut self) -> Self {
        normalize_peak(&mut self.samples);
        self
    }

    /// Append `other`, which must share this buffer's sample rate.
    pub fn append(&mut self, other: &AudioBuffer) -> Result<()> {
        if other.sample_rate != self.sample_rate {
            return Err(Error::InvalidData(format!(
                "sample rate mismatch: {} Hz vs {} Hz",
                self.sample_rate, other.sample_rate
            )));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }
}

/// Peak-normalize `samples` in place to a maximum magnitude of 1.0.
pub fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }

    let gain = 1.0 / peak;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}
