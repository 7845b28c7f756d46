//! Offline time-stretching.
//!
//! Changes the duration of a buffer without changing its pitch, using a
//! phase vocoder.
//!
//! # Example
//!
//! ```ignore
//! use retimbre_audio::{time_stretch, FftSize, TimeStretchParams};
//!
//! let params = TimeStretchParams::new()
//!     .stretch_factor(1.25)
//!     .fft_size(FftSize::Large);
//! let longer = time_stretch(&buffer, &params);
//! ```

mod phase_vocoder;
mod types;

pub use phase_vocoder::PhaseVocoder;
pub use types::{FftSize, TimeStretchParams};

use crate::buffer::AudioBuffer;
use tracing::debug;

/// Stretch `buffer` by `params.stretch_factor`, keeping its sample rate.
pub fn time_stretch(buffer: &AudioBuffer, params: &TimeStretchParams) -> AudioBuffer {
    if !params.is_active() {
        return buffer.clone();
    }

    let vocoder = PhaseVocoder::new(params.fft_size);
    let samples = vocoder.stretch(buffer.samples(), params.stretch_factor);
    debug!(
        "Time-stretched {} -> {} samples (factor {:.4}, fft {})",
        buffer.len(),
        samples.len(),
        params.stretch_factor,
        vocoder.fft_size()
    );

    AudioBuffer::from_parts(samples, buffer.sample_rate())
}
