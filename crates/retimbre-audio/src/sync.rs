//! Duration synchronization against a reference recording.

use crate::buffer::AudioBuffer;
use crate::error::{Error, Result};
use tracing::debug;

/// A rendered buffer and its copy trimmed to the reference duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Synchronized {
    /// Rendered audio, unmodified
    pub original: AudioBuffer,
    /// At most `floor(reference_duration * sample_rate)` samples of `original`
    pub adjusted: AudioBuffer,
}

/// Trim `rendered` to `reference_duration` seconds.
///
/// A buffer already shorter than the reference is kept whole; silence is
/// never appended.
pub fn synchronize(rendered: AudioBuffer, reference_duration: f64) -> Result<Synchronized> {
    if !reference_duration.is_finite() || reference_duration < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "reference duration must be a non-negative number of seconds, got {}",
            reference_duration
        )));
    }

    let limit = rendered.samples_for(reference_duration);
    let adjusted = rendered.clone().truncated(limit);

    debug!(
        "Synchronized render: {} samples -> {} (reference {:.3}s)",
        rendered.len(),
        adjusted.len(),
        reference_duration
    );

    Ok(Synchronized {
        original: rendered,
        adjusted,
    })
}
