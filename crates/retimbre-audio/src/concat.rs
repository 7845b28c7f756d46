//! Sequential concatenation of buffers.

use crate::buffer::AudioBuffer;
use crate::error::{Error, Result};
use crate::resample::{resample, ResampleQuality};
use tracing::debug;

/// Folds segments end to end as they arrive.
///
/// The result takes the first segment's sample rate; later segments at a
/// different rate are resampled before being appended. Each pushed segment
/// is dropped once its samples are copied in.
#[derive(Debug)]
pub struct Concatenator {
    joined: Option<AudioBuffer>,
    quality: ResampleQuality,
    count: usize,
}

impl Concatenator {
    pub fn new(quality: ResampleQuality) -> Self {
        Self {
            joined: None,
            quality,
            count: 0,
        }
    }

    pub fn push(&mut self, segment: AudioBuffer) -> Result<()> {
        match self.joined.as_mut() {
            None => self.joined = Some(segment),
            Some(joined) => {
                let segment = resample(segment, joined.sample_rate(), self.quality)?;
                joined.append(&segment)?;
            }
        }
        self.count += 1;
        Ok(())
    }

    /// Number of segments pushed so far.
    pub fn segments(&self) -> usize {
        self.count
    }

    pub fn finish(self) -> Result<AudioBuffer> {
        let joined = self.joined.ok_or(Error::NoSegments)?;
        debug!(
            "Concatenated {} segments: {} samples ({:.3}s)",
            self.count,
            joined.len(),
            joined.duration()
        );
        Ok(joined)
    }
}

/// Join `segments` end to end with no gap or cross-fade.
pub fn concatenate<I>(segments: I, quality: ResampleQuality) -> Result<AudioBuffer>
where
    I: IntoIterator<Item = AudioBuffer>,
{
    let mut joined = Concatenator::new(quality);
    for segment in segments {
        joined.push(segment)?;
    }
    joined.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f32, len: usize, sample_rate: u32) -> AudioBuffer {
        AudioBuffer::new(vec![value; len], sample_rate).unwrap()
    }

    #[test]
    fn test_no_segments() {
        assert!(matches!(
            concatenate(Vec::new(), ResampleQuality::Fast),
            Err(Error::NoSegments)
        ));
    }

    #[test]
    fn test_single_segment_identity() {
        let a = constant(0.3, 100, 8000);
        assert_eq!(concatenate(vec![a.clone()], ResampleQuality::Fast).unwrap(), a);
    }

    #[test]
    fn test_order_and_length() {
        let a = constant(0.1, 16000, 8000);
        let b = constant(-0.2, 24000, 8000);
        let joined = concatenate(vec![a, b], ResampleQuality::Fast).unwrap();

        assert_eq!(joined.len(), 40000);
        assert!((joined.duration() - 5.0).abs() < 1.0 / 8000.0);
        assert_eq!(joined.samples()[15999], 0.1);
        assert_eq!(joined.samples()[16000], -0.2);
    }

    #[test]
    fn test_incremental_push() {
        let mut joined = Concatenator::new(ResampleQuality::Fast);
        assert_eq!(joined.segments(), 0);

        joined.push(constant(0.5, 100, 8000)).unwrap();
        joined.push(constant(0.25, 16000, 16000)).unwrap();
        assert_eq!(joined.segments(), 2);

        let out = joined.finish().unwrap();
        assert_eq!(out.sample_rate(), 8000);
        assert_eq!(out.len(), 8100);
        assert_eq!(out.samples()[99], 0.5);
    }

    #[test]
    fn test_finish_without_segments() {
        let joined = Concatenator::new(ResampleQuality::Fast);
        assert!(matches!(joined.finish(), Err(Error::NoSegments)));
    }

    #[test]
    fn test_mismatched_rate_resampled() {
        let a = constant(0.0, 44100, 44100);
        let b = constant(0.0, 48000, 48000);
        let joined = concatenate(vec![a, b], ResampleQuality::Medium).unwrap();

        assert_eq!(joined.sample_rate(), 44100);
        assert_eq!(joined.len(), 88200);
    }
}
