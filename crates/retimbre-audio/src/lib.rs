//! Offline audio processing for retimbre.
//!
//! Everything here works on whole mono [`AudioBuffer`]s held in memory:
//!
//! - WAV decoding (with mixdown) and encoding
//! - Peak normalization
//! - Trimming a render to a reference duration
//! - Phase-vocoder time-stretching and semitone transposition
//! - Sample rate conversion and concatenation

pub mod error;
pub use error::{Error, Result};

mod buffer;
pub use buffer::{normalize_peak, AudioBuffer};

mod wav;
pub use wav::{decode_wav_memory, encode_wav_memory, read_wav, write_wav, BitDepth, WavConfig};

mod resample;
pub use resample::{resample, resample_by, ResampleQuality};

pub mod time_stretch;
pub use time_stretch::{time_stretch, FftSize, PhaseVocoder, TimeStretchParams};

mod sync;
pub use sync::{synchronize, Synchronized};

mod transpose;
pub use transpose::{semitone_ratio, transpose, Transposer, DRIFT_TOLERANCE_SECS, MAX_STEPS};

mod concat;
pub use concat::{concatenate, Concatenator};
