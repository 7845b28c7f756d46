//! Tolerance constants for pipeline tests.
//!
//! Different checks need different precision levels.

/// Floating point rounding errors (exact gain, lossless float WAV round trips).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Allowed duration mismatch after transposition, in seconds.
pub const DURATION_TOLERANCE_SECS: f64 = 0.01;

/// Minimum normalized correlation for "the same signal" after DSP.
pub const CORRELATION_THRESHOLD: f32 = 0.99;

/// Allowed error in a dominant-frequency estimate, in Hz.
///
/// A few bins at 22.05 kHz with an 8192-point FFT.
pub const FREQUENCY_TOLERANCE_HZ: f32 = 8.0;

/// 16-bit quantization step size.
pub const INT16_EPSILON: f32 = 1.0 / 32768.0;
