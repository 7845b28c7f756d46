//! Phase Vocoder for offline time-stretching
//!
//! ## Algorithm Overview
//!
//! 1. **Analysis**: Window the input with a Hann window, FFT
//! 2. **Phase Unwrapping**: Estimate each bin's true frequency from the phase
//!    advance between consecutive frames
//! 3. **Resynthesis**: Advance a per-bin phase accumulator by that frequency
//!    over the synthesis hop, IFFT, window again and overlap-add
//! 4. **Normalization**: Divide by the summed squared window so the overlap
//!    gain is flat regardless of hop
//!
//! ## Hop Sizes
//!
//! The longer of the two hops is a quarter frame and the other is derived
//! from it through the stretch factor, so both analysis and synthesis keep
//! at least 75% overlap at any factor. Frame positions come from the exact
//! fractional hop and are rounded per frame, so long inputs do not drift from
//! the requested length.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use super::types::FftSize;

/// Envelope values below this are treated as uncovered output.
const MIN_ENVELOPE: f32 = 1e-3;

/// Phase Vocoder Processor
///
/// Holds the window, FFT plans and per-bin constants for one frame size.
/// Reusable across any number of [`stretch`](Self::stretch) calls.
pub struct PhaseVocoder {
    fft_size: usize,
    max_hop: usize,
    window: Vec<f32>,
    /// Center frequency of each bin in radians per sample
    bin_frequency: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl PhaseVocoder {
    pub fn new(fft_size: FftSize) -> Self {
        let size = fft_size.size();
        let num_bins = size / 2 + 1;

        let bin_frequency: Vec<f32> = (0..num_bins)
            .map(|k| 2.0 * PI * k as f32 / size as f32)
            .collect();

        let mut planner = FftPlanner::new();
        Self {
            fft_size: size,
            max_hop: fft_size.hop_size(),
            window: Self::create_hann_window(size),
            bin_frequency,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        }
    }

    /// Create a periodic Hann window of the specified size
    fn create_hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
            .collect()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Analysis and synthesis hop for `factor`, both at most a quarter frame.
    fn hops(&self, factor: f64) -> (f64, f64) {
        let synthesis = self.max_hop as f64 * factor.min(1.0);
        (synthesis / factor, synthesis)
    }

    /// Stretch `input` so its length is multiplied by `factor`.
    ///
    /// The result has exactly `round(input.len() * factor)` samples. Pitch is
    /// preserved.
    pub fn stretch(&self, input: &[f32], factor: f64) -> Vec<f32> {
        let target_len = (input.len() as f64 * factor).round() as usize;
        if input.is_empty() || target_len == 0 {
            return vec![0.0; target_len];
        }

        let n = self.fft_size;
        let num_bins = n / 2 + 1;
        let (hop_analysis, hop_synthesis) = self.hops(factor);
        let analysis_pos = |m: usize| (m as f64 * hop_analysis).round() as usize;
        let synthesis_pos = |m: usize| (m as f64 * hop_synthesis).round() as usize;

        // Leading silence long enough that input sample 0 lands where the
        // synthesis overlap is already complete
        let lead = n.max((n as f64 / factor).ceil() as usize);
        let num_frames = ((lead + input.len()) as f64 / hop_analysis).ceil() as usize + 1;
        let mut padded = vec![0.0f32; analysis_pos(num_frames - 1) + n];
        padded[lead..lead + input.len()].copy_from_slice(input);

        let out_len = synthesis_pos(num_frames - 1) + n;
        let mut output = vec![0.0f32; out_len];
        let mut envelope = vec![0.0f32; out_len];

        let mut spectrum = vec![Complex::new(0.0f32, 0.0); n];
        let scratch_len = self
            .forward
            .get_inplace_scratch_len()
            .max(self.inverse.get_inplace_scratch_len());
        let mut scratch = vec![Complex::new(0.0f32, 0.0); scratch_len];
        let mut last_phase = vec![0.0f32; num_bins];
        let mut phase_accumulator = vec![0.0f32; num_bins];
        let scale = 1.0 / n as f32;

        for m in 0..num_frames {
            // 1. Windowed analysis frame
            let start = analysis_pos(m);
            for (i, bin) in spectrum.iter_mut().enumerate() {
                *bin = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.forward.process_with_scratch(&mut spectrum, &mut scratch);

            // 2. Phase unwrapping and accumulation over the actual rounded hops
            let out_pos = synthesis_pos(m);
            let (hop_in, hop_out) = if m == 0 {
                (0, 0)
            } else {
                (start - analysis_pos(m - 1), out_pos - synthesis_pos(m - 1))
            };

            for k in 0..num_bins {
                let magnitude = spectrum[k].norm();
                let phase = spectrum[k].arg();

                if hop_in == 0 {
                    phase_accumulator[k] = phase;
                } else {
                    let omega = self.bin_frequency[k];
                    let deviation =
                        Self::wrap_phase(phase - last_phase[k] - omega * hop_in as f32);
                    let true_freq = omega + deviation / hop_in as f32;
                    phase_accumulator[k] =
                        Self::wrap_phase(phase_accumulator[k] + true_freq * hop_out as f32);
                }
                last_phase[k] = phase;

                spectrum[k] = Complex::from_polar(magnitude, phase_accumulator[k]);
            }

            // 3. Mirror for real-valued output (conjugate symmetry)
            for k in 1..n - num_bins + 1 {
                spectrum[n - k] = spectrum[k].conj();
            }

            self.inverse.process_with_scratch(&mut spectrum, &mut scratch);

            // 4. Synthesis window and overlap-add
            for i in 0..n {
                let w = self.window[i];
                output[out_pos + i] += spectrum[i].re * scale * w;
                envelope[out_pos + i] += w * w;
            }
        }

        for (sample, &env) in output.iter_mut().zip(envelope.iter()) {
            if env > MIN_ENVELOPE {
                *sample /= env;
            }
        }

        // Analysis position p maps to synthesis position p * factor
        let offset = (lead as f64 * factor).round() as usize;
        let mut stretched: Vec<f32> = output
            .into_iter()
            .skip(offset)
            .take(target_len)
            .collect();
        stretched.resize(target_len, 0.0);
        stretched
    }

    /// Wrap phase to [-PI, PI]
    #[inline]
    fn wrap_phase(phase: f32) -> f32 {
        let two_pi = 2.0 * PI;
        phase - two_pi * ((phase + PI) / two_pi).floor()
    }
}
