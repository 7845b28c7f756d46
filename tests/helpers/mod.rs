//! Test helpers and fixtures for retimbre integration tests
//!
//! Pipeline tests never spawn real programs: [`FakeTool`] stands in for the
//! transcoder, transcriber and synthesizer and writes deterministic output.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (normalization, float WAV)
//! - `DURATION_TOLERANCE_SECS` (0.01): Transposed duration drift
//! - `CORRELATION_THRESHOLD` (0.99): Same signal after DSP
//! - `FREQUENCY_TOLERANCE_HZ` (8.0): Spectral peak estimates

#![allow(dead_code)]

pub mod tolerances;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use retimbre::prelude::*;
use retimbre::score::{Channel, Event, Track};
use retimbre::tools;
use retimbre::{Score, Tools};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Sample rate of generated fixtures. Low enough to keep vocoder tests fast.
pub const TEST_SAMPLE_RATE: u32 = 22050;

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: u32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Sine of `seconds` length with amplitude `amplitude`.
pub fn sine_seconds(frequency: f64, seconds: f64, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let len = (seconds * sample_rate as f64).round() as usize;
    generate_sine(frequency, sample_rate, len)
        .into_iter()
        .map(|s| s * amplitude)
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Normalized cross-correlation at lag zero over the common length.
pub fn correlation(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (mut ab, mut aa, mut bb) = (0.0_f64, 0.0_f64, 0.0_f64);
    for i in 0..n {
        let (x, y) = (a[i] as f64, b[i] as f64);
        ab += x * y;
        aa += x * x;
        bb += y * y;
    }
    if aa == 0.0 || bb == 0.0 {
        return 0.0;
    }
    (ab / (aa.sqrt() * bb.sqrt())) as f32
}

/// Frequency of the strongest bin over an 8192-sample window from the middle.
pub fn dominant_frequency(samples: &[f32], sample_rate: u32) -> f32 {
    let n = 8192;
    assert!(samples.len() >= n, "Signal too short for spectral analysis");
    let start = (samples.len() - n) / 2;

    let mut spectrum: Vec<Complex<f32>> = samples[start..start + n]
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let w = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos());
            Complex::new(s * w, 0.0)
        })
        .collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut spectrum);

    let bin = spectrum[1..n / 2]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
        .map(|(i, _)| i + 1)
        .unwrap_or(0);
    bin as f32 * sample_rate as f32 / n as f32
}

// =============================================================================
// WAV fixtures
// =============================================================================

/// Write a mono 32-bit float WAV.
pub fn write_wav_fixture(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).expect("Failed to create WAV fixture");
    for &s in samples {
        writer.write_sample(s).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV fixture");
}

/// Encode a mono 32-bit float WAV in memory.
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("fixture.wav");
    write_wav_fixture(&path, samples, sample_rate);
    std::fs::read(path).expect("Failed to read WAV fixture")
}

/// Read a WAV as mono f32 samples (first channel only) and its sample rate.
pub fn read_wav_fixture(path: &Path) -> (Vec<f32>, u32) {
    let mut reader = WavReader::open(path).expect("Failed to open WAV");
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().map(|s| s.unwrap()).collect(),
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.unwrap() as f32 * scale)
                .collect()
        }
    };
    let mono = samples.into_iter().step_by(channels).collect();
    (mono, spec.sample_rate)
}

pub fn wav_duration(path: &Path) -> f64 {
    let reader = WavReader::open(path).expect("Failed to open WAV");
    reader.duration() as f64 / reader.spec().sample_rate as f64
}

// =============================================================================
// Score fixtures
// =============================================================================

/// Two-track score: a lead line on channel 0 with its own tempo and
/// program, and a drum track on channel 9.
pub fn melody_score() -> Vec<u8> {
    let lead = Channel::new(0).unwrap();
    let drums = Channel::PERCUSSION;

    let lead_track = Track::new()
        .with(0, Event::tempo_bpm(90.0))
        .with(0, Event::ProgramChange { channel: lead, program: 5 })
        .with(0, Event::NoteOn { channel: lead, key: 60, velocity: 100 })
        .with(480, Event::NoteOff { channel: lead, key: 60, velocity: 0 })
        .with(0, Event::NoteOn { channel: lead, key: 64, velocity: 100 })
        .with(480, Event::NoteOff { channel: lead, key: 64, velocity: 0 });

    let drum_track = Track::new()
        .with(0, Event::NoteOn { channel: drums, key: 36, velocity: 110 })
        .with(240, Event::NoteOff { channel: drums, key: 36, velocity: 0 });

    Score::new(480)
        .with_track(lead_track)
        .with_track(drum_track)
        .to_bytes()
        .expect("Failed to encode score fixture")
}

// =============================================================================
// Fake external tools
// =============================================================================

/// What a [`FakeTool`] does when run.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Write a sine tone of the given length
    Sine {
        frequency: f64,
        seconds: f64,
        sample_rate: u32,
    },
    /// Copy the `input` file to the output
    CopyInput,
    /// Write fixed bytes
    Bytes(Vec<u8>),
    /// Fail as a process exiting with status 1
    Fail,
}

/// In-process stand-in for an external program.
///
/// Counts its runs and keeps a copy of the file bound to the `capture`
/// placeholder, read at the moment the tool runs.
#[derive(Debug, Clone)]
pub struct FakeTool {
    name: String,
    behavior: Behavior,
    capture: Option<&'static str>,
    calls: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakeTool {
    pub fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            capture: None,
            calls: Arc::new(AtomicUsize::new(0)),
            captured: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Synthesizer writing `seconds` of a 440 Hz tone at half amplitude.
    pub fn synth(seconds: f64) -> Self {
        Self::new(
            "synthesizer",
            Behavior::Sine {
                frequency: 440.0,
                seconds,
                sample_rate: TEST_SAMPLE_RATE,
            },
        )
        .capturing("score")
    }

    pub fn failing(name: &str) -> Self {
        Self::new(name, Behavior::Fail)
    }

    pub fn capturing(mut self, placeholder: &'static str) -> Self {
        self.capture = Some(placeholder);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> Vec<Vec<u8>> {
        self.captured.lock().unwrap().clone()
    }
}

impl ExternalTool for FakeTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, invocation: &Invocation) -> tools::Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(path) = self.capture.and_then(|name| invocation.get(name)) {
            let bytes = std::fs::read(path)?;
            self.captured.lock().unwrap().push(bytes);
        }

        let output = invocation.output();
        match &self.behavior {
            Behavior::Sine {
                frequency,
                seconds,
                sample_rate,
            } => {
                let samples = sine_seconds(*frequency, *seconds, *sample_rate, 0.5);
                write_wav_fixture(output, &samples, *sample_rate);
            }
            Behavior::CopyInput => {
                let input = invocation
                    .get("input")
                    .ok_or_else(|| tools::Error::UnboundPlaceholder {
                        name: "input".into(),
                    })?;
                std::fs::copy(input, output)?;
            }
            Behavior::Bytes(bytes) => std::fs::write(output, bytes)?,
            Behavior::Fail => {
                return Err(tools::Error::process_failed(
                    self.name.clone(),
                    1,
                    "simulated failure",
                ))
            }
        }
        Ok(output.to_path_buf())
    }
}

/// The three fakes of a session, kept so tests can inspect them after use.
#[derive(Debug, Clone)]
pub struct FakeTools {
    pub synthesizer: FakeTool,
    pub transcoder: FakeTool,
    pub transcriber: FakeTool,
}

impl FakeTools {
    pub fn new(synthesizer: FakeTool) -> Self {
        Self {
            synthesizer,
            transcoder: FakeTool::new("transcoder", Behavior::CopyInput),
            transcriber: FakeTool::new("transcriber", Behavior::Bytes(melody_score())),
        }
    }

    pub fn tools(&self) -> Tools {
        Tools {
            synthesizer: Box::new(self.synthesizer.clone()),
            transcoder: Box::new(self.transcoder.clone()),
            transcriber: Box::new(self.transcriber.clone()),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.synthesizer.calls() + self.transcoder.calls() + self.transcriber.calls()
    }
}

// =============================================================================
// Workspace fixture
// =============================================================================

/// A temporary directory holding a workspace and a placeholder sound bank.
pub struct TestBench {
    pub dir: TempDir,
    pub config: Config,
}

impl TestBench {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let soundbank = dir.path().join("bank.sf2");
        std::fs::write(&soundbank, b"sfbk").expect("Failed to write sound bank");

        let config = Config::new()
            .workspace(dir.path().join("workspace"))
            .soundbank(soundbank);
        Self { dir, config }
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.config.workspace
    }

    pub fn slot(&self, slot: Slot) -> PathBuf {
        self.config.workspace.join(slot.file_name())
    }

    /// Write a transcribed score and a reference tone of `reference_secs`.
    pub fn seed(&self, reference_secs: f64) {
        std::fs::create_dir_all(self.workspace_dir()).unwrap();
        std::fs::write(self.slot(Slot::Score), melody_score()).unwrap();
        write_wav_fixture(
            &self.slot(Slot::Reference),
            &sine_seconds(330.0, reference_secs, TEST_SAMPLE_RATE, 0.8),
            TEST_SAMPLE_RATE,
        );
    }

    /// Write an original render directly, as a previous render would have.
    pub fn seed_original(&self, samples: &[f32]) {
        std::fs::create_dir_all(self.workspace_dir()).unwrap();
        write_wav_fixture(&self.slot(Slot::Original), samples, TEST_SAMPLE_RATE);
    }

    pub fn session(&self, fakes: &FakeTools) -> Session {
        Session::with_tools(&self.config, fakes.tools()).expect("Failed to open session")
    }

    /// Names of temporary entries left in the workspace.
    pub fn leftovers(&self) -> Vec<String> {
        std::fs::read_dir(self.workspace_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|name| name.starts_with(".retimbre-"))
                    .collect()
            })
            .unwrap_or_default()
    }
}
