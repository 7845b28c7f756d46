//! Pipeline requests against a locked workspace.
//!
//! A [`Session`] holds the workspace lock for its whole lifetime, so two
//! sessions on the same directory never interleave. Every request validates
//! its arguments before touching the workspace or spawning a process, and
//! persists its results only once everything else has succeeded.

use crate::config::{Config, ToolsConfig};
use crate::error::{Error, Result, Stage};
use crate::synthesis;
use crate::workspace::{write_atomic, Slot, Workspace};
use retimbre_audio::{
    encode_wav_memory, read_wav, synchronize, AudioBuffer, Concatenator, ResampleQuality,
    Transposer, WavConfig, MAX_STEPS,
};
use retimbre_score::{rewrite, Instrument, RewriteSummary, Score};
use retimbre_tools::{CommandTool, ExternalTool, Invocation};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The external collaborators a session delegates to.
pub struct Tools {
    pub synthesizer: Box<dyn ExternalTool>,
    pub transcoder: Box<dyn ExternalTool>,
    pub transcriber: Box<dyn ExternalTool>,
}

impl Tools {
    /// Subprocess-backed tools from their configured commands.
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            synthesizer: Box::new(CommandTool::new("synthesizer", config.synthesizer.clone())),
            transcoder: Box::new(CommandTool::new("transcoder", config.transcoder.clone())),
            transcriber: Box::new(CommandTool::new("transcriber", config.transcriber.clone())),
        }
    }
}

impl fmt::Debug for Tools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tools")
            .field("synthesizer", &self.synthesizer.name())
            .field("transcoder", &self.transcoder.name())
            .field("transcriber", &self.transcriber.name())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub reference: PathBuf,
    pub score: PathBuf,
    /// Reference duration in seconds
    pub duration: f64,
    pub sample_rate: u32,
    pub tracks: usize,
    pub events: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub instrument: Instrument,
    pub rewrite: RewriteSummary,
    pub reference_duration: f64,
    /// Duration of the full render
    pub original_duration: f64,
    /// Duration after trimming to the reference
    pub adjusted_duration: f64,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransposeReport {
    pub steps: i32,
    pub reference_duration: f64,
    pub duration: f64,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcatReport {
    pub segments: usize,
    pub duration: f64,
    pub sample_rate: u32,
    pub output: PathBuf,
}

/// Exclusive handle on a workspace.
pub struct Session {
    workspace: Workspace,
    tools: Tools,
    soundbank: PathBuf,
    default_instrument: Instrument,
    wav: WavConfig,
    transposer: Transposer,
    quality: ResampleQuality,
    _lock: File,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("workspace", &self.workspace)
            .field("tools", &self.tools)
            .field("soundbank", &self.soundbank)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open the configured workspace, waiting for any other session to finish.
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_tools(config, Tools::from_config(&config.tools))
    }

    /// Open the configured workspace, failing with `Locked` if it is in use.
    pub fn try_open(config: &Config) -> Result<Self> {
        let workspace = Workspace::open(&config.workspace)?;
        let lock = workspace.try_lock()?;
        Ok(Self::assemble(
            config,
            workspace,
            Tools::from_config(&config.tools),
            lock,
        ))
    }

    /// Open the configured workspace with caller-supplied tools.
    pub fn with_tools(config: &Config, tools: Tools) -> Result<Self> {
        let workspace = Workspace::open(&config.workspace)?;
        let lock = workspace.lock()?;
        Ok(Self::assemble(config, workspace, tools, lock))
    }

    fn assemble(config: &Config, workspace: Workspace, tools: Tools, lock: File) -> Self {
        Self {
            workspace,
            tools,
            soundbank: config.soundbank.clone(),
            default_instrument: config.default_instrument,
            wav: WavConfig::new(config.wav_bit_depth),
            transposer: Transposer::new()
                .fft_size(config.fft_size)
                .resample_quality(config.resample_quality),
            quality: config.resample_quality,
            _lock: lock,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn default_instrument(&self) -> Instrument {
        self.default_instrument
    }

    /// Transcode `recording` to the reference slot and transcribe it to the score slot.
    ///
    /// Both artifacts are produced in a scratch directory and validated
    /// (WAV decode, SMF parse) before either slot is replaced.
    pub fn ingest(&self, recording: &Path) -> Result<IngestReport> {
        if !recording.is_file() {
            return Err(Error::not_found("recording", recording));
        }

        let scratch = self.workspace.scratch_dir()?;
        let reference_tmp = scratch.path().join(Slot::Reference.file_name());
        let score_tmp = scratch.path().join(Slot::Score.file_name());

        transcode(self.tools.transcoder.as_ref(), recording, &reference_tmp)?;
        let reference = read_wav(&reference_tmp)?;

        let invocation = Invocation::new(&score_tmp).input("input", &reference_tmp);
        self.tools
            .transcriber
            .run(&invocation)
            .map_err(|e| Error::collaborator(Stage::Transcription, e))?;

        let bytes = std::fs::read(&score_tmp)?;
        let (tracks, events) = {
            let score = Score::parse(&bytes)?;
            (score.tracks.len(), score.event_count())
        };

        self.workspace.commit(&[
            (Slot::Reference, reference_tmp.as_path()),
            (Slot::Score, score_tmp.as_path()),
        ])?;
        let reference_path = self.workspace.path(Slot::Reference);
        let score_path = self.workspace.path(Slot::Score);

        info!(
            "Ingested {}: {:.3}s reference, {} tracks, {} events",
            recording.display(),
            reference.duration(),
            tracks,
            events
        );

        Ok(IngestReport {
            reference: reference_path,
            score: score_path,
            duration: reference.duration(),
            sample_rate: reference.sample_rate(),
            tracks,
            events,
        })
    }

    /// Re-orchestrate the score for the instrument named `key` and render it.
    pub fn render(&self, key: &str) -> Result<RenderReport> {
        let instrument: Instrument = key.parse()?;
        self.render_instrument(instrument)
    }

    /// Rewrite the score for `instrument`, synthesize it and trim the result.
    ///
    /// Replaces the score, original and adjusted slots. Nothing is written
    /// if any step fails.
    pub fn render_instrument(&self, instrument: Instrument) -> Result<RenderReport> {
        let score_path = self.workspace.require(Slot::Score)?;
        let reference_path = self.workspace.require(Slot::Reference)?;
        if !self.soundbank.is_file() {
            return Err(Error::not_found("sound bank", &self.soundbank));
        }

        let bytes = std::fs::read(&score_path)?;
        let mut score = Score::parse(&bytes)?;
        let summary = rewrite(&mut score, instrument)?;
        let rewritten = score.to_bytes()?;

        let reference_duration = read_wav(&reference_path)?.duration();

        let scratch = self.workspace.scratch_dir()?;
        let score_tmp = scratch.path().join(Slot::Score.file_name());
        std::fs::write(&score_tmp, &rewritten)?;

        let rendered = synthesis::render(
            self.tools.synthesizer.as_ref(),
            &score_tmp,
            &self.soundbank,
        )?;
        let synced = synchronize(rendered, reference_duration)?;

        let original_tmp = scratch.path().join(Slot::Original.file_name());
        let adjusted_tmp = scratch.path().join(Slot::Adjusted.file_name());
        std::fs::write(&original_tmp, encode_wav_memory(&synced.original, &self.wav)?)?;
        std::fs::write(&adjusted_tmp, encode_wav_memory(&synced.adjusted, &self.wav)?)?;

        self.workspace.commit(&[
            (Slot::Score, score_tmp.as_path()),
            (Slot::Original, original_tmp.as_path()),
            (Slot::Adjusted, adjusted_tmp.as_path()),
        ])?;

        info!(
            "Rendered for {}: {:.3}s, trimmed to {:.3}s",
            instrument.display_name(),
            synced.original.duration(),
            synced.adjusted.duration()
        );

        Ok(RenderReport {
            instrument,
            rewrite: summary,
            reference_duration,
            original_duration: synced.original.duration(),
            adjusted_duration: synced.adjusted.duration(),
            sample_rate: synced.original.sample_rate(),
        })
    }

    /// Transpose the original render by `steps` semitones into the adjusted slot.
    ///
    /// The original slot is left untouched, so repeated transpositions do
    /// not accumulate.
    pub fn transpose(&self, steps: i32) -> Result<TransposeReport> {
        check_steps(steps)?;
        let original_path = self.workspace.require(Slot::Original)?;

        let reference = read_wav(&original_path)?;
        let shifted = self.transposer.transpose(&reference, steps)?;
        let bytes = encode_wav_memory(&shifted, &self.wav)?;
        let output = self.workspace.write(Slot::Adjusted, &bytes)?;

        Ok(TransposeReport {
            steps,
            reference_duration: reference.duration(),
            duration: shifted.duration(),
            output,
        })
    }

    /// Join `segments` end to end into `output`, or the merged slot if `None`.
    ///
    /// Segments that are not WAV files are transcoded first. Each one is
    /// folded into the result as soon as it is decoded; a failure names the
    /// segment it came from.
    pub fn concatenate(&self, segments: &[PathBuf], output: Option<&Path>) -> Result<ConcatReport> {
        if segments.is_empty() {
            return Err(retimbre_audio::Error::NoSegments.into());
        }
        if let Some(missing) = segments.iter().find(|p| !p.is_file()) {
            return Err(Error::not_found("segment", missing));
        }

        let mut joined = Concatenator::new(self.quality);
        for (index, path) in segments.iter().enumerate() {
            self.decode_segment(index, path)
                .and_then(|segment| joined.push(segment).map_err(Error::from))
                .map_err(|e| Error::segment(index + 1, path, e))?;
        }

        let count = joined.segments();
        let merged = joined.finish()?;
        let bytes = encode_wav_memory(&merged, &self.wav)?;

        let output = match output {
            Some(path) => {
                write_atomic(path, &bytes)?;
                path.to_path_buf()
            }
            None => self.workspace.write(Slot::Merged, &bytes)?,
        };

        info!(
            "Concatenated {} segments: {:.3}s -> {}",
            count,
            merged.duration(),
            output.display()
        );

        Ok(ConcatReport {
            segments: count,
            duration: merged.duration(),
            sample_rate: merged.sample_rate(),
            output,
        })
    }

    fn decode_segment(&self, index: usize, path: &Path) -> Result<AudioBuffer> {
        if is_wav(path) {
            return Ok(read_wav(path)?);
        }

        debug!("Transcoding segment {}: {}", index, path.display());
        let scratch = self.workspace.scratch_dir()?;
        let wav = scratch.path().join(format!("segment-{}.wav", index));
        transcode(self.tools.transcoder.as_ref(), path, &wav)?;
        let buffer = read_wav(&wav)?;
        scratch.close()?;
        Ok(buffer)
    }
}

fn transcode(tool: &dyn ExternalTool, input: &Path, output: &Path) -> Result<PathBuf> {
    tool.run(&Invocation::new(output).input("input", input))
        .map_err(|e| Error::collaborator(Stage::Transcode, e))
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

fn check_steps(steps: i32) -> Result<i32> {
    if (-MAX_STEPS..=MAX_STEPS).contains(&steps) {
        Ok(steps)
    } else {
        Err(Error::InvalidParameter(format!(
            "steps must be between -{} and {}, got {}",
            MAX_STEPS, MAX_STEPS, steps
        )))
    }
}

/// Parse a semitone count from text. Non-integers and out-of-range values are rejected.
pub fn parse_steps(text: &str) -> Result<i32> {
    let steps = text
        .trim()
        .parse::<i32>()
        .map_err(|_| Error::InvalidParameter(format!("steps must be an integer, got {:?}", text)))?;
    check_steps(steps)
}
