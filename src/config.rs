//! Configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.
//!
//! ```toml
//! workspace = "studio"
//! soundbank = "assets/soundfonts/FluidR3_GM.sf2"
//! wav_bit_depth = "int24"
//! fft_size = "large"
//!
//! [tools.transcriber]
//! program = "transcribe-midi"
//! args = ["--audio", "{input}", "--midi", "{output}"]
//! timeout_secs = 600
//! ```

use crate::error::{Error, Result};
use retimbre_audio::{BitDepth, FftSize, ResampleQuality};
use retimbre_score::Instrument;
use retimbre_tools::ToolCommand;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Commands for the three external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub synthesizer: ToolCommand,
    pub transcoder: ToolCommand,
    /// Unconfigured by default; ingest fails until a program is set
    pub transcriber: ToolCommand,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            synthesizer: ToolCommand::synthesizer(),
            transcoder: ToolCommand::transcoder(),
            transcriber: ToolCommand::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the score and audio slots
    pub workspace: PathBuf,
    /// Sound bank handed to the synthesizer
    pub soundbank: PathBuf,
    /// Instrument used when a render request names none
    pub default_instrument: Instrument,
    pub wav_bit_depth: BitDepth,
    pub fft_size: FftSize,
    pub resample_quality: ResampleQuality,
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("workspace"),
            soundbank: PathBuf::from("assets/soundfonts/FluidR3_GM.sf2"),
            default_instrument: Instrument::default(),
            wav_bit_depth: BitDepth::default(),
            fft_size: FftSize::default(),
            resample_quality: ResampleQuality::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::not_found("configuration file", path),
            _ => Error::Io(e),
        })?;
        let config = Self::from_toml(&contents)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn workspace(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace = path.into();
        self
    }

    pub fn soundbank(mut self, path: impl Into<PathBuf>) -> Self {
        self.soundbank = path.into();
        self
    }

    pub fn default_instrument(mut self, instrument: Instrument) -> Self {
        self.default_instrument = instrument;
        self
    }

    pub fn wav_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.wav_bit_depth = bit_depth;
        self
    }

    pub fn fft_size(mut self, fft_size: FftSize) -> Self {
        self.fft_size = fft_size;
        self
    }

    pub fn resample_quality(mut self, quality: ResampleQuality) -> Self {
        self.resample_quality = quality;
        self
    }

    pub fn synthesizer(mut self, command: ToolCommand) -> Self {
        self.tools.synthesizer = command;
        self
    }

    pub fn transcoder(mut self, command: ToolCommand) -> Self {
        self.tools.transcoder = command;
        self
    }

    pub fn transcriber(mut self, command: ToolCommand) -> Self {
        self.tools.transcriber = command;
        self
    }
}
