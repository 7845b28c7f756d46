//! # retimbre - Re-orchestrate a recording for another instrument
//!
//! A recording is transcribed to a MIDI score, the score is rewritten so
//! every melodic channel plays one instrument, and the result is rendered
//! back to audio and trimmed to the recording's length.
//!
//! ## Architecture
//!
//! retimbre is an umbrella crate that coordinates:
//! - **retimbre-score** - Score model, instrument catalog, rewriting
//! - **retimbre-audio** - WAV I/O, trimming, transposition, concatenation
//! - **retimbre-tools** - External transcoder, transcriber and synthesizer
//!
//! This crate adds the on-disk [`Workspace`], its configuration and the
//! [`Session`] that runs pipeline requests against it.
//!
//! ## Quick Start
//!
//! ```ignore
//! use retimbre::prelude::*;
//!
//! let config = Config::load(Path::new("retimbre.toml"))?;
//! let session = Session::open(&config)?;
//!
//! session.ingest(Path::new("take.mp3"))?;
//! session.render("violin")?;
//! session.transpose(-5)?;
//! ```

/// Re-export of retimbre-score for direct access
pub use retimbre_score as score;

/// Re-export of retimbre-audio for direct access
pub use retimbre_audio as audio;

/// Re-export of retimbre-tools for direct access
pub use retimbre_tools as tools;

pub use retimbre_audio::AudioBuffer;
pub use retimbre_score::{Instrument, Score};
pub use retimbre_tools::{CommandTool, ExternalTool, Invocation, ToolCommand};

pub mod error;
pub use error::{Error, ErrorKind, Result, Stage};

mod config;
pub use config::{Config, ToolsConfig};

mod workspace;
pub use workspace::{Slot, Workspace};

pub mod synthesis;

mod session;
pub use session::{
    parse_steps, ConcatReport, IngestReport, RenderReport, Session, Tools, TransposeReport,
};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Config, Error, ErrorKind, Result, Session, Slot, Workspace};

    pub use crate::audio::{AudioBuffer, BitDepth, FftSize, ResampleQuality};
    pub use crate::score::Instrument;
    pub use crate::tools::{ExternalTool, Invocation, ToolCommand};

    pub use std::path::Path;
}
