//! Centralized error type for the retimbre umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate
//! boundaries, and classifies every failure with [`Error::kind`].

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// External process stage a collaborator failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcode,
    Transcription,
    Synthesis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Transcode => "transcode",
            Stage::Transcription => "transcription",
            Stage::Synthesis => "synthesis",
        })
    }
}

/// Coarse failure class, for callers that map errors to responses or exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request; rejected before anything was mutated or spawned
    Validation,
    /// A required workspace slot or input file does not exist
    NotFound,
    /// An external tool failed
    Collaborator,
    /// I/O, decode, encode or resample failure
    Internal,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Score: {0}")]
    Score(#[from] retimbre_score::Error),

    #[error("Audio: {0}")]
    Audio(#[from] retimbre_audio::Error),

    #[error("{stage} failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: retimbre_tools::Error,
    },

    /// A concatenation input failed; `index` counts from 1
    #[error("Segment {index} ({}): {source}", .path.display())]
    Segment {
        index: usize,
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("{what} not found: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Workspace is in use by another session: {}", .0.display())]
    Locked(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn collaborator(stage: Stage, source: retimbre_tools::Error) -> Self {
        Self::Collaborator { stage, source }
    }

    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }

    pub fn segment(index: usize, path: impl Into<PathBuf>, source: Error) -> Self {
        Self::Segment {
            index,
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use retimbre_audio::Error as AudioError;
        use retimbre_score::Error as ScoreError;

        match self {
            Error::Score(
                ScoreError::UnknownInstrument(_)
                | ScoreError::EmptyScore
                | ScoreError::MidiUnsupportedTiming
                | ScoreError::InvalidChannel(_),
            ) => ErrorKind::Validation,
            Error::Score(ScoreError::MidiFileParse(_) | ScoreError::Io(_)) => ErrorKind::Internal,
            Error::Audio(AudioError::InvalidParameter(_) | AudioError::NoSegments) => {
                ErrorKind::Validation
            }
            Error::Audio(_) => ErrorKind::Internal,
            Error::Collaborator { .. } => ErrorKind::Collaborator,
            Error::Segment { source, .. } => source.kind(),
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidParameter(_) | Error::Config(_) => ErrorKind::Validation,
            Error::Locked(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Stage of a collaborator failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Collaborator { stage, .. } => Some(*stage),
            Error::Segment { source, .. } => source.stage(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
