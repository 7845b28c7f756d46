//! Error types for retimbre-audio

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// WAV container could not be decoded or encoded
    #[error("WAV error: {0}")]
    Wav(String),

    /// Resampling error
    #[error("Resampling error: {0}")]
    Resample(String),

    /// Caller-supplied parameter out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Concatenation requested with nothing to join
    #[error("No segments to concatenate")]
    NoSegments,

    /// Invalid audio data
    #[error("Invalid audio data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => Error::Io(io),
            other => Error::Wav(other.to_string()),
        }
    }
}

impl From<rubato::ResamplerConstructionError> for Error {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        Error::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for Error {
    fn from(e: rubato::ResampleError) -> Self {
        Error::Resample(e.to_string())
    }
}
