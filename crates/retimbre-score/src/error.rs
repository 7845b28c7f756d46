//! Error types for score parsing and rewriting.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI parse error: {0}")]
    MidiFileParse(String),

    #[error("Unsupported MIDI timing format")]
    MidiUnsupportedTiming,

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Invalid MIDI channel: {0} (expected 0-15)")]
    InvalidChannel(u8),

    #[error("Score has no tracks")]
    EmptyScore,
}

impl From<midly::Error> for Error {
    fn from(e: midly::Error) -> Self {
        Error::MidiFileParse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
