//! Error types for external tool invocation.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Program not found on PATH or at the configured location
    #[error("Program not found: {program}")]
    ProgramNotFound { program: String },

    /// Failed to spawn the process
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Process did not finish in time and was killed
    #[error("{program} timed out after {timeout_secs:.1} seconds")]
    Timeout { program: String, timeout_secs: f64 },

    /// Process exited with non-zero status
    #[error("{program} exited with status {exit_code}: {stderr}")]
    ProcessFailed {
        program: String,
        exit_code: i32,
        stderr: String,
    },

    /// Process succeeded but left no usable output
    #[error("Expected output file missing or empty: {}", .path.display())]
    MissingArtifact { path: PathBuf },

    /// Argument template names an input the invocation does not bind
    #[error("Unbound placeholder {{{name}}} in argument template")]
    UnboundPlaceholder { name: String },

    /// Command has no program configured
    #[error("No program configured for {tool}")]
    NotConfigured { tool: String },

    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn process_failed(
        program: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::ProcessFailed {
            program: program.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
