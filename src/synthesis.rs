//! Score-to-audio rendering through the external synthesizer.

use crate::error::{Error, Result, Stage};
use retimbre_audio::{read_wav, AudioBuffer};
use retimbre_tools::{ExternalTool, Invocation};
use std::path::Path;
use tracing::{debug, info};

/// Placeholder bound to the score file.
pub const SCORE: &str = "score";
/// Placeholder bound to the sound bank.
pub const SOUNDBANK: &str = "soundbank";

/// Render `score` with `soundbank` and return the peak-normalized result.
///
/// The synthesizer writes into a temporary directory next to the score,
/// which is removed before returning. Any tool failure, including a
/// missing or empty output file, is a `Synthesis` collaborator error.
/// A silent render is returned as is.
pub fn render(tool: &dyn ExternalTool, score: &Path, soundbank: &Path) -> Result<AudioBuffer> {
    if !score.is_file() {
        return Err(Error::not_found("score", score));
    }
    if !soundbank.is_file() {
        return Err(Error::not_found("sound bank", soundbank));
    }

    let dir = match score.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let scratch = tempfile::Builder::new()
        .prefix(".retimbre-")
        .tempdir_in(dir)?;
    let output = scratch.path().join("render.wav");

    let invocation = Invocation::new(&output)
        .input(SCORE, score)
        .input(SOUNDBANK, soundbank);
    debug!("Rendering {} with {}", score.display(), tool.name());
    let produced = tool
        .run(&invocation)
        .map_err(|e| Error::collaborator(Stage::Synthesis, e))?;

    let rendered = read_wav(&produced)?;
    let peak = rendered.peak();
    let normalized = rendered.normalized();

    info!(
        "Rendered {:.3}s at {} Hz (peak {:.3} before normalization)",
        normalized.duration(),
        normalized.sample_rate(),
        peak
    );
    Ok(normalized)
}
