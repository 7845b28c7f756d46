//! External process capabilities for retimbre.
//!
//! Transcription, transcoding and synthesis are delegated to external
//! programs. Each is reached through the [`ExternalTool`] trait so callers
//! can substitute test doubles; [`CommandTool`] is the subprocess-backed
//! implementation.
//!
//! ```ignore
//! use retimbre_tools::{CommandTool, ExternalTool, Invocation, ToolCommand};
//!
//! let synth = CommandTool::new("synthesizer", ToolCommand::synthesizer());
//! let wav = synth.run(
//!     &Invocation::new("render.wav")
//!         .input("score", "score.mid")
//!         .input("soundbank", "bank.sf2"),
//! )?;
//! ```

pub mod error;
pub use error::{Error, Result};

mod tool;
pub use tool::{ExternalTool, Invocation};

mod command;
pub use command::{CommandTool, ToolCommand, DEFAULT_TIMEOUT_SECS};
