//! Score model and instrument rewriting for retimbre.
//!
//! Reads and writes Standard MIDI Files through `midly` and re-targets a
//! transcribed score to a single instrument from a fixed catalog.
//!
//! ```ignore
//! use retimbre_score::{rewrite_for_key, Score};
//!
//! let bytes = std::fs::read("score.mid")?;
//! let mut score = Score::parse(&bytes)?;
//! rewrite_for_key(&mut score, "violin")?;
//! std::fs::write("score.mid", score.to_bytes()?)?;
//! ```

pub mod error;
pub use error::{Error, Result};

mod channel;
pub use channel::Channel;

mod event;
pub use event::{Event, TrackEvent, MAX_DELTA};

mod score;
pub use score::{Score, Track, DEFAULT_TICKS_PER_BEAT};

mod instrument;
pub use instrument::{Instrument, InstrumentProfile};

mod rewrite;
pub use rewrite::{rewrite, rewrite_for_key, RewriteSummary, CANONICAL_TEMPO_BPM};
