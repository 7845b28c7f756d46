//! Instrument rewriting
//!
//! Re-targets a transcribed score to a single instrument:
//!
//! 1. Drop every program change and tempo event, folding their delta time
//!    into the next surviving event so absolute timing is unchanged
//! 2. Collect the channels that carry note events
//! 3. First track only: put the canonical tempo at index 0
//! 4. Insert one program change per active non-percussion channel right
//!    after the first event of the track
//!
//! Running the rewrite twice gives the same score as running it once.

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::event::{Event, TrackEvent, MAX_DELTA};
use crate::instrument::Instrument;
use crate::score::{Score, Track};
use midly::{MetaMessage, TrackEventKind};
use std::collections::BTreeSet;
use tracing::debug;

/// Tempo written at the start of every rewritten score.
///
/// Transcription does not infer tempo reliably, so playback speed is pinned.
pub const CANONICAL_TEMPO_BPM: f64 = 120.0;

/// What a rewrite changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub tracks: usize,
    pub removed_program_changes: usize,
    pub removed_tempo_events: usize,
    pub inserted_program_changes: usize,
}

/// Rewrite `score` in place so every melodic channel plays `instrument`.
pub fn rewrite(score: &mut Score<'_>, instrument: Instrument) -> Result<RewriteSummary> {
    if score.tracks.is_empty() {
        return Err(Error::EmptyScore);
    }

    let program = instrument.program();
    let mut summary = RewriteSummary {
        tracks: score.tracks.len(),
        ..Default::default()
    };

    for (index, track) in score.tracks.iter_mut().enumerate() {
        let active = strip_track(track, &mut summary);

        if index == 0 {
            track
                .events
                .insert(0, TrackEvent::injected(Event::tempo_bpm(CANONICAL_TEMPO_BPM)));
        }

        let changes: Vec<TrackEvent<'_>> = active
            .into_iter()
            .filter(|channel| !channel.is_percussion())
            .map(|channel| TrackEvent::injected(Event::ProgramChange { channel, program }))
            .collect();
        summary.inserted_program_changes += changes.len();

        let at = track.events.len().min(1);
        track.events.splice(at..at, changes);
    }

    debug!(
        "Rewrote score for {} (program {}): {:?}",
        instrument, program, summary
    );

    Ok(summary)
}

/// Resolve `key` and rewrite. Unknown keys fail before the score is touched.
pub fn rewrite_for_key(score: &mut Score<'_>, key: &str) -> Result<(Instrument, RewriteSummary)> {
    let instrument: Instrument = key.parse()?;
    let summary = rewrite(score, instrument)?;
    Ok((instrument, summary))
}

/// Remove tempo and program events; return the channels carrying notes.
fn strip_track(track: &mut Track<'_>, summary: &mut RewriteSummary) -> BTreeSet<Channel> {
    let mut active = BTreeSet::new();
    let mut carried: u64 = 0;
    let mut kept = Vec::with_capacity(track.events.len() + 2);

    for event in track.events.drain(..) {
        match event.event {
            Event::ProgramChange { .. } => {
                summary.removed_program_changes += 1;
                carried += event.delta as u64;
                continue;
            }
            Event::SetTempo { .. } => {
                summary.removed_tempo_events += 1;
                carried += event.delta as u64;
                continue;
            }
            Event::NoteOn { channel, .. } | Event::NoteOff { channel, .. } => {
                active.insert(channel);
            }
            Event::Other(_) => {}
        }

        let delta = (event.delta as u64 + carried).min(MAX_DELTA as u64) as u32;
        kept.push(TrackEvent::new(delta, event.event));
        carried = 0;
    }

    // Trailing removals still count toward the track length
    if carried > 0 {
        let delta = carried.min(MAX_DELTA as u64) as u32;
        kept.push(TrackEvent::new(
            delta,
            Event::Other(TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ));
    }

    track.events = kept;
    active
}
