//! Score model and Standard MIDI File I/O
//!
//! Parsing and writing go through the `midly` crate. A parsed [`Score`]
//! borrows opaque event payloads (text, sysex) from the file bytes, so the
//! bytes must outlive the score.

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::event::{Event, TrackEvent};
use midly::num::{u15, u28};
use midly::{Format, Header, MetaMessage, Smf, Timing, TrackEventKind};
use std::collections::BTreeSet;
use std::io::Write;
use tracing::debug;

/// Default resolution for scores built in memory.
pub const DEFAULT_TICKS_PER_BEAT: u16 = 480;

/// Ordered sequence of events sharing one timeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track<'a> {
    pub events: Vec<TrackEvent<'a>>,
}

impl<'a> Track<'a> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn from_events(events: Vec<TrackEvent<'a>>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, delta: u32, event: Event<'a>) {
        self.events.push(TrackEvent::new(delta, event));
    }

    /// Builder-style `push`.
    pub fn with(mut self, delta: u32, event: Event<'a>) -> Self {
        self.push(delta, event);
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Channels referenced by note events, in ascending order.
    pub fn note_channels(&self) -> BTreeSet<Channel> {
        self.events
            .iter()
            .filter_map(|e| e.event.note_channel())
            .collect()
    }

    /// Events paired with their absolute tick position.
    pub fn timeline(&self) -> impl Iterator<Item = (u64, &Event<'a>)> + '_ {
        self.events.iter().scan(0u64, |tick, e| {
            *tick += e.delta as u64;
            Some((*tick, &e.event))
        })
    }
}

/// Symbolic score: ordered tracks sharing one tick resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Score<'a> {
    pub format: Format,
    pub ticks_per_beat: u16,
    pub tracks: Vec<Track<'a>>,
}

impl<'a> Score<'a> {
    /// Create an empty multi-track score.
    pub fn new(ticks_per_beat: u16) -> Self {
        Self {
            format: Format::Parallel,
            ticks_per_beat,
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: Track<'a>) -> Self {
        self.tracks.push(track);
        self
    }

    /// Parse a Standard MIDI File.
    ///
    /// Only metrical (ticks-per-beat) timing is supported.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let smf = Smf::parse(data)?;

        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int(),
            Timing::Timecode(_, _) => {
                return Err(Error::MidiUnsupportedTiming);
            }
        };

        debug!(
            "Parsing MIDI file: {} tracks, {} ticks per beat",
            smf.tracks.len(),
            ticks_per_beat
        );

        let tracks = smf
            .tracks
            .iter()
            .map(|track| Track::from_events(track.iter().map(TrackEvent::from_midly).collect()))
            .collect();

        Ok(Self {
            format: smf.header.format,
            ticks_per_beat,
            tracks,
        })
    }

    /// Encode as a Standard MIDI File.
    ///
    /// Every track is terminated with an end-of-track event if it lacks one.
    pub fn write_to<W: Write>(&self, out: W) -> Result<()> {
        let format = match (self.format, self.tracks.len()) {
            (Format::SingleTrack, n) if n > 1 => Format::Parallel,
            (format, _) => format,
        };
        let header = Header::new(format, Timing::Metrical(u15::from(self.ticks_per_beat)));

        let tracks: Vec<Vec<midly::TrackEvent<'a>>> = self
            .tracks
            .iter()
            .map(|track| {
                let mut events: Vec<_> = track.events.iter().map(|e| e.to_midly()).collect();
                let terminated = matches!(
                    events.last().map(|e| e.kind),
                    Some(TrackEventKind::Meta(MetaMessage::EndOfTrack))
                );
                if !terminated {
                    events.push(midly::TrackEvent {
                        delta: u28::from(0_u32),
                        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
                    });
                }
                events
            })
            .collect();

        Smf { header, tracks }.write_std(out)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Total number of events across all tracks.
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }

    /// Count of events matching `predicate` across all tracks.
    pub fn count_events(&self, predicate: impl Fn(&Event<'a>) -> bool) -> usize {
        self.tracks
            .iter()
            .flat_map(|t| t.events.iter())
            .filter(|e| predicate(&e.event))
            .count()
    }
}
