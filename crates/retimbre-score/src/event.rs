//! Score events
//!
//! Wraps `midly` track events in a small tagged enum that surfaces the
//! events the rewriter cares about (tempo, program, notes) and carries
//! everything else through untouched.

use crate::channel::Channel;
use midly::num::{u24, u28, u7};
use midly::{MetaMessage, MidiMessage, TrackEventKind};

/// Largest delta representable in a Standard MIDI File (28-bit VLQ).
pub const MAX_DELTA: u32 = (1 << 28) - 1;

const MAX_TEMPO: u32 = (1 << 24) - 1;

const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// One timed occurrence within a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'a> {
    /// Tempo change in microseconds per quarter note
    SetTempo { micros_per_beat: u32 },

    /// Instrument selection for a channel
    ProgramChange { channel: Channel, program: u8 },

    /// Note On: key (0-127), velocity (0-127)
    NoteOn {
        channel: Channel,
        key: u8,
        velocity: u8,
    },

    /// Note Off: key (0-127), release velocity (0-127)
    NoteOff {
        channel: Channel,
        key: u8,
        velocity: u8,
    },

    /// Any other event, preserved verbatim
    Other(TrackEventKind<'a>),
}

impl<'a> Event<'a> {
    /// Tempo event for the given BPM.
    pub fn tempo_bpm(bpm: f64) -> Self {
        let micros = (MICROS_PER_MINUTE / bpm).round() as u32;
        Event::SetTempo {
            micros_per_beat: micros.min(MAX_TEMPO),
        }
    }

    /// Tempo in BPM, if this is a tempo event.
    pub fn bpm(&self) -> Option<f64> {
        match self {
            Event::SetTempo { micros_per_beat } => {
                Some(MICROS_PER_MINUTE / *micros_per_beat as f64)
            }
            _ => None,
        }
    }

    /// Channel of a note event.
    pub fn note_channel(&self) -> Option<Channel> {
        match self {
            Event::NoteOn { channel, .. } | Event::NoteOff { channel, .. } => Some(*channel),
            _ => None,
        }
    }

    pub fn is_note(&self) -> bool {
        self.note_channel().is_some()
    }

    pub fn is_program_change(&self) -> bool {
        matches!(self, Event::ProgramChange { .. })
    }

    pub fn is_tempo(&self) -> bool {
        matches!(self, Event::SetTempo { .. })
    }

    /// Classify a raw SMF event.
    pub fn from_kind(kind: TrackEventKind<'a>) -> Self {
        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => Event::SetTempo {
                micros_per_beat: tempo.as_int(),
            },
            TrackEventKind::Midi { channel, message } => {
                let channel = Channel::from(channel);
                match message {
                    MidiMessage::ProgramChange { program } => Event::ProgramChange {
                        channel,
                        program: program.as_int(),
                    },
                    // Velocity-0 note-ons stay note-ons so the file round-trips byte-for-byte
                    MidiMessage::NoteOn { key, vel } => Event::NoteOn {
                        channel,
                        key: key.as_int(),
                        velocity: vel.as_int(),
                    },
                    MidiMessage::NoteOff { key, vel } => Event::NoteOff {
                        channel,
                        key: key.as_int(),
                        velocity: vel.as_int(),
                    },
                    _ => Event::Other(kind),
                }
            }
            other => Event::Other(other),
        }
    }

    /// Convert back into a raw SMF event.
    pub fn to_kind(self) -> TrackEventKind<'a> {
        match self {
            Event::SetTempo { micros_per_beat } => {
                TrackEventKind::Meta(MetaMessage::Tempo(u24::from(micros_per_beat)))
            }
            Event::ProgramChange { channel, program } => TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::ProgramChange {
                    program: u7::from(program),
                },
            },
            Event::NoteOn {
                channel,
                key,
                velocity,
            } => TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn {
                    key: u7::from(key),
                    vel: u7::from(velocity),
                },
            },
            Event::NoteOff {
                channel,
                key,
                velocity,
            } => TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOff {
                    key: u7::from(key),
                    vel: u7::from(velocity),
                },
            },
            Event::Other(kind) => kind,
        }
    }
}

/// An event with its delta time in ticks since the previous event of the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackEvent<'a> {
    pub delta: u32,
    pub event: Event<'a>,
}

impl<'a> TrackEvent<'a> {
    pub fn new(delta: u32, event: Event<'a>) -> Self {
        Self {
            delta: delta.min(MAX_DELTA),
            event,
        }
    }

    /// Event inserted by a rewrite; carries no time of its own.
    pub fn injected(event: Event<'a>) -> Self {
        Self::new(0, event)
    }

    pub(crate) fn from_midly(event: &midly::TrackEvent<'a>) -> Self {
        Self {
            delta: event.delta.as_int(),
            event: Event::from_kind(event.kind),
        }
    }

    pub(crate) fn to_midly(self) -> midly::TrackEvent<'a> {
        midly::TrackEvent {
            delta: u28::from(self.delta.min(MAX_DELTA)),
            kind: self.event.to_kind(),
        }
    }
}
