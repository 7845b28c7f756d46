//! Instrument catalog
//!
//! Closed set of instruments a score can be re-orchestrated for, each with
//! its General MIDI program number. New instruments are added as variants;
//! nothing is discovered at runtime.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display name and General MIDI program of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentProfile {
    pub name: &'static str,
    pub program: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    #[default]
    Piano,
    Flute,
    Guitar,
    Violin,
    Kalimba,
    Trumpet,
    ElectricGuitar,
    Cello,
    Clarinet,
    Tuba,
}

impl Instrument {
    /// Every catalog entry.
    pub const ALL: [Instrument; 10] = [
        Instrument::Piano,
        Instrument::Flute,
        Instrument::Guitar,
        Instrument::Violin,
        Instrument::Kalimba,
        Instrument::Trumpet,
        Instrument::ElectricGuitar,
        Instrument::Cello,
        Instrument::Clarinet,
        Instrument::Tuba,
    ];

    /// Lookup key, as accepted by [`FromStr`].
    pub fn key(self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Flute => "flute",
            Instrument::Guitar => "guitar",
            Instrument::Violin => "violin",
            Instrument::Kalimba => "kalimba",
            Instrument::Trumpet => "trumpet",
            Instrument::ElectricGuitar => "electric_guitar",
            Instrument::Cello => "cello",
            Instrument::Clarinet => "clarinet",
            Instrument::Tuba => "tuba",
        }
    }

    pub fn profile(self) -> InstrumentProfile {
        let (name, program) = match self {
            Instrument::Piano => ("Piano", 0),
            Instrument::Flute => ("Flute", 73),
            Instrument::Guitar => ("Guitar", 24),
            Instrument::Violin => ("Violin", 40),
            Instrument::Kalimba => ("Kalimba", 108),
            Instrument::Trumpet => ("Trumpet", 56),
            Instrument::ElectricGuitar => ("Electric Guitar", 27),
            Instrument::Cello => ("Cello", 42),
            Instrument::Clarinet => ("Clarinet", 71),
            Instrument::Tuba => ("Tuba", 58),
        };
        InstrumentProfile { name, program }
    }

    #[inline]
    pub fn program(self) -> u8 {
        self.profile().program
    }

    #[inline]
    pub fn display_name(self) -> &'static str {
        self.profile().name
    }
}

impl FromStr for Instrument {
    type Err = Error;

    /// Case-insensitive key lookup.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|i| i.key() == key)
            .ok_or_else(|| Error::UnknownInstrument(s.to_string()))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
