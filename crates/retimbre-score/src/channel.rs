//! MIDI channel identifiers.

use crate::error::{Error, Result};
use midly::num::u4;
use std::fmt;

/// One of the 16 logical voices of a score (0-15).
///
/// Channel 9 carries percussion under General MIDI and never receives a
/// melodic program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Number of channels in a MIDI stream.
    pub const COUNT: u8 = 16;

    /// General MIDI percussion channel.
    pub const PERCUSSION: Channel = Channel(9);

    /// Create a channel, rejecting indices outside 0-15.
    pub fn new(index: u8) -> Result<Self> {
        if index < Self::COUNT {
            Ok(Self(index))
        } else {
            Err(Error::InvalidChannel(index))
        }
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_percussion(self) -> bool {
        self == Self::PERCUSSION
    }
}

impl TryFrom<u8> for Channel {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        Self::new(index)
    }
}

impl From<u4> for Channel {
    fn from(channel: u4) -> Self {
        Self(channel.as_int())
    }
}

impl From<Channel> for u4 {
    fn from(channel: Channel) -> Self {
        u4::from(channel.0)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_range() {
        assert!(Channel::new(0).is_ok());
        assert!(Channel::new(15).is_ok());
        assert!(matches!(Channel::new(16), Err(Error::InvalidChannel(16))));
    }

    #[test]
    fn test_percussion() {
        assert!(Channel::new(9).unwrap().is_percussion());
        assert!(!Channel::new(0).unwrap().is_percussion());
        assert_eq!(Channel::PERCUSSION.index(), 9);
    }

    #[test]
    fn test_u4_conversion() {
        let channel = Channel::from(u4::from(3));
        assert_eq!(channel.index(), 3);
        assert_eq!(u4::from(channel).as_int(), 3);
    }
}
