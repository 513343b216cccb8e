//! Decoder configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do with a track chunk whose declared length runs out before an end of track event
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EndOfTrackPolicy {
    /// Fail the decode with [`crate::error::ErrorKind::MissingEndOfTrack`]
    #[default]
    Strict,
    /// Append an end of track event with no delay and carry on. An event that overruns the
    /// declared length is still an error
    Lenient,
}

/// Knobs for a [`crate::decoder::MidiDecoder`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecoderConfig {
    /// Handling of tracks without an end of track event
    pub end_of_track: EndOfTrackPolicy,
}

impl DecoderConfig {
    /// Sets the end of track policy
    pub fn with_end_of_track(mut self, policy: EndOfTrackPolicy) -> Self {
        self.end_of_track = policy;
        self
    }
}
