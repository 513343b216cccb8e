//! Channel event parsing

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::ReadResult, reader::ByteCursor};

/// A channel voice message addressed to one of 16 channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelEvent {
    /// Channel number, 0 through 15
    pub channel: u8,
    /// What happens on the channel
    pub message: ChannelMessage,
}

/// A MIDI channel message and its data bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChannelMessage {
    /// Turn Off event
    /// This message is sent when a note is released
    NoteOff(NoteMeta),
    /// Turn On event
    /// This message is sent when a note is depressed
    NoteOn(NoteMeta),
    /// Polyphonic Key Pressure
    /// This message is most often sent by pressing down a key after it "bottoms out"
    NoteAftertouch(NoteMeta),
    /// Control change
    /// This message is sent when a controller value changes. Controllers include devices such as
    /// pedals and levers. Certain controller numbers are reserved.
    Controller(ControlChange),
    /// Program change.
    /// This message is sent when the patch number changes
    ProgramChange(u8),
    /// Channel Pressure
    /// This message is most often sent by pressing down on a key after it "bottoms out"
    ChannelAftertouch(u8),
    /// Pitch Wheel Change
    /// This message is sent to indicate a change in the pitch wheel as measured by a fourteen bit
    /// value.
    PitchBend(u16),
}

/// Metadata for a note's relative info, key and velocity (or pressure for aftertouch)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NoteMeta {
    /// Note key
    pub key: u8,
    /// Note velocity
    pub velocity: u8,
}

/// Metadata for changing a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlChange {
    /// Controller number
    pub controller_number: u8,
    /// New value
    pub new_value: u8,
}

impl ChannelEvent {
    /// Number of data bytes that follow a channel status byte
    pub fn data_len(status: u8) -> usize {
        match status >> 4 {
            0xC | 0xD => 1,
            _ => 2,
        }
    }

    /// Reads the data bytes for `status`, which must lie in `0x80..=0xEF`. The status byte itself
    /// has already been consumed, or is being inherited through running status
    pub fn decode(status: u8, cursor: &mut ByteCursor) -> ReadResult<Self> {
        let channel = status & 0x0F;
        let reads = cursor.request(Self::data_len(status))?;

        let note = || NoteMeta {
            key: reads[0],
            velocity: reads[1],
        };

        let message = match status >> 4 {
            0x8 => ChannelMessage::NoteOff(note()),
            0x9 => ChannelMessage::NoteOn(note()),
            0xA => ChannelMessage::NoteAftertouch(note()),
            0xB => ChannelMessage::Controller(ControlChange {
                controller_number: reads[0],
                new_value: reads[1],
            }),
            0xC => ChannelMessage::ProgramChange(reads[0]),
            0xD => ChannelMessage::ChannelAftertouch(reads[0]),
            _ => {
                const MASK: u16 = 0x7F;
                let lsb = reads[0] as u16 & MASK;
                let msb = reads[1] as u16 & MASK;

                ChannelMessage::PitchBend((msb << 7) | lsb)
            }
        };

        Ok(Self { channel, message })
    }
}
