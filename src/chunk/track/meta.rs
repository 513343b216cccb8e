//! Meta Event Structs and Parsing

use crate::error::{DecodeError, ErrorKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A meta level event
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MetaEvent {
    /// Sequence Number, tag 0x00. Files may omit the number and declare an empty payload
    SequenceNumber(Option<u16>),
    /// Text metadata, tag 0x01
    Text(String),
    /// Copyright, tag 0x02
    Copyright(String),
    /// Sequence or track name, tag 0x03
    TrackName(String),
    /// Instrucment name, tag 0x04
    InstrumentName(String),
    /// Lyric, tag 0x05
    Lyric(String),
    /// Marker, tag 0x06
    Marker(String),
    /// Cue Point, tag 0x07
    CuePoint(String),
    /// Program name, tag 0x08
    ProgramName(String),
    /// Device name, tag 0x09
    DeviceName(String),
    /// Midi Channel Prefix, tag 0x20
    MidiChannelPrefix(u8),
    /// Midi Port, tag 0x21
    MidiPort(u8),
    /// End of Track Identifier, tag 0x2F
    EndOfTrack,
    /// Tempo in microseconds per quarter note, tag 0x51
    SetTempo(u32),
    /// Smpte Offset, tag 0x54
    SmpteOffset(SmpteOffset),
    /// Time signature, tag 0x58
    TimeSignature(TimeSignature),
    /// Key Signature, tag 0x59
    KeySignature(KeySignature),
    /// Sequencer Specific, tag 0x7f
    SequencerSpecific(Vec<u8>),
    /// An unknown meta event
    Unknown(u8, Vec<u8>),
}

/// Meta event type bytes
pub mod tags {
    /// Sequence number
    pub const SEQUENCE_NUMBER: u8 = 0x00;
    /// Text
    pub const TEXT: u8 = 0x01;
    /// Copyright notice
    pub const COPYRIGHT: u8 = 0x02;
    /// Sequence/track name
    pub const TRACK_NAME: u8 = 0x03;
    /// Instrument name
    pub const INSTRUMENT_NAME: u8 = 0x04;
    /// Lyric
    pub const LYRIC: u8 = 0x05;
    /// Marker
    pub const MARKER: u8 = 0x06;
    /// Cue point
    pub const CUE_POINT: u8 = 0x07;
    /// Program name
    pub const PROGRAM_NAME: u8 = 0x08;
    /// Device name
    pub const DEVICE_NAME: u8 = 0x09;
    /// Channel prefix
    pub const CHANNEL_PREFIX: u8 = 0x20;
    /// Port
    pub const MIDI_PORT: u8 = 0x21;
    /// End of track
    pub const END_OF_TRACK: u8 = 0x2F;
    /// Tempo
    pub const SET_TEMPO: u8 = 0x51;
    /// SMPTE offset
    pub const SMPTE_OFFSET: u8 = 0x54;
    /// Time signature
    pub const TIME_SIGNATURE: u8 = 0x58;
    /// Key signature
    pub const KEY_SIGNATURE: u8 = 0x59;
    /// Sequencer specific
    pub const SEQUENCER_SPECIFIC: u8 = 0x7F;
}

impl MetaEvent {
    /// Builds a meta event from its type byte and complete payload. `offset` is where the event
    /// starts and is only used for error reporting
    pub fn from_payload(tag: u8, data: Vec<u8>, offset: u64) -> Result<Self, DecodeError> {
        macro_rules! meta_event {
            ($len: expr_2021, $name: expr_2021, $value: expr_2021) => {{
                if data.len() != $len {
                    return Err(DecodeError::new(
                        ErrorKind::InvalidMetaEvent,
                        offset,
                        format!(
                            "meta event {tag:#04X} needs {} payload bytes, declared {}",
                            $len,
                            data.len()
                        ),
                    ));
                }
                Ok($name($value))
            }};
        }

        match tag {
            tags::SEQUENCE_NUMBER if data.is_empty() => Ok(MetaEvent::SequenceNumber(None)),
            tags::SEQUENCE_NUMBER => meta_event!(
                2,
                MetaEvent::SequenceNumber,
                Some(u16::from_be_bytes([data[0], data[1]]))
            ),
            tags::TEXT => Ok(MetaEvent::Text(text(&data))),
            tags::COPYRIGHT => Ok(MetaEvent::Copyright(text(&data))),
            tags::TRACK_NAME => Ok(MetaEvent::TrackName(text(&data))),
            tags::INSTRUMENT_NAME => Ok(MetaEvent::InstrumentName(text(&data))),
            tags::LYRIC => Ok(MetaEvent::Lyric(text(&data))),
            tags::MARKER => Ok(MetaEvent::Marker(text(&data))),
            tags::CUE_POINT => Ok(MetaEvent::CuePoint(text(&data))),
            tags::PROGRAM_NAME => Ok(MetaEvent::ProgramName(text(&data))),
            tags::DEVICE_NAME => Ok(MetaEvent::DeviceName(text(&data))),

            tags::CHANNEL_PREFIX => meta_event!(1, MetaEvent::MidiChannelPrefix, data[0]),
            tags::MIDI_PORT => meta_event!(1, MetaEvent::MidiPort, data[0]),
            tags::END_OF_TRACK => meta_event!(0, core::convert::identity, MetaEvent::EndOfTrack),

            tags::SET_TEMPO => meta_event!(
                3,
                MetaEvent::SetTempo,
                ((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32)
            ),
            tags::SMPTE_OFFSET => meta_event!(
                5,
                MetaEvent::SmpteOffset,
                SmpteOffset {
                    hours: data[0],
                    minutes: data[1],
                    seconds: data[2],
                    frames: data[3],
                    subframes: data[4]
                }
            ),
            tags::TIME_SIGNATURE => meta_event!(
                4,
                MetaEvent::TimeSignature,
                TimeSignature {
                    numerator: data[0],
                    denominator_power: data[1],
                    clocks_per_click: data[2],
                    thirty_seconds_per_quarter: data[3],
                }
            ),
            tags::KEY_SIGNATURE => meta_event!(
                2,
                MetaEvent::KeySignature,
                KeySignature {
                    sharps_flats: data[0] as i8,
                    major: data[1] == 0
                }
            ),

            tags::SEQUENCER_SPECIFIC => Ok(MetaEvent::SequencerSpecific(data)),

            _ => Ok(MetaEvent::Unknown(tag, data)),
        }
    }
}

/// Text payloads aren't guaranteed to be utf-8, invalid sequences are replaced rather than
/// rejected
fn text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A key signature
pub struct KeySignature {
    /// Number of sharps when positive, flats when negative
    pub sharps_flats: i8,
    /// True for a major key, false for minor
    pub major: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// An SMPTE Offset
pub struct SmpteOffset {
    /// Hours of offset
    pub hours: u8,
    /// Minutes of offset
    pub minutes: u8,
    /// Seconds of offset
    pub seconds: u8,
    /// Frames of offset
    pub frames: u8,
    /// Subframes of offset
    pub subframes: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A Time Signature
pub struct TimeSignature {
    /// The time signature's numerator
    pub numerator: u8,
    /// The denominator as a power of two, 2 means a quarter note
    pub denominator_power: u8,
    /// MIDI clocks per metronome click
    pub clocks_per_click: u8,
    /// Thirty second notes per quarter
    pub thirty_seconds_per_quarter: u8,
}

impl TimeSignature {
    /// The written denominator, `None` when the power doesn't fit in 32 bits
    pub fn denominator(&self) -> Option<u32> {
        1u32.checked_shl(self.denominator_power as u32)
    }
}
