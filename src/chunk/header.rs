//! Header Chunk Enum and Struct Definitions

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    chunk::chunk_types::HEADER_CHUNK,
    error::{DecodeError, ErrorKind, ReadError, ReadResult},
    reader::ByteCursor,
    Chunk,
};

/// Declared length of every header chunk
pub const HEADER_LENGTH: usize = 6;

/// Header chunk data, including format, ntrks and division as 3 16 bit unsigned integers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeaderChunk {
    /// The MIDI format
    format: Format,
    /// Number of tracks
    ntrks: u16,
    /// Time signature/division
    division: Division,
}

impl HeaderChunk {
    /// The file's format
    pub fn format(&self) -> Format {
        self.format
    }

    /// Number of track chunks that follow the header
    pub fn ntrks(&self) -> u16 {
        self.ntrks
    }

    /// Meaning of the delta times in every track
    pub fn division(&self) -> Division {
        self.division
    }

    /// Decodes the whole `MThd` chunk, tag and length included. Nothing is consumed unless all 14
    /// bytes are available
    pub fn decode(cursor: &mut ByteCursor) -> ReadResult<Self> {
        let mark = cursor.mark();
        let result = Self::decode_fields(cursor);
        if result.is_err() {
            cursor.rewind(mark);
        }
        result
    }

    /// Field by field header decode, may leave the cursor mid chunk on failure
    fn decode_fields(cursor: &mut ByteCursor) -> ReadResult<Self> {
        let start = cursor.offset();
        let chunk = Chunk::decode_expecting(cursor, HEADER_CHUNK)?;
        if chunk.len() != HEADER_LENGTH {
            return Err(DecodeError::new(
                ErrorKind::InvalidHeaderLength,
                start + 4,
                format!(
                    "header chunk must be {HEADER_LENGTH} bytes, declared {}",
                    chunk.len()
                ),
            )
            .into());
        }

        let format_offset = cursor.offset();
        let format = cursor.read_u16()?;
        let ntrks = cursor.read_u16()?;
        let division = cursor.read_u16()?;

        Self::try_from((format, ntrks, division)).map_err(|InvalidFormat(format)| {
            ReadError::from(DecodeError::new(
                ErrorKind::InvalidFormatType,
                format_offset,
                format!("format must be 0, 1 or 2, found {format}"),
            ))
        })
    }
}

impl TryFrom<(u16, u16, u16)> for HeaderChunk {
    type Error = InvalidFormat;
    fn try_from(value: (u16, u16, u16)) -> Result<Self, Self::Error> {
        let (format, ntrks, division) = value;

        Ok(Self {
            format: format.try_into()?,
            ntrks,
            division: division.into(),
        })
    }
}

/// The overall organization of the MIDI file. Only three values are valid, making most of the 16
/// bits irrelevant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Format {
    /// The file contains a single multi-channel track
    Zero,
    /// The file contains one or more simultaneous tracks (or MIDI outputs) of a sequence
    One,
    /// The file contains one or more sequentially independent single-track patterns
    Two,
}

/// Error struct representing an invalid format specifier
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid header format {0}")]
pub struct InvalidFormat(pub u16);

impl TryFrom<u16> for Format {
    type Error = InvalidFormat;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Format::Zero),
            1 => Ok(Format::One),
            2 => Ok(Format::Two),
            other => Err(InvalidFormat(other)),
        }
    }
}

/// The meaning of the delta-times in the MIDI sequence,
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Division {
    /// When bit 15 is a 0, bits 14-0 represent ticks per quarter note
    Metrical(u16),
    /// When bit 15 is 1, bits 14-8 represent the negative SMPTE format,
    /// and bits 7-0 represent ticks per frame
    TimeCodeBased(SmpteTicks),
}

/// Division defined by time-code-based time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmpteTicks {
    /// Negative SMPTE frame rate, one of -24, -25, -29 or -30 in well formed files
    pub smpte: i8,
    /// Ticks per frame
    pub tpf: u8,
}

impl SmpteTicks {
    /// Frames per second as a positive number
    pub fn frames_per_second(&self) -> u8 {
        self.smpte.unsigned_abs()
    }
}

impl From<u16> for Division {
    fn from(value: u16) -> Self {
        const MASK: u16 = 0x7FFF;

        if value >> 15 == 0 {
            return Division::Metrical(value & MASK);
        }

        // The whole high byte is a two's complement frame rate
        let [high, low] = value.to_be_bytes();
        Division::TimeCodeBased(SmpteTicks {
            smpte: high as i8,
            tpf: low,
        })
    }
}
