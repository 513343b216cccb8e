//! # miami-stream
//!
//! An incremental Standard MIDI File decoder. Bytes can be handed over as one complete block or
//! as any sequence of chunks, in whatever sizes a file read, socket or other source delivers
//! them, and decoding starts before the whole file has arrived.
//!
//! ## Overview
//!
//! MIDI files are structured as a series of chunks. Each chunk contains a 4-character ASCII
//! type identifier and a 32-bit length that specifies how many bytes of data follow. A file is
//! one `MThd` header chunk followed by the declared number of `MTrk` track chunks, each a
//! stream of delta-timed channel, meta and system exclusive events.
//!
//! - **Minimal dependencies**: `thiserror` for errors, `log` for diagnostics, and opt in
//!   `serde` support for every decoded type
//! - **Push based**: [`decoder::MidiDecoder::feed`] decodes as far as the buffered bytes allow
//!   and suspends cleanly at the next unit boundary, resuming on the next feed
//! - **Fail fast**: the first structural error ends the decode with its kind and byte offset
//!
//! ## Example Usage
//!
//! ```rust
//! use miami_stream::{chunk::header::Format, Midi};
//!
//! let bytes: &[u8] = b"MThd\x00\x00\x00\x06\x00\x01\x00\x01\x01\xE0\
//!                      MTrk\x00\x00\x00\x0B\
//!                      \x00\x90\x3C\x64\
//!                      \x60\x3C\x00\
//!                      \x00\xFF\x2F\x00";
//!
//! let midi = Midi::try_from(bytes).expect("Decode MIDI bytes");
//! assert_eq!(midi.header().format(), Format::One);
//! assert_eq!(midi.tracks()[0].len(), 3);
//! ```
//!
//! ## Library Structure
//!
//! - **[`reader`]**: the [`reader::ByteCursor`] input accumulator and primitive decoders
//! - **[`chunk`]**: header and track chunk types and their decoders
//! - **[`decoder`]**: the file level state machine, in whole-buffer and incremental modes
//! - **[`config`]**: decoder options
//! - **[`error`]**: the structural error taxonomy

pub mod chunk;
pub mod config;
pub mod decoder;
pub mod error;
pub mod reader;

use chunk::{header::HeaderChunk, track::TrackChunk};
use error::DecodeError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a raw MIDI Chunk.
/// A MIDI Chunk consists of a 4-character ASCII type identifier and a 32-bit unsigned integer specifying the length of its data.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Chunk {
    /// 4 character ASCII chunk type
    pub chunk_type: [char; 4],
    /// Length of the data that follows
    length: u32,
}

impl Chunk {
    /// Gets the length of the chunk as a usize
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Returns if the chunk has no attributed data
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl From<u64> for Chunk {
    fn from(value: u64) -> Self {
        let high = (value >> 32) as u32;
        let low = value as u32;

        let a = (high >> 24) as u8 as char;
        let b = (high >> 16) as u8 as char;
        let c = (high >> 8) as u8 as char;
        let d = high as u8 as char;

        Self {
            chunk_type: [a, b, c, d],
            length: low,
        }
    }
}

/// A fully decoded MIDI file: its header and exactly as many tracks as the header declares
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Midi {
    /// The header chunk
    header: HeaderChunk,
    /// Every track chunk, in file order
    tracks: Vec<TrackChunk>,
}

impl Midi {
    /// Assembles a file from its decoded parts
    pub(crate) fn new(header: HeaderChunk, tracks: Vec<TrackChunk>) -> Self {
        Self { header, tracks }
    }

    /// The header chunk
    pub fn header(&self) -> &HeaderChunk {
        &self.header
    }

    /// Track chunks in file order
    pub fn tracks(&self) -> &[TrackChunk] {
        &self.tracks
    }

    /// Splits the file into header and tracks
    pub fn into_parts(self) -> (HeaderChunk, Vec<TrackChunk>) {
        (self.header, self.tracks)
    }
}

impl TryFrom<&[u8]> for Midi {
    type Error = DecodeError;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        decoder::MidiDecoder::decode(value)
    }
}
