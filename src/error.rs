//! Structural decode errors and the internal "not ready yet" signal

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Every structural violation the decoder can report
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ErrorKind {
    /// A chunk's 4 byte tag did not match the expected constant
    #[error("Invalid chunk tag")]
    InvalidChunkTag,
    /// The header chunk declared a length other than 6
    #[error("Invalid header length")]
    InvalidHeaderLength,
    /// The header chunk declared a format other than 0, 1 or 2
    #[error("Invalid format type")]
    InvalidFormatType,
    /// A variable length quantity used more than 4 bytes
    #[error("Malformed variable length quantity")]
    MalformedVlq,
    /// A channel event omitted its status byte before any status was set in the track
    #[error("Missing running status")]
    MissingRunningStatus,
    /// A status byte matched none of the channel, meta or sysex families
    #[error("Unknown event type")]
    UnknownEventType,
    /// A track chunk ran out of declared bytes before an end of track event
    #[error("Missing end of track")]
    MissingEndOfTrack,
    /// A fixed width meta event declared a payload length it can't have
    #[error("Invalid meta event")]
    InvalidMetaEvent,
    /// End of input was signaled while a read was still pending
    #[error("Truncated data")]
    TruncatedData,
}

/// A fatal decode error, positioned at the absolute stream offset of the offending field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[error("Invalid MIDI data at byte {offset}: {kind}, {message}")]
pub struct DecodeError {
    /// What went wrong
    kind: ErrorKind,
    /// Human readable detail
    message: String,
    /// Absolute offset in the byte stream
    offset: u64,
}

impl DecodeError {
    /// Creates a decode error of the given kind at a stream offset
    pub fn new(kind: ErrorKind, offset: u64, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offset,
        }
    }

    /// The error's kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Detail message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Absolute byte offset where the violation was observed
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Outcome of a read that may have to wait for more bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Not enough bytes are buffered yet; retry after the next feed
    #[error("More bytes are required")]
    Incomplete,
    /// The bytes that are buffered are structurally invalid
    #[error(transparent)]
    Invalid(#[from] DecodeError),
}

/// Result of a read against a [`crate::reader::ByteCursor`]
pub type ReadResult<T> = Result<T, ReadError>;

#[cfg(test)]
mod tests {
    use super::{DecodeError, ErrorKind, ReadError};

    #[test]
    fn display_names_kind_and_offset() {
        let err = DecodeError::new(ErrorKind::InvalidChunkTag, 14, "expected MTrk");
        let rendered = err.to_string();

        assert!(rendered.contains("byte 14"));
        assert!(rendered.contains("Invalid chunk tag"));
        assert!(rendered.to_lowercase().contains("invalid midi"));
    }

    #[test]
    fn decode_errors_lift_into_read_errors() {
        let err = DecodeError::new(ErrorKind::MalformedVlq, 3, "too long");
        let read: ReadError = err.clone().into();

        assert_eq!(read, ReadError::Invalid(err))
    }
}
