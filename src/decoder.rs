//! The file level state machine: one header chunk followed by the declared number of track
//! chunks, fed either all at once or piece by piece

use crate::{
    chunk::{
        header::HeaderChunk,
        track::{TrackChunk, TrackDecoder},
    },
    config::DecoderConfig,
    error::{DecodeError, ErrorKind, ReadError},
    reader::ByteCursor,
    Midi,
};

/// Outcome of driving a [`MidiDecoder`] with the bytes available so far
#[derive(Debug, Clone, PartialEq)]
pub enum DriveResult {
    /// Every buffered byte that could be decoded has been, more input is needed
    Suspended,
    /// The whole file decoded successfully
    Completed(Midi),
    /// The input is structurally invalid, nothing of it is returned
    Failed(DecodeError),
    /// An outcome was already reported by an earlier call, the input was ignored
    Finished,
}

/// Where the decoder is within the file
#[derive(Debug, Clone)]
enum DecoderState {
    /// Nothing decoded yet
    AwaitingHeader,
    /// Header decoded, working through track chunks in order
    DecodingTrack {
        /// The decoded header
        header: HeaderChunk,
        /// Tracks finished so far
        tracks: Vec<TrackChunk>,
        /// The track in progress
        current: TrackDecoder,
    },
    /// The file was delivered to the caller
    Complete,
    /// An error was delivered to the caller
    Errored,
}

/// Push based Standard MIDI File decoder.
///
/// Bytes can be fed in chunks of any size, decoding advances as far as the buffered bytes allow
/// after every [`MidiDecoder::feed`] and resumes at the same point on the next one. Call
/// [`MidiDecoder::finish`] once the byte source is exhausted.
///
/// ```rust
/// use miami_stream::decoder::{DriveResult, MidiDecoder};
///
/// let bytes = b"MThd\x00\x00\x00\x06\x00\x00\x00\x01\x00\x60\
///               MTrk\x00\x00\x00\x04\x00\xFF\x2F\x00";
///
/// let mut decoder = MidiDecoder::new();
/// let (first, second) = bytes.split_at(17);
///
/// assert_eq!(decoder.feed(first), DriveResult::Suspended);
/// match decoder.feed(second) {
///     DriveResult::Completed(midi) => assert_eq!(midi.tracks().len(), 1),
///     other => panic!("Unexpected outcome {other:?}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MidiDecoder {
    /// Buffered input
    cursor: ByteCursor,
    /// Progress through the file
    state: DecoderState,
    /// Decoding options
    config: DecoderConfig,
}

impl Default for MidiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiDecoder {
    /// Creates a decoder with the default configuration
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Creates a decoder with a custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            cursor: ByteCursor::new(),
            state: DecoderState::AwaitingHeader,
            config,
        }
    }

    /// Decodes a complete file held in memory
    pub fn decode(bytes: &[u8]) -> Result<Midi, DecodeError> {
        Self::decode_with_config(bytes, DecoderConfig::default())
    }

    /// Decodes a complete file held in memory with a custom configuration
    pub fn decode_with_config(bytes: &[u8], config: DecoderConfig) -> Result<Midi, DecodeError> {
        let mut decoder = Self::with_config(config);

        let outcome = match decoder.feed(bytes) {
            DriveResult::Suspended => decoder.finish(),
            other => other,
        };

        match outcome {
            DriveResult::Completed(midi) => Ok(midi),
            DriveResult::Failed(e) => Err(e),
            DriveResult::Suspended | DriveResult::Finished => Err(DecodeError::new(
                ErrorKind::TruncatedData,
                decoder.offset(),
                "decoder stopped without an outcome",
            )),
        }
    }

    /// Appends newly arrived bytes and decodes as far as they allow
    pub fn feed(&mut self, bytes: &[u8]) -> DriveResult {
        if self.is_finished() {
            return DriveResult::Finished;
        }

        self.cursor.feed(bytes);
        self.drive()
    }

    /// Declares the end of input. A decoder still waiting for bytes fails with
    /// [`ErrorKind::TruncatedData`]
    pub fn finish(&mut self) -> DriveResult {
        if self.is_finished() {
            return DriveResult::Finished;
        }

        match self.drive() {
            DriveResult::Suspended => {
                let pending = match &self.state {
                    DecoderState::DecodingTrack { tracks, .. } => format!("track {}", tracks.len()),
                    _ => "the header chunk".to_string(),
                };
                self.fail(DecodeError::new(
                    ErrorKind::TruncatedData,
                    self.cursor.offset(),
                    format!(
                        "input ended inside {pending} with {} unread bytes",
                        self.cursor.remaining()
                    ),
                ))
            }
            other => other,
        }
    }

    /// True once a completion or an error has been reported
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            DecoderState::Complete | DecoderState::Errored
        )
    }

    /// Absolute offset of the next byte the decoder will read
    pub fn offset(&self) -> u64 {
        self.cursor.offset()
    }

    /// Advances the state machine until it needs more bytes or reaches an outcome
    fn drive(&mut self) -> DriveResult {
        loop {
            let state = std::mem::replace(&mut self.state, DecoderState::Errored);

            match state {
                DecoderState::AwaitingHeader => match HeaderChunk::decode(&mut self.cursor) {
                    Ok(header) => {
                        log::debug!(
                            "Decoded header: {:?}, {} tracks, {:?}",
                            header.format(),
                            header.ntrks(),
                            header.division()
                        );

                        if header.ntrks() == 0 {
                            return self.complete(header, vec![]);
                        }

                        self.state = DecoderState::DecodingTrack {
                            header,
                            tracks: Vec::with_capacity(header.ntrks() as usize),
                            current: TrackDecoder::new(0),
                        };
                    }
                    Err(ReadError::Incomplete) => {
                        log::trace!("Suspended awaiting the header chunk");
                        self.state = DecoderState::AwaitingHeader;
                        return DriveResult::Suspended;
                    }
                    Err(ReadError::Invalid(e)) => return self.fail(e),
                },

                DecoderState::DecodingTrack {
                    header,
                    mut tracks,
                    mut current,
                } => match current.resume(&mut self.cursor, &self.config) {
                    Ok(track) => {
                        tracks.push(track);

                        if tracks.len() == header.ntrks() as usize {
                            return self.complete(header, tracks);
                        }

                        self.state = DecoderState::DecodingTrack {
                            header,
                            current: TrackDecoder::new(tracks.len()).skipping(current.trailing()),
                            tracks,
                        };
                    }
                    Err(ReadError::Incomplete) => {
                        log::trace!(
                            "Suspended in track {} at byte {}",
                            tracks.len(),
                            self.cursor.offset()
                        );
                        self.state = DecoderState::DecodingTrack {
                            header,
                            tracks,
                            current,
                        };
                        return DriveResult::Suspended;
                    }
                    Err(ReadError::Invalid(e)) => return self.fail(e),
                },

                DecoderState::Complete | DecoderState::Errored => {
                    self.state = state;
                    return DriveResult::Finished;
                }
            }
        }
    }

    /// Delivers the assembled file
    fn complete(&mut self, header: HeaderChunk, tracks: Vec<TrackChunk>) -> DriveResult {
        self.state = DecoderState::Complete;

        let ignored = self.cursor.remaining();
        if ignored > 0 {
            log::warn!("Ignoring {ignored} bytes after the last declared track");
        }

        DriveResult::Completed(Midi::new(header, tracks))
    }

    /// Delivers an error, the decoder accepts no more input afterwards
    fn fail(&mut self, error: DecodeError) -> DriveResult {
        log::debug!("Decode failed: {error}");
        self.state = DecoderState::Errored;
        DriveResult::Failed(error)
    }
}
