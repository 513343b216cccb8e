//! Track chunk data enums and structs, and the resumable decoder that produces them

use event::ChannelEvent;
use meta::MetaEvent;
use sysex::SysexEvent;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    chunk::chunk_types::TRACK_DATA_CHUNK,
    config::{DecoderConfig, EndOfTrackPolicy},
    error::{DecodeError, ErrorKind, ReadError, ReadResult},
    reader::{msb_is_one, ByteCursor},
    Chunk,
};

pub mod event;
pub mod meta;
pub mod sysex;

/// A track chunk, containing one or more MTrk events. The last event is always
/// [`MetaEvent::EndOfTrack`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackChunk {
    /// All associated track events to this chunk
    mtrk_events: Vec<MTrkEvent>,
}

impl TrackChunk {
    /// The track's events in stream order
    pub fn events(&self) -> &[MTrkEvent] {
        &self.mtrk_events
    }

    /// Takes ownership of the events
    pub fn into_events(self) -> Vec<MTrkEvent> {
        self.mtrk_events
    }

    /// Number of events, end of track included
    pub fn len(&self) -> usize {
        self.mtrk_events.len()
    }

    /// Always false for a decoded track, which holds at least its end of track event
    pub fn is_empty(&self) -> bool {
        self.mtrk_events.is_empty()
    }
}

/// A MIDI Event with a delay and an attached Event
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MTrkEvent {
    /// Ticks to wait after the previous event in the same track before this one happens
    pub delay: u32,
    /// The event that occurs after the delay
    pub event: Event,
}

impl MTrkEvent {
    /// Decodes one event. `running_status` holds the last channel status byte seen in the track;
    /// it is consulted when the status byte is omitted and updated after every channel event.
    ///
    /// On [`ReadError::Incomplete`] the cursor may have moved part way into the event, callers
    /// rewind to a mark taken beforehand
    pub fn decode(cursor: &mut ByteCursor, running_status: &mut Option<u8>) -> ReadResult<Self> {
        let delay = cursor.read_vlq()?;

        let status_offset = cursor.offset();
        let candidate = cursor.peek()?;
        let status = if msb_is_one(candidate) {
            cursor.read_u8()?;
            candidate
        } else {
            running_status.ok_or_else(|| {
                DecodeError::new(
                    ErrorKind::MissingRunningStatus,
                    status_offset,
                    format!("data byte {candidate:#04X} with no running status"),
                )
            })?
        };

        let event = match status {
            0xFF => {
                let tag = cursor.read_u8()?;
                let length = cursor.read_vlq()? as usize;
                let data = cursor.read_vec(length)?;

                Event::MetaEvent(MetaEvent::from_payload(tag, data, status_offset)?)
            }

            0xF0 | 0xF7 => Event::SysexEvent(SysexEvent::decode(status, cursor)?),

            0x80..=0xEF => {
                let event = ChannelEvent::decode(status, cursor)?;
                *running_status = Some(status);
                Event::ChannelEvent(event)
            }

            _ => {
                return Err(DecodeError::new(
                    ErrorKind::UnknownEventType,
                    status_offset,
                    format!("status byte {status:#04X} is not a channel, meta or sysex event"),
                )
                .into())
            }
        };

        Ok(Self { delay, event })
    }

    /// True for the end of track meta event
    pub fn is_end_of_track(&self) -> bool {
        matches!(self.event, Event::MetaEvent(MetaEvent::EndOfTrack))
    }
}

/// Any event that may occur
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Event {
    /// A midi channel event
    ChannelEvent(ChannelEvent),
    /// A system exclusive event
    SysexEvent(SysexEvent),
    /// Specifies non-MIDI information useful to this format or to sequencers
    MetaEvent(MetaEvent),
}

/// Where a [`TrackDecoder`] is within its chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackPhase {
    /// Skipping bytes the previous chunk declared past its end of track
    Skipping {
        /// Bytes left to skip
        remaining: u64,
    },
    /// Waiting for the 8 byte `MTrk` prefix
    ChunkHeader,
    /// Decoding events until end of track, `end` is the absolute offset the chunk ends at
    Events {
        /// Absolute offset one past the chunk's last byte
        end: u64,
    },
}

/// Resumable decoder for a single track chunk. Every call to [`TrackDecoder::resume`] picks up at
/// the unit where the previous one ran out of bytes.
///
/// The track is returned as soon as its end of track event is decoded. Bytes the chunk still
/// declares after that are reported by [`TrackDecoder::trailing`] and skipped by the next track's
/// decoder, see [`TrackDecoder::skipping`]
#[derive(Debug, Clone)]
pub struct TrackDecoder {
    /// Position within the chunk
    phase: TrackPhase,
    /// Last channel status byte in this track, reset with every new track
    running_status: Option<u8>,
    /// Events decoded so far
    events: Vec<MTrkEvent>,
    /// Declared bytes left unread after end of track
    trailing: u64,
    /// Track index, for logs
    index: usize,
}

impl TrackDecoder {
    /// A decoder for the `index`th track of a file
    pub fn new(index: usize) -> Self {
        Self {
            phase: TrackPhase::ChunkHeader,
            running_status: None,
            events: vec![],
            trailing: 0,
            index,
        }
    }

    /// Skips `bytes` left over from the previous track before reading this track's chunk prefix
    pub fn skipping(mut self, bytes: u64) -> Self {
        if bytes > 0 {
            self.phase = TrackPhase::Skipping { remaining: bytes };
        }
        self
    }

    /// Bytes the finished chunk declared after its end of track event, not yet consumed
    pub fn trailing(&self) -> u64 {
        self.trailing
    }

    /// Decodes as much of the track as the cursor holds. Returns the finished track,
    /// [`ReadError::Incomplete`] with the cursor left at the next unit boundary, or a structural
    /// error
    pub fn resume(
        &mut self,
        cursor: &mut ByteCursor,
        config: &DecoderConfig,
    ) -> ReadResult<TrackChunk> {
        loop {
            match self.phase {
                TrackPhase::Skipping { remaining: 0 } => self.phase = TrackPhase::ChunkHeader,

                TrackPhase::Skipping { remaining } => {
                    let max = usize::try_from(remaining).unwrap_or(usize::MAX);
                    let skipped = cursor.skip_available(max);
                    cursor.compact();
                    if skipped == 0 {
                        return Err(ReadError::Incomplete);
                    }

                    self.phase = TrackPhase::Skipping {
                        remaining: remaining - skipped as u64,
                    };
                }

                TrackPhase::ChunkHeader => {
                    let chunk = Chunk::decode_expecting(cursor, TRACK_DATA_CHUNK)?;
                    log::debug!("Track {}: chunk declares {} bytes", self.index, chunk.len());

                    self.phase = TrackPhase::Events {
                        end: cursor.offset() + chunk.len() as u64,
                    };
                }

                TrackPhase::Events { end } => {
                    let event_start = cursor.offset();
                    if event_start == end {
                        self.exhausted(event_start, config)?;
                        return Ok(self.finish(0));
                    }

                    let mark = cursor.mark();
                    let mut running_status = self.running_status;
                    let event = match MTrkEvent::decode(cursor, &mut running_status) {
                        Ok(event) => event,
                        Err(e) => {
                            cursor.rewind(mark);
                            // Every byte the chunk declares is buffered, the event can't fit
                            if e == ReadError::Incomplete && cursor.buffered_end() >= end {
                                return Err(self.overrun(event_start, end).into());
                            }
                            return Err(e);
                        }
                    };

                    if cursor.offset() > end {
                        return Err(self.overrun(event_start, end).into());
                    }

                    self.running_status = running_status;
                    let finished = event.is_end_of_track();
                    self.events.push(event);
                    cursor.compact();

                    if finished {
                        return Ok(self.finish(end - cursor.offset()));
                    }
                }
            }
        }
    }

    /// Hands the decoded events over, remembering how many declared bytes were left unread
    fn finish(&mut self, trailing: u64) -> TrackChunk {
        if trailing > 0 {
            log::debug!(
                "Track {}: {trailing} bytes declared after end of track",
                self.index
            );
        }
        log::debug!("Track {}: {} events", self.index, self.events.len());

        self.trailing = trailing;
        TrackChunk {
            mtrk_events: std::mem::take(&mut self.events),
        }
    }

    /// An event starting at `event_start` that doesn't end by the chunk's `end`
    fn overrun(&self, event_start: u64, end: u64) -> DecodeError {
        DecodeError::new(
            ErrorKind::MissingEndOfTrack,
            event_start,
            format!(
                "event does not end within the {} bytes left in track {}",
                end - event_start,
                self.index
            ),
        )
    }

    /// Handles a chunk whose declared bytes ran out before an end of track event
    fn exhausted(&mut self, offset: u64, config: &DecoderConfig) -> Result<(), DecodeError> {
        match config.end_of_track {
            EndOfTrackPolicy::Strict => Err(DecodeError::new(
                ErrorKind::MissingEndOfTrack,
                offset,
                format!("track {} ended without an end of track event", self.index),
            )),
            EndOfTrackPolicy::Lenient => {
                log::warn!(
                    "Track {} ended without an end of track event, adding one",
                    self.index
                );
                self.events.push(MTrkEvent {
                    delay: 0,
                    event: Event::MetaEvent(MetaEvent::EndOfTrack),
                });
                Ok(())
            }
        }
    }
}
