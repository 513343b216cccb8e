//! Byte cursor over an incrementally fed MIDI stream, plus the primitive decoders that read from it
//!
//! Bytes only need to arrive in order, never in any particular grouping. Every read either
//! succeeds and advances the cursor or reports [`ReadError::Incomplete`] and leaves the cursor
//! exactly where it was, so the same read can be retried verbatim after the next
//! [`ByteCursor::feed`].

use crate::error::{DecodeError, ErrorKind, ReadError, ReadResult};

/// Maximum number of bytes a variable length quantity may occupy
pub const MAX_VLQ_BYTES: usize = 4;

/// Consumed bytes tolerated at the front of the buffer before [`ByteCursor::compact`] drops them
const COMPACT_THRESHOLD: usize = 4096;

/// A saved read position, used to roll a partially decoded unit back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(u64);

/// In-order byte accumulator with a read position
#[derive(Debug, Default, Clone)]
pub struct ByteCursor {
    /// Buffered bytes, starting at absolute offset `discarded`
    buffer: Vec<u8>,
    /// Read position relative to the start of `buffer`
    position: usize,
    /// Number of already consumed bytes dropped from the front of `buffer`
    discarded: u64,
}

impl ByteCursor {
    /// Creates an empty cursor
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends newly arrived bytes behind everything fed so far
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes that haven't been read yet
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Absolute offset of the read position within the whole stream
    pub fn offset(&self) -> u64 {
        self.discarded + self.position as u64
    }

    /// Absolute offset one past the last buffered byte
    pub fn buffered_end(&self) -> u64 {
        self.discarded + self.buffer.len() as u64
    }

    /// Returns the next `n` bytes and advances past them, or reports that fewer than `n` bytes
    /// are buffered without moving
    pub fn request(&mut self, n: usize) -> ReadResult<&[u8]> {
        if self.remaining() < n {
            return Err(ReadError::Incomplete);
        }

        let start = self.position;
        self.position += n;
        Ok(&self.buffer[start..self.position])
    }

    /// Looks at the next byte without consuming it
    pub fn peek(&self) -> ReadResult<u8> {
        self.buffer
            .get(self.position)
            .copied()
            .ok_or(ReadError::Incomplete)
    }

    /// Consumes up to `max` bytes, whatever is buffered, returning how many were skipped
    pub fn skip_available(&mut self, max: usize) -> usize {
        let skipped = self.remaining().min(max);
        self.position += skipped;
        skipped
    }

    /// Saves the current read position
    pub fn mark(&self) -> Mark {
        Mark(self.offset())
    }

    /// Restores a position saved with [`ByteCursor::mark`]
    pub fn rewind(&mut self, mark: Mark) {
        // Marks never predate a compaction, they're taken and released within one unit
        self.position = (mark.0 - self.discarded) as usize;
    }

    /// Drops consumed bytes once they make up most of the buffer, keeping memory bounded by the
    /// unit in flight without moving the tail on every call
    pub fn compact(&mut self) {
        if self.position < COMPACT_THRESHOLD || self.position < self.remaining() {
            return;
        }

        self.buffer.drain(..self.position);
        self.discarded += self.position as u64;
        self.position = 0;
    }
}

impl ByteCursor {
    /// Reads one byte
    pub fn read_u8(&mut self) -> ReadResult<u8> {
        Ok(self.request(1)?[0])
    }

    /// Reads a big endian 16 bit unsigned integer
    pub fn read_u16(&mut self) -> ReadResult<u16> {
        let bytes = self.request(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big endian 32 bit unsigned integer
    pub fn read_u32(&mut self) -> ReadResult<u32> {
        let bytes = self.request(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads exactly `n` bytes into an owned buffer
    pub fn read_vec(&mut self, n: usize) -> ReadResult<Vec<u8>> {
        Ok(self.request(n)?.to_vec())
    }

    /// Reads a variable length quantity: 7 payload bits per byte, most significant group first,
    /// continuing while the top bit is set
    pub fn read_vlq(&mut self) -> ReadResult<u32> {
        const MASK: u8 = 0x7F;

        let start = self.offset();
        let unread = &self.buffer[self.position..];
        let mut result: u32 = 0;

        for (idx, byte) in unread.iter().take(MAX_VLQ_BYTES).enumerate() {
            result = (result << 7) | (byte & MASK) as u32;

            if !msb_is_one(*byte) {
                self.position += idx + 1;
                return Ok(result);
            }
        }

        if unread.len() >= MAX_VLQ_BYTES {
            Err(DecodeError::new(
                ErrorKind::MalformedVlq,
                start,
                format!("variable length quantity exceeds {MAX_VLQ_BYTES} bytes"),
            )
            .into())
        } else {
            Err(ReadError::Incomplete)
        }
    }
}

/// Returns true if the msb of a byte is 1
pub fn msb_is_one(byte: u8) -> bool {
    byte >> 7 == 1
}
