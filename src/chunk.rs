//! Chunk level decoding: the 8 byte tag/length prefix shared by header and track chunks

use crate::{
    error::{DecodeError, ErrorKind, ReadResult},
    reader::ByteCursor,
    Chunk,
};

pub mod chunk_types;
pub mod header;
pub mod track;

impl Chunk {
    /// Reads a chunk's tag and length, failing if the tag isn't `expected`
    pub fn decode_expecting(cursor: &mut ByteCursor, expected: [char; 4]) -> ReadResult<Self> {
        let start = cursor.offset();
        let bytes = cursor.request(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);

        let chunk = Chunk::from(u64::from_be_bytes(raw));
        if chunk.chunk_type != expected {
            return Err(DecodeError::new(
                ErrorKind::InvalidChunkTag,
                start,
                format!(
                    "expected {:?} chunk, found {:?}",
                    chunk_types::tag_name(expected),
                    chunk_types::tag_name(chunk.chunk_type)
                ),
            )
            .into());
        }

        Ok(chunk)
    }
}
