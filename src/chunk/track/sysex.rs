//! System Exclusive Messages

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::ReadResult, reader::ByteCursor};

/// Which status byte introduced a system exclusive event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SysexKind {
    /// `0xF0`, a complete message or the first packet of a divided one
    Normal,
    /// `0xF7`, a continuation packet or an escape for arbitrary bytes
    Divided,
}

/// A midi system exclusive event message, kept as the raw length-prefixed payload
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SysexEvent {
    /// Status byte family
    pub kind: SysexKind,
    /// Payload bytes exactly as declared, a trailing `0xF7` included if present
    pub data: Vec<u8>,
}

impl SysexEvent {
    /// Reads the VLQ length and payload following a `0xF0` or `0xF7` status byte
    pub fn decode(status: u8, cursor: &mut ByteCursor) -> ReadResult<Self> {
        let kind = if status == 0xF7 {
            SysexKind::Divided
        } else {
            SysexKind::Normal
        };

        let length = cursor.read_vlq()? as usize;
        let data = cursor.read_vec(length)?;

        Ok(Self { kind, data })
    }
}

#[cfg(test)]
mod tests {
    use super::{SysexEvent, SysexKind};
    use crate::{error::ReadError, reader::ByteCursor};

    #[test]
    fn sys_ex_message_valid_parse() {
        let mut cursor = ByteCursor::new();
        cursor.feed(&[0x04, 0x43, 0x12, 0x00, 0xF7, 0x00]);

        let sysex = SysexEvent::decode(0xF0, &mut cursor).expect("Parse sysex message from bytes");
        let expected = SysexEvent {
            kind: SysexKind::Normal,
            data: vec![0x43, 0x12, 0x00, 0xF7],
        };

        assert_eq!(sysex, expected);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn divided_packet_is_tagged() {
        let mut cursor = ByteCursor::new();
        cursor.feed(&[0x02, 0x01, 0xF7]);

        let sysex = SysexEvent::decode(0xF7, &mut cursor).expect("Parse escape packet");
        assert_eq!(sysex.kind, SysexKind::Divided);
        assert_eq!(sysex.data, vec![0x01, 0xF7]);
    }

    #[test]
    fn short_payload_waits_for_more_bytes() {
        let mut cursor = ByteCursor::new();
        cursor.feed(&[0x03, 0x01]);

        assert_eq!(
            SysexEvent::decode(0xF0, &mut cursor),
            Err(ReadError::Incomplete)
        );
    }
}
