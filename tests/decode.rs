//! End to end decoding of assembled files, whole and in slices

use miami_stream::{
    chunk::{
        header::{Division, Format},
        track::{
            event::{ChannelEvent, ChannelMessage, ControlChange, NoteMeta},
            meta::MetaEvent,
            sysex::{SysexEvent, SysexKind},
            Event, MTrkEvent,
        },
    },
    decoder::{DriveResult, MidiDecoder},
    error::{DecodeError, ErrorKind},
    Midi,
};
use pretty_assertions::assert_eq;

/// Appends a chunk with its tag and big endian length
fn chunk(out: &mut Vec<u8>, tag: &[u8; 4], body: &[u8]) {
    out.extend(tag);
    out.extend((body.len() as u32).to_be_bytes());
    out.extend(body);
}

/// Encodes a variable length quantity
fn vlq(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    bytes
}

/// Encodes a meta event with no delay
fn meta(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x00, 0xFF, tag];
    bytes.extend(vlq(payload.len() as u32));
    bytes.extend(payload);
    bytes
}

/// A two track format 1 file at 480 ticks per quarter note. The second track plays a scale and
/// a closing chord
fn scale_file() -> Vec<u8> {
    let mut conductor = vec![];
    conductor.extend(meta(0x04, b""));
    conductor.extend(meta(0x51, &[0x09, 0x27, 0xC0]));
    conductor.extend(meta(0x03, b"Sequence Name"));
    conductor.extend(meta(0x2F, &[]));

    let mut piano = vec![];
    piano.extend(meta(0x04, b"Acoustic Grand Piano"));
    piano.extend(meta(0x03, b"My New Track"));
    piano.extend([0x00, 0xB0, 7, 127]);
    piano.extend([0x00, 0xC0, 1]);
    for note in SCALE {
        piano.extend([0x00, 0x90, note, 127]);
        piano.extend(vlq(480));
        piano.extend([0x80, note, 127]);
    }
    // Closing chord, the second note of each pair relies on running status
    piano.extend([0x00, 0x90, 60, 100, 0x00, 64, 100]);
    piano.extend(vlq(960));
    piano.extend([0x80, 60, 0, 0x00, 64, 0]);
    piano.extend(meta(0x2F, &[]));

    let mut file = vec![];
    chunk(&mut file, b"MThd", &[0x00, 0x01, 0x00, 0x02, 0x01, 0xE0]);
    chunk(&mut file, b"MTrk", &conductor);
    chunk(&mut file, b"MTrk", &piano);
    file
}

/// Notes of the scale in the second track
const SCALE: [u8; 8] = [64, 66, 68, 69, 71, 73, 75, 76];

fn channel(delay: u32, message: ChannelMessage) -> MTrkEvent {
    MTrkEvent {
        delay,
        event: Event::ChannelEvent(ChannelEvent { channel: 0, message }),
    }
}

fn meta_event(event: MetaEvent) -> MTrkEvent {
    MTrkEvent {
        delay: 0,
        event: Event::MetaEvent(event),
    }
}

/// Feeds `bytes` in slices of `size` bytes, collecting every non suspended outcome including the
/// one produced by finishing
fn outcomes_in_slices(bytes: &[u8], size: usize) -> Vec<DriveResult> {
    let mut decoder = MidiDecoder::new();
    let mut outcomes = vec![];

    for slice in bytes.chunks(size) {
        match decoder.feed(slice) {
            DriveResult::Suspended | DriveResult::Finished => {}
            other => outcomes.push(other),
        }
    }

    match decoder.finish() {
        DriveResult::Suspended | DriveResult::Finished => {}
        other => outcomes.push(other),
    }

    outcomes
}

fn decode_in_slices(bytes: &[u8], size: usize) -> Result<Midi, DecodeError> {
    let mut outcomes = outcomes_in_slices(bytes, size);
    assert_eq!(outcomes.len(), 1, "Exactly one outcome is reported");

    match outcomes.remove(0) {
        DriveResult::Completed(midi) => Ok(midi),
        DriveResult::Failed(e) => Err(e),
        other => panic!("Unexpected outcome {other:?}"),
    }
}

#[test]
fn header_decodes_with_expected_fields() {
    let midi = MidiDecoder::decode(&scale_file()).expect("Decode scale file");

    assert_eq!(midi.header().format(), Format::One);
    assert_eq!(midi.header().ntrks(), 2);
    assert_eq!(midi.header().division(), Division::Metrical(480));
    assert_eq!(midi.tracks().len(), midi.header().ntrks() as usize);
}

#[test]
fn tracks_decode_with_expected_events() {
    let midi = MidiDecoder::decode(&scale_file()).expect("Decode scale file");

    let conductor = vec![
        meta_event(MetaEvent::InstrumentName(String::new())),
        meta_event(MetaEvent::SetTempo(600_000)),
        meta_event(MetaEvent::TrackName("Sequence Name".to_string())),
        meta_event(MetaEvent::EndOfTrack),
    ];
    assert_eq!(midi.tracks()[0].events(), conductor.as_slice());

    let mut piano = vec![
        meta_event(MetaEvent::InstrumentName("Acoustic Grand Piano".to_string())),
        meta_event(MetaEvent::TrackName("My New Track".to_string())),
        channel(
            0,
            ChannelMessage::Controller(ControlChange {
                controller_number: 7,
                new_value: 127,
            }),
        ),
        channel(0, ChannelMessage::ProgramChange(1)),
    ];
    for key in SCALE {
        let note = NoteMeta { key, velocity: 127 };
        piano.push(channel(0, ChannelMessage::NoteOn(note)));
        piano.push(channel(480, ChannelMessage::NoteOff(note)));
    }
    for (delay, velocity, message) in [
        (0, 100, ChannelMessage::NoteOn as fn(NoteMeta) -> ChannelMessage),
        (960, 0, ChannelMessage::NoteOff),
    ] {
        piano.push(channel(delay, message(NoteMeta { key: 60, velocity })));
        piano.push(channel(0, message(NoteMeta { key: 64, velocity })));
    }
    piano.push(meta_event(MetaEvent::EndOfTrack));

    assert_eq!(midi.tracks()[1].events(), piano.as_slice());
}

#[test]
fn every_partition_matches_whole_buffer() {
    let bytes = scale_file();
    let whole = MidiDecoder::decode(&bytes).expect("Decode whole buffer");

    for size in 1..=bytes.len() {
        let sliced = decode_in_slices(&bytes, size).expect("Decode in slices");
        assert_eq!(sliced, whole, "slice size {size}");
    }
}

#[test]
fn irregular_partition_matches_whole_buffer() {
    let bytes = scale_file();
    let whole = MidiDecoder::decode(&bytes).expect("Decode whole buffer");

    let mut decoder = MidiDecoder::new();
    let mut rest = bytes.as_slice();
    let mut seed = 7usize;
    let mut outcome = DriveResult::Suspended;

    while !rest.is_empty() {
        seed = (seed * 31 + 11) % 23;
        let (slice, tail) = rest.split_at((seed + 1).min(rest.len()));
        rest = tail;
        outcome = decoder.feed(slice);
    }

    assert_eq!(outcome, DriveResult::Completed(whole));
}

#[test]
fn corrupted_header_tag_fails_once_in_every_mode() {
    let mut bytes = scale_file();
    bytes[2] = b'X';

    let whole = MidiDecoder::decode(&bytes).expect_err("Reject corrupted tag");
    assert_eq!(whole.kind(), ErrorKind::InvalidChunkTag);
    assert_eq!(whole.offset(), 0);
    assert!(whole.to_string().to_lowercase().contains("invalid midi"));

    for size in [1, 3, 64] {
        let outcomes = outcomes_in_slices(&bytes, size);
        assert_eq!(outcomes, vec![DriveResult::Failed(whole.clone())]);
    }
}

#[test]
fn corrupted_track_tag_reports_its_offset() {
    let mut bytes = scale_file();
    bytes[14] = b'X';

    let err = MidiDecoder::decode(&bytes).expect_err("Reject corrupted track tag");
    assert_eq!(err.kind(), ErrorKind::InvalidChunkTag);
    assert_eq!(err.offset(), 14);
}

#[test]
fn truncated_file_fails_in_every_mode() {
    let bytes = scale_file();
    let cut = &bytes[..bytes.len() - 2];

    let whole = MidiDecoder::decode(cut).expect_err("Reject truncated file");
    assert_eq!(whole.kind(), ErrorKind::TruncatedData);

    let sliced = decode_in_slices(cut, 5).expect_err("Reject truncated file");
    assert_eq!(sliced, whole);
}

#[test]
fn missing_running_status_fails() {
    let mut file = vec![];
    chunk(&mut file, b"MThd", &[0x00, 0x00, 0x00, 0x01, 0x00, 0x60]);
    chunk(&mut file, b"MTrk", &[0x00, 0x3C, 0x40, 0x00, 0xFF, 0x2F, 0x00]);

    let err = MidiDecoder::decode(&file).expect_err("Reject implied status");
    assert_eq!(err.kind(), ErrorKind::MissingRunningStatus);
    assert_eq!(err.offset(), 23);
}

#[test]
fn running_status_resets_between_tracks() {
    let mut file = vec![];
    chunk(&mut file, b"MThd", &[0x00, 0x01, 0x00, 0x02, 0x00, 0x60]);
    chunk(&mut file, b"MTrk", &[0x00, 0x90, 0x3C, 0x40, 0x00, 0xFF, 0x2F, 0x00]);
    chunk(&mut file, b"MTrk", &[0x00, 0x3C, 0x40, 0x00, 0xFF, 0x2F, 0x00]);

    let err = MidiDecoder::decode(&file).expect_err("Reject inherited status");
    assert_eq!(err.kind(), ErrorKind::MissingRunningStatus);
}

#[test]
fn malformed_delay_fails() {
    let mut file = vec![];
    chunk(&mut file, b"MThd", &[0x00, 0x00, 0x00, 0x01, 0x00, 0x60]);
    chunk(
        &mut file,
        b"MTrk",
        &[0x81, 0x80, 0x80, 0x80, 0x80, 0x00, 0xFF, 0x2F, 0x00],
    );

    for size in [1, 2, file.len()] {
        let err = decode_in_slices(&file, size).expect_err("Reject oversized delay");
        assert_eq!(err.kind(), ErrorKind::MalformedVlq);
        assert_eq!(err.offset(), 22);
    }
}

#[test]
fn invalid_header_fields_fail() {
    let mut file = vec![];
    chunk(&mut file, b"MThd", &[0x00, 0x03, 0x00, 0x01, 0x00, 0x60]);
    assert_eq!(
        MidiDecoder::decode(&file).map_err(|e| e.kind()).err(),
        Some(ErrorKind::InvalidFormatType)
    );

    let mut file = vec![];
    chunk(&mut file, b"MThd", &[0x00, 0x00, 0x00, 0x01]);
    assert_eq!(
        MidiDecoder::decode(&file).map_err(|e| e.kind()).err(),
        Some(ErrorKind::InvalidHeaderLength)
    );
}

#[test]
fn sysex_and_unknown_meta_events_survive_streaming() {
    let mut body = vec![0x00, 0xF0, 0x05, 0x7E, 0x7F, 0x09, 0x01, 0xF7];
    body.extend([0x00, 0xF7, 0x01, 0xF7]);
    body.extend(meta(0x60, &[0xAA, 0xBB]));
    body.extend(meta(0x2F, &[]));

    let mut file = vec![];
    chunk(&mut file, b"MThd", &[0x00, 0x00, 0x00, 0x01, 0xE7, 0x28]);
    chunk(&mut file, b"MTrk", &body);

    let midi = decode_in_slices(&file, 1).expect("Decode byte by byte");
    let events = midi.tracks()[0].events();

    assert_eq!(
        events[0].event,
        Event::SysexEvent(SysexEvent {
            kind: SysexKind::Normal,
            data: vec![0x7E, 0x7F, 0x09, 0x01, 0xF7],
        })
    );
    assert_eq!(
        events[1].event,
        Event::SysexEvent(SysexEvent {
            kind: SysexKind::Divided,
            data: vec![0xF7],
        })
    );
    assert_eq!(
        events[2].event,
        Event::MetaEvent(MetaEvent::Unknown(0x60, vec![0xAA, 0xBB]))
    );
    assert_eq!(midi, MidiDecoder::decode(&file).expect("Decode whole buffer"));
}

/// A single track file whose track chunk declares `length` bytes but holds only `body`
fn overstated_track(length: u32, body: &[u8]) -> Vec<u8> {
    let mut file = vec![];
    chunk(&mut file, b"MThd", &[0x00, 0x00, 0x00, 0x01, 0x00, 0x60]);
    file.extend(b"MTrk");
    file.extend(length.to_be_bytes());
    file.extend(body);
    file
}

#[test]
fn last_track_declaring_extra_bytes_completes_at_end_of_track() {
    let file = overstated_track(10, &[0x00, 0xFF, 0x2F, 0x00]);

    let whole = MidiDecoder::decode(&file).expect("Decode overstated track");
    assert_eq!(whole.tracks()[0].events(), &[meta_event(MetaEvent::EndOfTrack)]);

    let mut decoder = MidiDecoder::new();
    assert_eq!(
        decoder.feed(&file),
        DriveResult::Completed(whole.clone())
    );

    for size in [1, 3, file.len()] {
        assert_eq!(decode_in_slices(&file, size), Ok(whole.clone()));
    }
}

#[test]
fn declared_bytes_after_end_of_track_are_skipped_before_the_next_track() {
    let mut file = vec![];
    chunk(&mut file, b"MThd", &[0x00, 0x01, 0x00, 0x02, 0x00, 0x60]);
    chunk(&mut file, b"MTrk", &[0x00, 0xFF, 0x2F, 0x00, 0x4D, 0x54, 0x72]);
    chunk(&mut file, b"MTrk", &[0x00, 0xC0, 0x05, 0x00, 0xFF, 0x2F, 0x00]);

    let whole = MidiDecoder::decode(&file).expect("Decode padded track");
    assert_eq!(whole.tracks().len(), 2);
    assert_eq!(
        whole.tracks()[1].events()[0],
        channel(0, ChannelMessage::ProgramChange(5))
    );

    for size in 1..=file.len() {
        assert_eq!(decode_in_slices(&file, size), Ok(whole.clone()), "slice size {size}");
    }
}

#[test]
fn payload_overrunning_the_track_fails_where_it_starts() {
    let meta_overrun = [0x00, 0xFF, 0x01, 0x7F, b'a', b'b'];
    let sysex_overrun = [0x00, 0xF0, 0x7F, 0x43, 0x12, 0x00];

    for body in [&meta_overrun[..], &sysex_overrun[..]] {
        let file = overstated_track(body.len() as u32, body);
        let mut padded = file.clone();
        padded.extend([0u8; 200]);

        for bytes in [&file, &padded] {
            let whole = MidiDecoder::decode(bytes).expect_err("Reject overrunning payload");
            assert_eq!(whole.kind(), ErrorKind::MissingEndOfTrack);
            assert_eq!(whole.offset(), 22);

            for size in [1, 4] {
                let sliced = decode_in_slices(bytes, size).expect_err("Reject overrunning payload");
                assert_eq!((sliced.kind(), sliced.offset()), (whole.kind(), whole.offset()));
            }
        }

        let mut decoder = MidiDecoder::new();
        assert!(matches!(
            decoder.feed(&file),
            DriveResult::Failed(e) if e.kind() == ErrorKind::MissingEndOfTrack
        ));
    }
}
