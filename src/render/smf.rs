use crate::model::score::Score;
use crate::render::channels::ChannelMap;
use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Ticks per quarter note, matching the 480-tick grid the generator uses.
pub const DIVISION: u16 = 0x01E0;

/// Offset of the MTrk length field: 14-byte header chunk plus 4-byte tag.
const TRACK_LENGTH_OFFSET: u64 = 18;

const NOTE_ON: u8 = 0x90;
const END_OF_TRACK: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Failed to open '{path}' for writing: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to write MIDI data to '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Counts every byte on its way to the output, so the back-patched track
/// length can never drift from what was actually written.
struct TrackCounter<W> {
    inner: W,
    count: u32,
}

impl<W: Write> TrackCounter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    fn restart(&mut self) {
        self.count = 0;
    }

    fn count(&self) -> u32 {
        self.count
    }

    fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for TrackCounter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u32;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writes `value` as a MIDI variable-length quantity.
///
/// Zero is the single byte `0x00`; anything else is split into up to four
/// 7-bit groups (the low 28 bits), most significant first, with the high
/// bit set on every group but the last. Leading zero groups are omitted.
pub fn write_vlq<W: Write>(out: &mut W, value: u32) -> io::Result<()> {
    if value == 0 {
        return out.write_all(&[0x00]);
    }

    let mut groups = [0u8; 4];
    for (i, group) in groups.iter_mut().enumerate() {
        *group = ((value >> (7 * i)) & 0x7F) as u8;
    }

    let top = groups.iter().rposition(|&g| g != 0).unwrap_or(0);
    for i in (0..=top).rev() {
        let byte = if i == 0 { groups[i] } else { groups[i] | 0x80 };
        out.write_all(&[byte])?;
    }

    Ok(())
}

/// Serializes `score` as a Format-0 single-track Standard MIDI File.
///
/// Channel state in `channels` is consulted (and mutated) per event, in
/// event order; the track length at byte 18 is patched once the body and
/// end-of-track marker are down.
pub fn write_smf<W: Write + Seek>(
    out: W,
    score: &Score,
    channels: &mut ChannelMap,
) -> io::Result<()> {
    let mut track = TrackCounter::new(out);

    track.write_all(b"MThd")?;
    track.write_all(&6u32.to_be_bytes())?;
    track.write_all(&0u16.to_be_bytes())?; // format 0
    track.write_all(&1u16.to_be_bytes())?; // single track
    track.write_all(&DIVISION.to_be_bytes())?;

    track.write_all(b"MTrk")?;
    track.write_all(&0u32.to_be_bytes())?; // length, patched below
    track.restart();

    let mut cursor = 0u32;
    for event in score.iter() {
        let delta = event.onset - cursor;
        let channel = channels.resolve(&mut track, event.instrument, delta)?;
        write_vlq(&mut track, delta)?;
        track.write_all(&[NOTE_ON | channel, event.pitch, event.velocity])?;
        cursor = event.onset;
    }
    track.write_all(&END_OF_TRACK)?;

    let length = track.count();
    let mut out = track.into_inner();
    out.seek(SeekFrom::Start(TRACK_LENGTH_OFFSET))?;
    out.write_all(&length.to_be_bytes())?;
    out.flush()?;

    debug!("Serialized {} events into {} track bytes..!", score.len(), length);
    Ok(())
}

/// Writes `score` to `path`. The file handle is scoped to this call and is
/// released on every exit path, including mid-write failures.
pub fn save_score<P: AsRef<Path>>(
    path: P,
    score: &Score,
    channels: &mut ChannelMap,
) -> Result<(), SaveError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| SaveError::Open {
        path: path.into(),
        source,
    })?;

    write_smf(BufWriter::new(file), score, channels).map_err(|source| SaveError::Write {
        path: path.into(),
        source,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn vlq_bytes(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        write_vlq(&mut out, value).unwrap();
        out
    }

    fn read_vlq(bytes: &[u8]) -> (u32, usize) {
        let mut value = 0u32;
        for (i, &byte) in bytes.iter().enumerate() {
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return (value, i + 1);
            }
        }
        panic!("Unterminated VLQ: {:02X?}", bytes);
    }

    fn serialize(score: &Score) -> Vec<u8> {
        let mut channels = ChannelMap::new();
        let mut cursor = Cursor::new(Vec::new());
        write_smf(&mut cursor, score, &mut channels).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn vlq_encodings_are_exact() {
        assert_eq!(vlq_bytes(0), vec![0x00]);
        assert_eq!(vlq_bytes(1), vec![0x01]);
        assert_eq!(vlq_bytes(127), vec![0x7F]);
        assert_eq!(vlq_bytes(128), vec![0x81, 0x00]);
        assert_eq!(vlq_bytes(16_383), vec![0xFF, 0x7F]);
        assert_eq!(vlq_bytes(16_384), vec![0x81, 0x80, 0x00]);
        assert_eq!(vlq_bytes(2_097_151), vec![0xFF, 0xFF, 0x7F]);
        assert_eq!(vlq_bytes(2_097_152), vec![0x81, 0x80, 0x80, 0x00]);
        assert_eq!(vlq_bytes(268_435_455), vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn vlq_round_trips_minimally() {
        for value in [
            0u32, 1, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, 268_435_455,
        ] {
            let encoded = vlq_bytes(value);
            let (decoded, used) = read_vlq(&encoded);
            assert_eq!(decoded, value);
            assert_eq!(used, encoded.len());
            // No superfluous leading zero group.
            if encoded.len() > 1 {
                assert_ne!(encoded[0], 0x80);
            }
        }
    }

    #[test]
    fn two_note_scenario_is_byte_exact() {
        let mut score = Score::new();
        score.insert(60, 64, 1, 0, 480).unwrap();
        score.insert(62, 64, 1, 480, 480).unwrap();

        let bytes = serialize(&score);

        #[rustfmt::skip]
        let expected = vec![
            // MThd: length 6, format 0, one track, division 0x01E0
            0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06,
            0x00, 0x00, 0x00, 0x01, 0x01, 0xE0,
            // MTrk, 25 body bytes
            0x4D, 0x54, 0x72, 0x6B, 0x00, 0x00, 0x00, 0x19,
            // Program Change to program 0 on channel 0 at delta 0
            0x00, 0xC0, 0x00,
            // Note-On 60 vel 64 at delta 0
            0x00, 0x90, 0x3C, 0x40,
            // Note-On 62 vel 64 at delta 480 (same channel, no reprogram)
            0x83, 0x60, 0x90, 0x3E, 0x40,
            // Note-On 60 vel 0 at delta 0
            0x00, 0x90, 0x3C, 0x00,
            // Note-On 62 vel 0 at delta 480
            0x83, 0x60, 0x90, 0x3E, 0x00,
            // End of track
            0x00, 0xFF, 0x2F, 0x00,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn track_length_matches_bytes_after_the_field() {
        let mut score = Score::new();
        for (i, onset) in [0u32, 480, 960, 960, 2400].iter().enumerate() {
            score.insert(60 + i as u8, 64, 1 + i as u32, *onset, 480).unwrap();
        }

        let bytes = serialize(&score);
        let length = u32::from_be_bytes(bytes[18..22].try_into().unwrap());
        assert_eq!(length as usize, bytes.len() - 22);
    }

    #[test]
    fn out_of_order_insertions_serialize_in_onset_order() {
        let mut score = Score::new();
        score.insert(60, 64, 1, 960, 480).unwrap();
        score.insert(62, 64, 1, 0, 480).unwrap();

        let bytes = serialize(&score);

        // Walk the track body and recover absolute event times.
        let body = &bytes[22..bytes.len() - 4];
        let mut at = 0usize;
        let mut absolute = 0u32;
        let mut onsets = Vec::new();
        while at < body.len() {
            let (delta, used) = read_vlq(&body[at..]);
            at += used;
            absolute += delta;
            let status = body[at];
            match status & 0xF0 {
                0xC0 => at += 2,
                0x90 => {
                    onsets.push(absolute);
                    at += 3;
                }
                other => panic!("Unexpected status byte {:#04X}", other),
            }
        }

        assert_eq!(onsets, vec![0, 480, 960, 1440]);
    }

    #[test]
    fn empty_score_still_forms_a_legal_file() {
        let bytes = serialize(&Score::new());

        assert_eq!(&bytes[..4], b"MThd");
        assert_eq!(&bytes[14..18], b"MTrk");
        assert_eq!(u32::from_be_bytes(bytes[18..22].try_into().unwrap()), 4);
        assert_eq!(bytes[22..], END_OF_TRACK);
    }

    #[test]
    fn generated_bytes_parse_under_midly() {
        let mut score = Score::new();
        score.insert(60, 64, 1, 0, 480).unwrap();
        score.insert(63, 64, 2, 480, 960).unwrap();
        score.insert(55, 64, 1, 480, 480).unwrap();

        let bytes = serialize(&score);
        let smf = midly::Smf::parse(&bytes).unwrap();

        assert_eq!(smf.header.format, midly::Format::SingleTrack);
        assert_eq!(
            smf.header.timing,
            midly::Timing::Metrical(midly::num::u15::new(480))
        );
        assert_eq!(smf.tracks.len(), 1);

        let track = &smf.tracks[0];
        assert!(matches!(
            track.last().unwrap().kind,
            midly::TrackEventKind::Meta(midly::MetaMessage::EndOfTrack)
        ));

        let note_ons = track
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    midly::TrackEventKind::Midi {
                        message: midly::MidiMessage::NoteOn { .. },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(note_ons, 6);
    }
}
