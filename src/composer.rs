use crate::generator::{Acceptability, Generator, TICKS_PER_BAR};
use crate::model::score::{Score, ScoreError};
use crate::render::channels::ChannelMap;
use crate::render::smf::{SaveError, save_score, write_smf};
use log::debug;
use std::io::{self, Seek, Write};
use std::path::Path;

const DEFAULT_VELOCITY: u8 = 64;

/// One piece under construction: the event store plus the channel state
/// used when it is serialized.
///
/// `reset` clears both, so channel bindings never leak from one piece into
/// the next.
#[derive(Debug, Default)]
pub struct Piece {
    score: Score,
    channels: ChannelMap,
}

impl Piece {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the score and all channel bindings, ready for a new piece.
    pub fn reset(&mut self) {
        self.score.reset();
        self.channels.reset();
    }

    /// Inserts one note (and its note-off, if velocity is non-zero).
    pub fn insert(
        &mut self,
        pitch: u8,
        velocity: u8,
        instrument: u32,
        onset: u32,
        duration: u32,
    ) -> Result<(), ScoreError> {
        self.score.insert(pitch, velocity, instrument, onset, duration)
    }

    /// Serializes the piece to `path` as a Format-0 MIDI file.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SaveError> {
        save_score(path, &self.score, &mut self.channels)
    }

    /// Serializes the piece into any seekable writer.
    pub fn write_to<W: Write + Seek>(&mut self, out: W) -> io::Result<()> {
        write_smf(out, &self.score, &mut self.channels)
    }

    pub fn score(&self) -> &Score {
        &self.score
    }
}

/// A generated composition: one duration and one pitch per melody note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub durations: Vec<u32>,
    pub melody: Vec<u8>,
}

/// Generates the rhythm and melody for `bars` bars of 4/4 under `rules`.
pub fn compose<A: Acceptability>(bars: u32, seed: u64, rules: &A) -> Composition {
    let mut generator = Generator::new(seed);
    let durations = generator.rhythm(bars);
    let melody = generator.melody(durations.len(), rules);
    debug!("Composed {} notes over {} bars..!", melody.len(), bars);

    Composition { durations, melody }
}

/// The four parts a composition renders into, each its own MIDI file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Melody,
    Counterpoint,
    Tenor,
    Bass,
}

impl Part {
    pub const ALL: [Part; 4] = [Part::Melody, Part::Counterpoint, Part::Tenor, Part::Bass];

    pub fn name(&self) -> &'static str {
        match self {
            Part::Melody => "Melody",
            Part::Counterpoint => "Counterpoint",
            Part::Tenor => "Tenor",
            Part::Bass => "Bass",
        }
    }
}

/// Populates `piece` with one part of the composition.
///
/// The melody and counterpoint follow the generated rhythm note for note;
/// tenor and bass place whole-bar chord tones under whichever melody note
/// starts each bar. Absolute time restarts at zero for every part.
pub fn render_part(
    piece: &mut Piece,
    composition: &Composition,
    part: Part,
    instrument: u32,
) -> Result<(), ScoreError> {
    let mut time = 0u32;
    for (&pitch, &duration) in composition.melody.iter().zip(&composition.durations) {
        match part {
            Part::Melody => {
                piece.insert(pitch, DEFAULT_VELOCITY, instrument, time, duration)?;
            }
            Part::Counterpoint => {
                if let Some(mapped) = counterpoint_pitch(pitch) {
                    piece.insert(mapped, DEFAULT_VELOCITY, instrument, time, duration)?;
                }
            }
            Part::Tenor | Part::Bass => {
                if time % TICKS_PER_BAR == 0 {
                    let tones = match part {
                        Part::Tenor => tenor_pitches(pitch),
                        _ => bass_pitches(pitch),
                    };
                    for &tone in tones {
                        piece.insert(tone, DEFAULT_VELOCITY, instrument, time, TICKS_PER_BAR)?;
                    }
                }
            }
        }
        time += duration;
    }

    Ok(())
}

fn counterpoint_pitch(pitch: u8) -> Option<u8> {
    let mapped = match pitch {
        60 => 51,
        62 => 53,
        63 => 55,
        65 => 62,
        67 => 63,
        68 => 60,
        70 => 62,
        72 => 63,
        74 => 65,
        75 => 67,
        77 => 74,
        79 => 75,
        80 => 72,
        82 => 74,
        84 => 75,
        _ => return None,
    };
    Some(mapped)
}

fn tenor_pitches(pitch: u8) -> &'static [u8] {
    match pitch {
        60 => &[43],
        62 | 65 => &[41],
        63 => &[48],
        67 => &[51],
        68 => &[53],
        70 => &[55],
        72 => &[56, 55],
        74 => &[58],
        75 => &[60, 53],
        77 => &[53],
        79 => &[63],
        80 => &[65],
        82 => &[67],
        84 => &[68],
        _ => &[],
    }
}

fn bass_pitches(pitch: u8) -> &'static [u8] {
    match pitch {
        60 | 63 => &[36],
        62 | 65 => &[34],
        67 => &[39],
        68 => &[41],
        70 => &[43],
        72 => &[44],
        74 => &[46],
        75 => &[48],
        79 => &[41],
        80 => &[43],
        82 => &[55],
        84 => &[56],
        _ => &[],
    }
}
