use std::fmt;
use std::ops::RangeInclusive;

const A4_HZ: f32 = 440.0;
const A4_PITCH_CLASS: i32 = 69;
const SEMITONES_PER_OCTAVE: i32 = 12;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Text shown wherever a note or octave is unavailable.
pub const SENTINEL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub name: &'static str,
    pub octave: i32,
    pub pitch_class: i32,
}

impl Note {
    /// Nearest equal-tempered note (A4 = 440 Hz). `None` for frequencies
    /// that are not positive and finite.
    pub fn from_frequency(freq_hz: f32) -> Option<Self> {
        if !freq_hz.is_finite() || freq_hz <= 0.0 {
            return None;
        }
        let pitch_class = (A4_PITCH_CLASS as f32
            + SEMITONES_PER_OCTAVE as f32 * (freq_hz / A4_HZ).log2())
        .round() as i32;
        Some(Self::from_pitch_class(pitch_class))
    }

    pub fn from_pitch_class(pitch_class: i32) -> Self {
        let index = pitch_class.rem_euclid(SEMITONES_PER_OCTAVE) as usize;
        Self {
            name: NOTE_NAMES[index],
            octave: pitch_class.div_euclid(SEMITONES_PER_OCTAVE) - 1,
            pitch_class,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// Instrument range filter applied by callers of [`Note::from_frequency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PitchRange {
    pitch_classes: RangeInclusive<i32>,
}

impl Default for PitchRange {
    /// C1 (24) through C6 plus headroom (84).
    fn default() -> Self {
        Self::new(24, 84)
    }
}

impl PitchRange {
    pub fn new(lowest: i32, highest: i32) -> Self {
        Self {
            pitch_classes: lowest..=highest,
        }
    }

    /// Map `freq_hz` to a note, dropping anything outside the range.
    pub fn note_for(&self, freq_hz: f32) -> Option<Note> {
        Note::from_frequency(freq_hz).filter(|note| self.pitch_classes.contains(&note.pitch_class))
    }
}
