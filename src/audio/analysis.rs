use std::ops::RangeInclusive;

use crate::config::AnalysisConfig;

use super::envelope;
use super::features::AnalysisFrame;
use super::note::{Note, PitchRange};
use super::pitch::PitchDetector;

/// Turns one sample window into an [`AnalysisFrame`].
///
/// Two gates sit between the detector and the frame: a frequency gate for
/// the human vocal range, then the pitch-class range. Anything rejected is
/// stored as unvoiced, so a frame never carries a frequency without a note.
#[derive(Clone, Debug)]
pub struct Analyzer {
    detector: PitchDetector,
    voice_range: RangeInclusive<f32>,
    pitch_range: PitchRange,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl Analyzer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            detector: PitchDetector::new(config.silence_threshold, config.min_lag, config.method)
                .with_normalization(config.normalize),
            voice_range: config.min_frequency_hz..=config.max_frequency_hz,
            pitch_range: PitchRange::new(config.min_pitch_class, config.max_pitch_class),
        }
    }

    pub fn analyze(&mut self, window: &[f32], sample_rate: f32) -> AnalysisFrame {
        let loudness = envelope::rms(window);
        let frequency = self.detector.estimate(window, sample_rate);

        match self.voiced_note(frequency) {
            Some(note) => AnalysisFrame::voiced(note.pitch_class, frequency, loudness),
            None => AnalysisFrame::unvoiced(loudness),
        }
    }

    fn voiced_note(&self, frequency: f32) -> Option<Note> {
        if !self.voice_range.contains(&frequency) {
            return None;
        }
        self.pitch_range.note_for(frequency)
    }
}
