use serde::Serialize;

/// One tick's worth of derived measurements.
///
/// `pitch_class` is `None` exactly when `frequency_hz` is 0. Loudness is
/// always measured, voiced or not.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AnalysisFrame {
    /// MIDI-style note number, `None` when no voiced pitch was found in range
    pub pitch_class: Option<i32>,
    /// Estimated fundamental in Hz (0.0 when unvoiced)
    pub frequency_hz: f32,
    /// RMS amplitude (0.0-1.0)
    pub loudness: f32,
}

impl AnalysisFrame {
    pub fn voiced(pitch_class: i32, frequency_hz: f32, loudness: f32) -> Self {
        Self {
            pitch_class: Some(pitch_class),
            frequency_hz,
            loudness,
        }
    }

    pub fn unvoiced(loudness: f32) -> Self {
        Self {
            pitch_class: None,
            frequency_hz: 0.0,
            loudness,
        }
    }

    pub fn is_voiced(&self) -> bool {
        self.pitch_class.is_some()
    }
}
