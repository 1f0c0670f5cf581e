use std::time::Duration;

use super::decode::AudioData;

/// Something the render loop can pull a window of samples from once per
/// tick. Reads never block: a source that has nothing to offer returns
/// `None` and the tick is skipped.
pub trait SampleSource {
    /// The most recent window of samples, oldest first.
    fn current_window(&mut self) -> Option<&[f32]>;

    fn sample_rate(&self) -> f32;

    /// Move the source's clock forward. Live captures advance on their own
    /// and can ignore this.
    fn advance(&mut self, _elapsed: Duration) {}

    /// No more windows will ever come. Live captures never run dry.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Replays a decoded buffer as if it were playing: the window always ends
/// at the current playback position. Before a full window has played the
/// front is zero, like an analyser that has just been attached.
pub struct PlaybackSource {
    samples: Vec<f32>,
    sample_rate: u32,
    window: Vec<f32>,
    position: f64,
}

impl PlaybackSource {
    pub fn new(audio: AudioData, window_size: usize) -> Self {
        Self {
            samples: audio.samples,
            sample_rate: audio.sample_rate,
            window: vec![0.0; window_size],
            position: 0.0,
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn is_finished(&self) -> bool {
        self.position as usize >= self.samples.len()
    }
}

impl SampleSource for PlaybackSource {
    fn current_window(&mut self) -> Option<&[f32]> {
        if self.is_finished() || self.window.is_empty() {
            return None;
        }

        let end = (self.position as usize).max(1).min(self.samples.len());
        let start = end.saturating_sub(self.window.len());
        let available = &self.samples[start..end];
        let pad = self.window.len() - available.len();

        self.window[..pad].fill(0.0);
        self.window[pad..].copy_from_slice(available);
        Some(&self.window)
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }

    fn advance(&mut self, elapsed: Duration) {
        self.position += elapsed.as_secs_f64() * self.sample_rate as f64;
    }

    fn is_exhausted(&self) -> bool {
        self.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, sample_rate: u32) -> AudioData {
        AudioData {
            samples: (0..len).map(|i| i as f32).collect(),
            sample_rate,
        }
    }

    #[test]
    fn window_ends_at_playback_position() {
        let mut source = PlaybackSource::new(ramp(1000, 100), 4);
        source.advance(Duration::from_millis(500));
        assert_eq!(source.current_window().unwrap(), &[46.0, 47.0, 48.0, 49.0]);
    }

    #[test]
    fn early_windows_are_zero_padded() {
        let mut source = PlaybackSource::new(ramp(1000, 100), 4);
        source.advance(Duration::from_millis(20));
        assert_eq!(source.current_window().unwrap(), &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn unavailable_after_the_end() {
        let mut source = PlaybackSource::new(ramp(100, 100), 4);
        source.advance(Duration::from_millis(990));
        assert!(source.current_window().is_some());
        source.advance(Duration::from_millis(20));
        assert!(source.is_finished());
        assert!(source.current_window().is_none());
        // stale reads stay harmless
        assert!(source.current_window().is_none());
    }

    #[test]
    fn duration_follows_sample_rate() {
        let source = PlaybackSource::new(ramp(44100, 44100), 2048);
        assert_eq!(source.duration(), Duration::from_secs(1));
        assert_eq!(source.sample_rate(), 44100.0);
    }
}
