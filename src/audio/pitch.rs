//! Time-domain autocorrelation pitch estimation.
//!
//! For every candidate lag in `[min_lag, N/2)` the correlation
//! `r(lag) = sum(w[i] * w[i + lag])` over the first half of the window is
//! computed.
//!
//! A raw sum over a fixed span does not decay with lag, so whole multiples of
//! the period score almost like the period itself, and the winner drifts a
//! few samples whenever the span is not a whole number of periods. By default
//! the sums are therefore normalized into the NSDF of McLeod and Wyvill,
//! `2 r(lag) / sum(w[i]^2 + w[i + lag]^2)`, which peaks at 1 for a perfect
//! repetition. The period is the first key maximum (highest point of a
//! positive region) within [`KEY_MAXIMUM_TOLERANCE`] of the highest one.
//!
//! With normalization off, the largest raw sum wins. Comparison is strict,
//! so an equal value found later never replaces an earlier lag.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use super::envelope;

pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.01;
pub const DEFAULT_MIN_LAG: usize = 8;

/// Fraction of the highest key maximum an earlier one must reach to be
/// taken as the period.
pub const KEY_MAXIMUM_TOLERANCE: f32 = 0.9;

/// How the correlation sums are computed. Both produce the same lag
/// selection; `Fft` trades the O(N^2) direct sum for two forward FFTs and
/// one inverse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Direct,
    Fft,
}

/// Forward and inverse plans for one window length, kept between calls.
#[derive(Clone)]
struct FftPlan {
    len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftPlan {
    fn new(len: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            len,
            forward,
            inverse,
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }
}

impl fmt::Debug for FftPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftPlan").field("len", &self.len).finish()
    }
}

#[derive(Clone, Debug)]
pub struct PitchDetector {
    silence_threshold: f32,
    min_lag: usize,
    method: Method,
    normalize: bool,
    fft: Option<FftPlan>,
}

impl Default for PitchDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD, DEFAULT_MIN_LAG, Method::Direct)
    }
}

impl PitchDetector {
    pub fn new(silence_threshold: f32, min_lag: usize, method: Method) -> Self {
        Self {
            silence_threshold,
            // lag 0 is the signal's energy, never a period
            min_lag: min_lag.max(1),
            method,
            normalize: true,
            fft: None,
        }
    }

    pub fn with_normalization(mut self, enabled: bool) -> Self {
        self.normalize = enabled;
        self
    }

    /// Estimate the fundamental frequency of `window` in Hz.
    ///
    /// Returns 0.0 for silence, for windows too short to hold a single
    /// candidate lag, for a non-finite or non-positive sample rate, and when
    /// no lag correlates positively.
    pub fn estimate(&mut self, window: &[f32], sample_rate: f32) -> f32 {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return 0.0;
        }
        if window.len() < 2 * self.min_lag {
            return 0.0;
        }
        if envelope::rms(window) < self.silence_threshold {
            return 0.0;
        }

        let min_lag = self.min_lag;
        let method = self.method;
        let correlations = match method {
            Method::Direct => correlate_direct(window, min_lag),
            Method::Fft => correlate_fft(self.fft_plan(window.len()), window, min_lag),
        };

        let best_lag = if self.normalize {
            let nsdf = normalize(window, &correlations, min_lag);
            select_key_maximum(&nsdf, min_lag)
        } else {
            select_best_lag(&correlations, min_lag)
        };
        let Some(best_lag) = best_lag else {
            return 0.0;
        };

        let frequency = sample_rate / best_lag as f32;
        if frequency.is_finite() && frequency > 0.0 {
            frequency
        } else {
            0.0
        }
    }

    fn fft_plan(&mut self, len: usize) -> &mut FftPlan {
        if self.fft.as_ref().map_or(false, |plan| plan.len != len) {
            self.fft = None;
        }
        self.fft.get_or_insert_with(|| FftPlan::new(len))
    }
}

/// Correlation for each lag below `window.len() / 2`. Entries below
/// `min_lag` are left at zero and never considered.
fn correlate_direct(window: &[f32], min_lag: usize) -> Vec<f32> {
    let half = window.len() / 2;
    let mut correlations = vec![0.0f32; half];
    for lag in min_lag..half {
        correlations[lag] = window[..half]
            .iter()
            .zip(&window[lag..lag + half])
            .map(|(a, b)| a * b)
            .sum();
    }
    correlations
}

/// Same sums as [`correlate_direct`] via the cross-correlation theorem.
/// The head of the window (first half, zero padded) is correlated against
/// the whole window; `i + lag < N` for every term, so the circular product
/// never wraps.
fn correlate_fft(plan: &mut FftPlan, window: &[f32], min_lag: usize) -> Vec<f32> {
    let size = window.len();
    let half = size / 2;

    let mut full: Vec<Complex<f32>> = window.iter().map(|&s| Complex::new(s, 0.0)).collect();
    let mut head: Vec<Complex<f32>> = window
        .iter()
        .enumerate()
        .map(|(i, &s)| Complex::new(if i < half { s } else { 0.0 }, 0.0))
        .collect();
    plan.forward.process_with_scratch(&mut full, &mut plan.scratch);
    plan.forward.process_with_scratch(&mut head, &mut plan.scratch);

    for (f, h) in full.iter_mut().zip(&head) {
        *f *= h.conj();
    }
    plan.inverse.process_with_scratch(&mut full, &mut plan.scratch);

    let scale = 1.0 / size as f32;
    let mut correlations = vec![0.0f32; half];
    for lag in min_lag..half {
        correlations[lag] = full[lag].re * scale;
    }
    correlations
}

/// NSDF from the raw sums: the head's energy is fixed, the lagged span's
/// energy comes from a running sum of squares.
fn normalize(window: &[f32], correlations: &[f32], min_lag: usize) -> Vec<f32> {
    let half = correlations.len();
    let mut energy = Vec::with_capacity(window.len() + 1);
    energy.push(0.0f64);
    let mut total = 0.0f64;
    for &s in window {
        total += s as f64 * s as f64;
        energy.push(total);
    }
    let head = energy[half];

    let mut nsdf = vec![0.0f32; half];
    for lag in min_lag..half {
        let denominator = head + energy[lag + half] - energy[lag];
        if denominator > 0.0 {
            nsdf[lag] = (2.0 * correlations[lag] as f64 / denominator) as f32;
        }
    }
    nsdf
}

/// Lag with the largest correlation above zero. Ties keep the first lag.
fn select_best_lag(correlations: &[f32], min_lag: usize) -> Option<usize> {
    let mut best_lag = None;
    let mut best_correlation = 0.0f32;
    for (lag, &correlation) in correlations.iter().enumerate().skip(min_lag) {
        if correlation > best_correlation {
            best_correlation = correlation;
            best_lag = Some(lag);
        }
    }
    best_lag
}

/// First key maximum within [`KEY_MAXIMUM_TOLERANCE`] of the highest.
///
/// The lobe around lag 0 (positive and falling) is skipped. A positive
/// region still rising at the last lag has not peaked yet and is ignored.
fn select_key_maximum(nsdf: &[f32], min_lag: usize) -> Option<usize> {
    let last = nsdf.len().checked_sub(1)?;

    let mut start = min_lag;
    while start < last && nsdf[start] > 0.0 && nsdf[start + 1] <= nsdf[start] {
        start += 1;
    }

    let mut maxima: Vec<(usize, f32)> = Vec::new();
    let mut region: Option<(usize, f32)> = None;
    for (lag, &value) in nsdf.iter().enumerate().skip(start) {
        if value > 0.0 {
            if region.map_or(true, |(_, peak)| value > peak) {
                region = Some((lag, value));
            }
        } else if let Some(peak) = region.take() {
            maxima.push(peak);
        }
    }
    if let Some((lag, value)) = region {
        if lag < last {
            maxima.push((lag, value));
        }
    }

    let highest = maxima.iter().map(|&(_, v)| v).fold(0.0f32, f32::max);
    maxima
        .into_iter()
        .find(|&(_, v)| v >= highest * KEY_MAXIMUM_TOLERANCE)
        .map(|(lag, _)| lag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin()
            })
            .collect()
    }

    /// Frequencies from the lowest with four periods in `len` samples up to
    /// 1200 Hz, one percent apart.
    fn sweep(sample_rate: f32, len: usize, step: f32) -> Vec<f32> {
        let mut frequencies = Vec::new();
        let mut f = 4.0 * sample_rate / len as f32;
        while f <= 1200.0 {
            frequencies.push(f);
            f *= step;
        }
        frequencies
    }

    /// Estimated period is at most one lag away from the true period.
    fn assert_within_one_lag(estimate: f32, frequency: f32, sample_rate: f32) {
        assert!(estimate > 0.0, "{frequency} Hz at {sample_rate}: unvoiced");
        let period = sample_rate / frequency;
        let lag = sample_rate / estimate;
        assert!(
            (lag - period).abs() <= 1.0 + 1e-3,
            "{frequency} Hz at {sample_rate}: got {estimate} (lag {lag}, period {period})"
        );
    }

    #[test]
    fn silence_returns_zero() {
        let mut detector = PitchDetector::default();
        assert_eq!(detector.estimate(&[0.0; 2048], 44100.0), 0.0);
    }

    #[test]
    fn quiet_signal_is_gated() {
        let mut detector = PitchDetector::default();
        let window = sine(440.0, 44100.0, 2048, 0.005);
        assert_eq!(detector.estimate(&window, 44100.0), 0.0);
    }

    #[test]
    fn detects_a440() {
        let mut detector = PitchDetector::default();
        let window = sine(440.0, 44100.0, 2048, 0.5);
        assert_within_one_lag(detector.estimate(&window, 44100.0), 440.0, 44100.0);
    }

    #[test]
    fn sines_with_four_periods_land_within_one_lag() {
        let mut detector = PitchDetector::default();
        for &sr in &[44100.0f32, 48000.0] {
            for f in sweep(sr, 2048, 1.01) {
                let window = sine(f, sr, 2048, 0.5);
                assert_within_one_lag(detector.estimate(&window, sr), f, sr);
            }
        }
    }

    #[test]
    fn former_octave_and_edge_failures() {
        let mut detector = PitchDetector::default();
        for &(f, sr) in &[
            (103.079819f32, 48000.0f32),
            (105.151726, 48000.0),
            (97.857964, 44100.0),
            (113.33, 44100.0),
            (92.2, 44100.0),
            (75.0, 44100.0),
        ] {
            let window = sine(f, sr, 2048, 0.5);
            assert_within_one_lag(detector.estimate(&window, sr), f, sr);
        }
    }

    #[test]
    fn harmonics_do_not_pull_down_an_octave() {
        let sr = 44100.0;
        let window: Vec<f32> = (0..2048)
            .map(|i| {
                let t = i as f32 / sr;
                let w = 2.0 * std::f32::consts::PI * 220.0 * t;
                0.5 * w.sin() + 0.3 * (2.0 * w + 0.4).sin() + 0.2 * (3.0 * w + 1.0).sin()
            })
            .collect();
        let freq = PitchDetector::default().estimate(&window, sr);
        assert_within_one_lag(freq, 220.0, sr);
    }

    #[test]
    fn fft_matches_direct() {
        let mut direct = PitchDetector::new(0.01, 8, Method::Direct);
        let mut fft = PitchDetector::new(0.01, 8, Method::Fft);
        for f in sweep(44100.0, 2048, 1.05) {
            let window = sine(f, 44100.0, 2048, 0.5);
            let by_direct = direct.estimate(&window, 44100.0);
            let by_fft = fft.estimate(&window, 44100.0);
            // float rounding may tip a near-tie to the neighbouring lag
            assert!(
                (44100.0 / by_direct - 44100.0 / by_fft).abs() <= 1.0 + 1e-3,
                "{f} Hz: direct {by_direct}, fft {by_fft}"
            );
        }
    }

    #[test]
    fn fft_correlations_match_direct_sums() {
        let window = sine(300.0, 44100.0, 1024, 0.5);
        let direct = correlate_direct(&window, 8);
        let fft = correlate_fft(&mut FftPlan::new(1024), &window, 8);
        for lag in 8..512 {
            assert!((direct[lag] - fft[lag]).abs() < 1e-2, "lag {lag}");
        }
    }

    #[test]
    fn fft_plan_is_kept_per_window_length() {
        let mut detector = PitchDetector::new(0.01, 8, Method::Fft);
        detector.estimate(&sine(440.0, 44100.0, 2048, 0.5), 44100.0);
        let first = detector.fft.as_ref().map(|plan| Arc::clone(&plan.forward)).unwrap();

        detector.estimate(&sine(330.0, 44100.0, 2048, 0.5), 44100.0);
        let plan = detector.fft.as_ref().unwrap();
        assert!(Arc::ptr_eq(&first, &plan.forward));

        detector.estimate(&sine(330.0, 44100.0, 1024, 0.5), 44100.0);
        assert_eq!(detector.fft.as_ref().unwrap().len, 1024);
    }

    #[test]
    fn nsdf_of_a_sine_peaks_near_one_at_the_period() {
        let window = sine(441.0, 44100.0, 2048, 0.5);
        let nsdf = normalize(&window, &correlate_direct(&window, 8), 8);
        assert!(nsdf[100] > 0.99, "got {}", nsdf[100]);
        assert!(nsdf[50] < -0.99, "got {}", nsdf[50]);
        assert!(nsdf.iter().all(|v| (-1.0 - 1e-4..=1.0 + 1e-4).contains(v)));
    }

    #[test]
    fn degenerate_inputs_return_zero() {
        let mut detector = PitchDetector::default();
        let window = sine(440.0, 44100.0, 2048, 0.5);
        assert_eq!(detector.estimate(&[], 44100.0), 0.0);
        assert_eq!(detector.estimate(&window[..15], 44100.0), 0.0);
        assert_eq!(detector.estimate(&window, f32::NAN), 0.0);
        assert_eq!(detector.estimate(&window, f32::INFINITY), 0.0);
        assert_eq!(detector.estimate(&window, 0.0), 0.0);
        assert_eq!(detector.estimate(&window, -44100.0), 0.0);
    }

    #[test]
    fn non_finite_samples_return_zero() {
        let mut detector = PitchDetector::default();
        let mut window = sine(440.0, 44100.0, 2048, 0.5);
        window[10] = f32::NAN;
        assert_eq!(detector.estimate(&window, 44100.0), 0.0);
    }

    #[test]
    fn first_of_equal_correlations_wins() {
        let mut correlations = vec![0.0f32; 16];
        correlations[9] = 3.0;
        correlations[11] = 5.0;
        correlations[13] = 5.0;
        assert_eq!(select_best_lag(&correlations, 8), Some(11));
    }

    #[test]
    fn nothing_above_zero_selects_no_lag() {
        let correlations = vec![-1.0f32; 16];
        assert_eq!(select_best_lag(&correlations, 8), None);
        assert_eq!(select_key_maximum(&correlations, 8), None);
    }

    #[test]
    fn lags_below_minimum_are_ignored() {
        let mut correlations = vec![0.0f32; 16];
        correlations[3] = 10.0;
        correlations[12] = 1.0;
        assert_eq!(select_best_lag(&correlations, 8), Some(12));
    }

    #[test]
    fn first_key_maximum_within_tolerance_wins() {
        // lobe from lag 0, then regions peaking at 0.5, 0.93 and 1.0
        let nsdf = [
            1.0, 0.8, 0.4, -0.2, 0.3, 0.5, 0.2, -0.4, 0.6, 0.93, 0.7, -0.1, 0.8, 1.0, 0.9, -0.3,
        ];
        assert_eq!(select_key_maximum(&nsdf, 1), Some(9));
    }

    #[test]
    fn region_still_rising_at_the_end_is_ignored() {
        let nsdf = [1.0, 0.5, -0.5, 0.2, 0.6, -0.1, 0.1, 0.5, 0.9];
        assert_eq!(select_key_maximum(&nsdf, 1), Some(4));
    }

    #[test]
    fn raw_selection_can_be_kept() {
        let mut detector = PitchDetector::default().with_normalization(false);
        let window = sine(440.0, 44100.0, 2048, 0.5);
        let freq = detector.estimate(&window, 44100.0);
        assert!(freq > 0.0);
        // unnormalized, the winner is some whole multiple of the period
        let periods = (44100.0 / freq) / (44100.0 / 440.0);
        assert!((periods - periods.round()).abs() < 0.1, "got {freq}");
    }
}
