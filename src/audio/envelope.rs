/// Root-mean-square of the window. Unlike the pitch detector there is no
/// silence gate: quiet input still reports its true level.
pub fn rms(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = window.iter().map(|s| s * s).sum();
    let rms = (sum_squares / window.len() as f32).sqrt();
    if rms.is_finite() {
        rms
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn silence_is_zero() {
        assert_eq!(rms(&[0.0; 512]), 0.0);
    }

    #[test]
    fn empty_window_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn constant_signal() {
        assert_abs_diff_eq!(rms(&[0.5; 64]), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(rms(&[-0.25; 64]), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn full_scale_sine() {
        let window: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 44100.0).sin())
            .collect();
        assert_abs_diff_eq!(rms(&window), std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-3);
    }

    #[test]
    fn quiet_signal_is_not_gated() {
        let level = rms(&[0.001; 256]);
        assert!(level > 0.0);
        assert_abs_diff_eq!(level, 0.001, epsilon = 1e-7);
    }

    #[test]
    fn non_finite_input_falls_back_to_zero() {
        assert_eq!(rms(&[f32::NAN, 0.1]), 0.0);
    }
}
