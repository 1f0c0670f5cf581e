//! Pan and vertical-zoom state for the history view.
//!
//! Horizontal zoom is not stored here: it comes from an external control
//! every tick and only decides how many frames fit on screen. Pan decides
//! which of those windows is shown, with 0 pinned to the newest data.

use crate::config::ViewportConfig;

/// Pitch classes the grid spans at vertical zoom 1 (C1..C5).
pub const BASE_PITCH_LOW: f32 = 24.0;
pub const BASE_PITCH_HIGH: f32 = 72.0;

/// Range of the external time-zoom control.
pub const HORIZONTAL_ZOOM_MIN: f32 = 1.0;
pub const HORIZONTAL_ZOOM_MAX: f32 = 5.0;

const POSITIVE_WHEEL_STEP: f32 = 1.05;
const NON_POSITIVE_WHEEL_STEP: f32 = 0.95;

/// Clamp a time-zoom control value into its range; garbage becomes 1.
pub fn clamp_horizontal_zoom(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(HORIZONTAL_ZOOM_MIN, HORIZONTAL_ZOOM_MAX)
    } else {
        HORIZONTAL_ZOOM_MIN
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    /// 0 shows the newest window, 1 the oldest
    pub pan_fraction: f32,
    pub vertical_zoom: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            pan_fraction: 0.0,
            vertical_zoom: 1.0,
        }
    }
}

/// Half-open range of logical history indices to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleWindow {
    pub start: usize,
    pub end: usize,
}

impl VisibleWindow {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Visible band of pitch classes, centered on the base range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchSpan {
    pub low: f32,
    pub high: f32,
}

impl PitchSpan {
    /// 0.0 at the bottom of the band, 1.0 at the top. Not clamped.
    pub fn position(&self, pitch_class: f32) -> f32 {
        (pitch_class - self.low) / (self.high - self.low)
    }
}

#[derive(Clone, Debug)]
pub struct ViewportController {
    state: ViewportState,
    history_capacity: usize,
    pan_sensitivity: f32,
    zoom_min: f32,
    zoom_max: f32,
}

impl ViewportController {
    pub fn new(config: &ViewportConfig, history_capacity: usize) -> Self {
        Self {
            state: ViewportState::default(),
            history_capacity,
            pan_sensitivity: config.pan_sensitivity,
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    /// Pan by a drag delta expressed as a fraction of the surface width.
    pub fn apply_pan(&mut self, delta_fraction: f32) {
        if !delta_fraction.is_finite() {
            return;
        }
        self.state.pan_fraction =
            (self.state.pan_fraction + delta_fraction * self.pan_sensitivity).clamp(0.0, 1.0);
    }

    /// Pan by a pointer drag of `dx` pixels on a surface `surface_width` wide.
    /// Dragging right moves towards older data.
    pub fn apply_drag(&mut self, dx: f32, surface_width: f32) {
        if surface_width <= 0.0 {
            return;
        }
        self.apply_pan(dx / surface_width);
    }

    /// Multiplicative zoom step; only the sign of `wheel_delta` matters.
    pub fn apply_zoom_delta(&mut self, wheel_delta: f32) {
        if wheel_delta.is_nan() {
            return;
        }
        let factor = if wheel_delta > 0.0 {
            POSITIVE_WHEEL_STEP
        } else {
            NON_POSITIVE_WHEEL_STEP
        };
        self.state.vertical_zoom =
            (self.state.vertical_zoom * factor).clamp(self.zoom_min, self.zoom_max);
    }

    /// Back to live data. Vertical zoom is a user preference and survives.
    pub fn reset_pan(&mut self) {
        self.state.pan_fraction = 0.0;
    }

    pub fn visible_window(&self, history_len: usize, horizontal_zoom: f32) -> VisibleWindow {
        let zoom = if horizontal_zoom.is_finite() && horizontal_zoom > 0.0 {
            horizontal_zoom
        } else {
            1.0
        };
        let window_size = ((self.history_capacity as f32 / zoom).floor() as usize).max(2);
        let max_start = history_len.saturating_sub(window_size);
        let start = (max_start as f32 * (1.0 - self.state.pan_fraction)).round() as usize;
        let end = history_len.min(start + window_size);
        VisibleWindow { start, end }
    }

    pub fn pitch_span(&self) -> PitchSpan {
        let center = (BASE_PITCH_LOW + BASE_PITCH_HIGH) / 2.0;
        let span = (BASE_PITCH_HIGH - BASE_PITCH_LOW) / self.state.vertical_zoom;
        PitchSpan {
            low: center - span / 2.0,
            high: center + span / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn controller() -> ViewportController {
        ViewportController::new(&ViewportConfig::default(), 600)
    }

    #[test]
    fn defaults() {
        let viewport = controller();
        assert_eq!(viewport.state(), ViewportState::default());
        let span = viewport.pitch_span();
        assert_eq!((span.low, span.high), (24.0, 72.0));
    }

    #[test]
    fn pan_is_scaled_and_clamped() {
        let mut viewport = controller();
        viewport.apply_pan(0.5);
        assert_relative_eq!(viewport.state().pan_fraction, 0.35);
        viewport.apply_pan(10.0);
        assert_eq!(viewport.state().pan_fraction, 1.0);
        viewport.apply_pan(-10.0);
        assert_eq!(viewport.state().pan_fraction, 0.0);
        viewport.apply_pan(f32::NAN);
        assert_eq!(viewport.state().pan_fraction, 0.0);
    }

    #[test]
    fn drag_converts_pixels_to_fraction() {
        let mut viewport = controller();
        viewport.apply_drag(90.0, 900.0);
        assert_relative_eq!(viewport.state().pan_fraction, 0.07);
        viewport.apply_drag(90.0, 0.0);
        assert_relative_eq!(viewport.state().pan_fraction, 0.07);
    }

    #[test]
    fn zoom_steps_by_sign_and_clamps() {
        let mut viewport = controller();
        viewport.apply_zoom_delta(120.0);
        assert_relative_eq!(viewport.state().vertical_zoom, 1.05);
        viewport.apply_zoom_delta(-3.0);
        assert_relative_eq!(viewport.state().vertical_zoom, 1.05 * 0.95);

        for _ in 0..200 {
            viewport.apply_zoom_delta(1.0);
        }
        assert_eq!(viewport.state().vertical_zoom, 4.0);
        for _ in 0..200 {
            viewport.apply_zoom_delta(-1.0);
        }
        assert_eq!(viewport.state().vertical_zoom, 0.5);
    }

    #[test]
    fn zero_wheel_delta_steps_like_a_negative_one() {
        let mut viewport = controller();
        viewport.apply_zoom_delta(0.0);
        assert_relative_eq!(viewport.state().vertical_zoom, 0.95);
        viewport.apply_zoom_delta(-0.0);
        assert_relative_eq!(viewport.state().vertical_zoom, 0.95 * 0.95);
        viewport.apply_zoom_delta(f32::NAN);
        assert_relative_eq!(viewport.state().vertical_zoom, 0.95 * 0.95);
    }

    #[test]
    fn zoom_narrows_pitch_span_around_center() {
        let mut viewport = controller();
        for _ in 0..200 {
            viewport.apply_zoom_delta(1.0);
        }
        let span = viewport.pitch_span();
        assert_relative_eq!(span.low, 42.0);
        assert_relative_eq!(span.high, 54.0);
        assert_relative_eq!(span.position(48.0), 0.5);
    }

    #[test]
    fn zero_pan_shows_newest() {
        let viewport = controller();
        assert_eq!(viewport.visible_window(1000, 2.0), VisibleWindow { start: 700, end: 1000 });
        assert_eq!(viewport.visible_window(250, 1.0), VisibleWindow { start: 0, end: 250 });
        assert_eq!(viewport.visible_window(600, 1.0).end, 600);
    }

    #[test]
    fn full_pan_shows_oldest() {
        let mut viewport = controller();
        viewport.apply_pan(10.0);
        let window = viewport.visible_window(600, 3.0);
        assert_eq!(window, VisibleWindow { start: 0, end: 200 });
    }

    #[test]
    fn half_pan_is_in_between() {
        let mut viewport = controller();
        viewport.apply_pan(0.5 / 0.7);
        let window = viewport.visible_window(600, 2.0);
        assert_eq!(window.len(), 300);
        assert_eq!(window.start, 150);
    }

    #[test]
    fn window_never_narrower_than_two() {
        let viewport = controller();
        let window = viewport.visible_window(600, 1000.0);
        assert_eq!(window.len(), 2);
        assert_eq!(window.end, 600);
    }

    #[test]
    fn bad_horizontal_zoom_falls_back_to_one() {
        let viewport = controller();
        assert_eq!(viewport.visible_window(600, 0.0).len(), 600);
        assert_eq!(viewport.visible_window(600, f32::NAN).len(), 600);
        assert_eq!(viewport.visible_window(600, -2.0).len(), 600);
    }

    #[test]
    fn horizontal_zoom_control_range() {
        assert_eq!(clamp_horizontal_zoom(2.5), 2.5);
        assert_eq!(clamp_horizontal_zoom(0.2), 1.0);
        assert_eq!(clamp_horizontal_zoom(9.0), 5.0);
        assert_eq!(clamp_horizontal_zoom(f32::NAN), 1.0);
    }

    #[test]
    fn empty_history() {
        let viewport = controller();
        let window = viewport.visible_window(0, 1.0);
        assert!(window.is_empty());
    }

    #[test]
    fn reset_pan_keeps_zoom() {
        let mut viewport = controller();
        viewport.apply_pan(0.4);
        viewport.apply_zoom_delta(1.0);
        viewport.reset_pan();
        assert_eq!(viewport.state().pan_fraction, 0.0);
        assert_relative_eq!(viewport.state().vertical_zoom, 1.05);
    }
}
