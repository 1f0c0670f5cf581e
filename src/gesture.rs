//! Timed user input, replayed on the tick timeline.
//!
//! A rendered take has no pointer or wheel, so interaction is scripted in
//! the config file:
//!
//! ```toml
//! [[gestures]]
//! at = 4.0
//! kind = "drag"
//! dx = 180.0
//! ```

use serde::Deserialize;

use crate::render_loop::ExternalInputs;
use crate::viewport::{clamp_horizontal_zoom, ViewportController};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureAction {
    /// Horizontal pointer drag in surface pixels
    Drag { dx: f32 },
    /// Wheel / pinch over the graph; only the sign is used
    Wheel { delta: f32 },
    /// New position of the time-zoom control
    HorizontalZoom { value: f32 },
    /// A new recording starts
    NewSession,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GestureEvent {
    /// Seconds from the start of the take
    pub at: f32,
    #[serde(flatten)]
    pub action: GestureAction,
}

impl GestureAction {
    pub fn apply(
        &self,
        viewport: &mut ViewportController,
        inputs: &mut ExternalInputs,
        surface_width: f32,
    ) {
        match *self {
            GestureAction::Drag { dx } => viewport.apply_drag(dx, surface_width),
            GestureAction::Wheel { delta } => viewport.apply_zoom_delta(delta),
            GestureAction::HorizontalZoom { value } => {
                inputs.horizontal_zoom = clamp_horizontal_zoom(value);
            }
            GestureAction::NewSession => inputs.session = inputs.session.next(),
        }
    }
}

/// Gesture events in time order, handed out as the clock passes them.
#[derive(Debug, Default)]
pub struct GestureScript {
    events: Vec<GestureEvent>,
    next: usize,
}

impl GestureScript {
    pub fn new(mut events: Vec<GestureEvent>) -> Self {
        // stable: events sharing a timestamp keep their file order
        events.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { events, next: 0 }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Actions scheduled at or before `time`, each returned once.
    pub fn due(&mut self, time: f32) -> &[GestureEvent] {
        let start = self.next;
        while self.next < self.events.len() && self.events[self.next].at <= time {
            self.next += 1;
        }
        &self.events[start..self.next]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewportConfig;
    use crate::session::SessionId;

    fn event(at: f32, action: GestureAction) -> GestureEvent {
        GestureEvent { at, action }
    }

    #[test]
    fn hands_out_events_once_in_time_order() {
        let mut script = GestureScript::new(vec![
            event(2.0, GestureAction::Wheel { delta: 1.0 }),
            event(0.5, GestureAction::Drag { dx: 10.0 }),
            event(2.0, GestureAction::NewSession),
        ]);
        assert_eq!(script.len(), 3);
        assert!(script.due(0.1).is_empty());

        let first = script.due(1.0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].action, GestureAction::Drag { dx: 10.0 });
        assert!(script.due(1.0).is_empty());

        let later: Vec<GestureAction> = script.due(5.0).iter().map(|e| e.action).collect();
        assert_eq!(later, vec![GestureAction::Wheel { delta: 1.0 }, GestureAction::NewSession]);
        assert!(script.due(10.0).is_empty());
    }

    #[test]
    fn actions_reach_viewport_and_inputs() {
        let mut viewport = ViewportController::new(&ViewportConfig::default(), 600);
        let mut inputs = ExternalInputs::new(SessionId(3), 1.0);

        GestureAction::Drag { dx: 450.0 }.apply(&mut viewport, &mut inputs, 900.0);
        assert!((viewport.state().pan_fraction - 0.35).abs() < 1e-6);

        GestureAction::Wheel { delta: -1.0 }.apply(&mut viewport, &mut inputs, 900.0);
        assert!((viewport.state().vertical_zoom - 0.95).abs() < 1e-6);

        GestureAction::HorizontalZoom { value: 12.0 }.apply(&mut viewport, &mut inputs, 900.0);
        assert_eq!(inputs.horizontal_zoom, 5.0);

        GestureAction::NewSession.apply(&mut viewport, &mut inputs, 900.0);
        assert_eq!(inputs.session, SessionId(4));
    }
}
