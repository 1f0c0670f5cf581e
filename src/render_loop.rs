//! Frame-driven analysis and drawing.
//!
//! [`RenderLoop::tick`] is one display refresh: pull a window, analyze it,
//! append to history, emit draw commands for the current viewport. The
//! [`Scheduler`] calls it at the tick rate on a single thread, applying
//! scripted gestures between ticks, so history and viewport only ever have
//! one writer. Ticks never overlap and never start once the activity flag
//! is cleared.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::analysis::Analyzer;
use crate::audio::features::AnalysisFrame;
use crate::audio::source::SampleSource;
use crate::gesture::GestureScript;
use crate::render::scene::{self, DrawCommand, Surface};
use crate::session::{AnalysisContext, SessionId, SessionReset};

/// Controls owned by the host and read once per tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExternalInputs {
    pub session: SessionId,
    pub horizontal_zoom: f32,
}

impl ExternalInputs {
    pub fn new(session: SessionId, horizontal_zoom: f32) -> Self {
        Self {
            session,
            horizontal_zoom,
        }
    }
}

/// Capture/playback running. Cheap to clone; clearing it from any thread
/// stops the scheduler before its next tick.
#[derive(Clone, Debug)]
pub struct ActivityFlag(Arc<AtomicBool>);

impl ActivityFlag {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(AtomicBool::new(active)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        self.0.store(active, Ordering::Release);
    }
}

/// What one drawn tick produced.
#[derive(Clone, Debug)]
pub struct TickOutput {
    pub frame: AnalysisFrame,
    pub commands: Vec<DrawCommand>,
    /// Note and frequency of the newest frame, for status displays
    pub label: String,
}

pub struct RenderLoop {
    analyzer: Analyzer,
    context: AnalysisContext,
    session: SessionReset,
    surface: Surface,
}

impl RenderLoop {
    pub fn new(analyzer: Analyzer, context: AnalysisContext, surface: Surface) -> Self {
        Self {
            analyzer,
            context,
            session: SessionReset::default(),
            surface,
        }
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AnalysisContext {
        &mut self.context
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// One display tick. Returns `None` without touching history when no
    /// source is attached or it has no window to offer.
    pub fn tick(
        &mut self,
        source: Option<&mut dyn SampleSource>,
        inputs: &ExternalInputs,
    ) -> Option<TickOutput> {
        self.session.observe(inputs.session, &mut self.context);

        let source = source?;
        let sample_rate = source.sample_rate();
        let window = source.current_window()?;

        let frame = self.analyzer.analyze(window, sample_rate);
        self.context.push(frame);
        log::trace!(
            "tick: pitch={:?} freq={:.1} loudness={:.3}",
            frame.pitch_class,
            frame.frequency_hz,
            frame.loudness
        );

        let history = &self.context.history;
        let visible = self
            .context
            .viewport
            .visible_window(history.len(), inputs.horizontal_zoom);
        let commands = scene::build_scene(history, &self.context.viewport, visible, self.surface);

        Some(TickOutput {
            frame,
            commands,
            label: scene::current_label(history.latest()),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Back-to-back ticks, for rendering to a file
    Offline,
    /// Sleep so ticks land on the display period
    Realtime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub drawn: u64,
    pub skipped: u64,
}

pub struct Scheduler {
    period: Duration,
    pacing: Pacing,
    activity: ActivityFlag,
}

impl Scheduler {
    pub fn new(fps: u32, pacing: Pacing, activity: ActivityFlag) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            pacing,
            activity,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// When tick number `tick` is due, measured from the start of the run.
    fn deadline(&self, tick: u64) -> Duration {
        self.period.mul_f64(tick as f64)
    }

    /// Tick until the activity flag is cleared. An exhausted source clears
    /// it, the same way playback ending stops the graph.
    pub fn run<S, F>(
        &self,
        render: &mut RenderLoop,
        source: &mut S,
        inputs: &mut ExternalInputs,
        gestures: &mut GestureScript,
        mut on_tick: F,
    ) -> Result<RunSummary>
    where
        S: SampleSource,
        F: FnMut(u64, &TickOutput) -> Result<()>,
    {
        let mut summary = RunSummary::default();
        let started = Instant::now();
        let mut tick: u64 = 0;

        while self.activity.is_active() {
            let now = tick as f32 * self.period.as_secs_f32();
            let surface_width = render.surface().width;
            for event in gestures.due(now) {
                log::debug!("Gesture at {:.2}s: {:?}", event.at, event.action);
                event
                    .action
                    .apply(&mut render.context_mut().viewport, inputs, surface_width);
            }

            source.advance(self.period);
            match render.tick(Some(&mut *source), inputs) {
                Some(output) => {
                    summary.drawn += 1;
                    on_tick(tick, &output)?;
                }
                None => {
                    summary.skipped += 1;
                    if source.is_exhausted() {
                        log::info!("Source exhausted after {} ticks, stopping", tick);
                        self.activity.set_active(false);
                    }
                }
            }
            tick += 1;

            if self.pacing == Pacing::Realtime {
                if let Some(wait) = self.deadline(tick).checked_sub(started.elapsed()) {
                    std::thread::sleep(wait);
                }
            }
        }

        Ok(summary)
    }
}
