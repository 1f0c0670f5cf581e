//! Draw commands for one tick of the pitch/intensity view.
//!
//! The surface is split in two bands: the pitch graph fills the top 80%,
//! the intensity envelope the bottom 20%. Both lines cover the same visible
//! window of history, oldest frame at x = 0 and newest at x = width.

use crate::audio::features::AnalysisFrame;
use crate::audio::note::{Note, SENTINEL};
use crate::history::HistoryBuffer;
use crate::viewport::{PitchSpan, ViewportController, VisibleWindow};

pub type Rgba = [u8; 4];

pub const BACKGROUND: Rgba = [0x02, 0x06, 0x17, 0xff];
pub const GRID_LINE: Rgba = [0x1f, 0x29, 0x33, 0xff];
pub const GRID_LABEL: Rgba = [0x6b, 0x72, 0x80, 0xff];
pub const PITCH_LINE: Rgba = [0x22, 0xc5, 0x5e, 0xff];
pub const INTENSITY_LINE: Rgba = [0xf5, 0x9e, 0x0b, 0xff];
pub const CURRENT_LABEL: Rgba = [0xe5, 0xe7, 0xeb, 0xff];

const PITCH_FRACTION: f32 = 0.8;
const GRID_OCTAVES: std::ops::RangeInclusive<i32> = 1..=6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear {
        color: Rgba,
    },
    /// Stroked polyline. Each subpath starts with a move; there is no
    /// segment between the end of one subpath and the start of the next.
    Path {
        subpaths: Vec<Vec<Point>>,
        color: Rgba,
        width: f32,
    },
    /// `y` is the text baseline.
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        color: Rgba,
    },
}

/// Logical size of the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn pitch_height(&self) -> f32 {
        self.height * PITCH_FRACTION
    }

    pub fn intensity_height(&self) -> f32 {
        self.height - self.pitch_height()
    }
}

/// Status text for the newest frame: `A4  •  440.0 Hz`, or `-`.
pub fn current_label(frame: Option<&AnalysisFrame>) -> String {
    frame
        .and_then(|f| f.pitch_class.map(|pc| (Note::from_pitch_class(pc), f.frequency_hz)))
        .map(|(note, freq)| format!("{}  \u{2022}  {:.1} Hz", note, freq))
        .unwrap_or_else(|| SENTINEL.to_string())
}

pub fn build_scene(
    history: &HistoryBuffer,
    viewport: &ViewportController,
    window: VisibleWindow,
    surface: Surface,
) -> Vec<DrawCommand> {
    let mut commands = vec![DrawCommand::Clear { color: BACKGROUND }];
    let span = viewport.pitch_span();

    grid(&mut commands, span, surface);

    if window.len() > 1 {
        commands.push(DrawCommand::Path {
            subpaths: pitch_subpaths(history, window, span, surface),
            color: PITCH_LINE,
            width: 2.0,
        });
        commands.push(DrawCommand::Path {
            subpaths: vec![intensity_points(history, window, surface)],
            color: INTENSITY_LINE,
            width: 1.5,
        });
    }

    commands.push(DrawCommand::Text {
        text: current_label(history.latest()),
        x: 10.0,
        y: 18.0,
        size: 12.0,
        color: CURRENT_LABEL,
    });
    commands
}

fn grid(commands: &mut Vec<DrawCommand>, span: PitchSpan, surface: Surface) {
    let pitch_height = surface.pitch_height();
    for octave in GRID_OCTAVES {
        let c = 12 * (octave + 1);
        let t = span.position(c as f32);
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        let y = pitch_height - t * pitch_height;
        commands.push(DrawCommand::Path {
            subpaths: vec![vec![Point { x: 0.0, y }, Point { x: surface.width, y }]],
            color: GRID_LINE,
            width: 1.0,
        });
        commands.push(DrawCommand::Text {
            text: format!("C{}", octave),
            x: 4.0,
            y: y - 2.0,
            size: 10.0,
            color: GRID_LABEL,
        });
    }
}

fn x_at(relative: usize, window: VisibleWindow, surface: Surface) -> f32 {
    relative as f32 / (window.len() - 1) as f32 * surface.width
}

/// Pitch line broken at every unvoiced frame. Runs shorter than two points
/// would stroke nothing and are dropped.
fn pitch_subpaths(
    history: &HistoryBuffer,
    window: VisibleWindow,
    span: PitchSpan,
    surface: Surface,
) -> Vec<Vec<Point>> {
    let pitch_height = surface.pitch_height();
    let mut subpaths = Vec::new();
    let mut run: Vec<Point> = Vec::new();

    for (relative, frame) in history.range(window.start, window.end).enumerate() {
        let Some(pitch_class) = frame.pitch_class else {
            if run.len() > 1 {
                subpaths.push(std::mem::take(&mut run));
            } else {
                run.clear();
            }
            continue;
        };
        let t = span.position(pitch_class as f32).clamp(0.0, 1.0);
        run.push(Point {
            x: x_at(relative, window, surface),
            y: pitch_height - t * pitch_height,
        });
    }
    if run.len() > 1 {
        subpaths.push(run);
    }
    subpaths
}

fn intensity_points(history: &HistoryBuffer, window: VisibleWindow, surface: Surface) -> Vec<Point> {
    let intensity_height = surface.intensity_height();
    history
        .range(window.start, window.end)
        .enumerate()
        .map(|(relative, frame)| Point {
            x: x_at(relative, window, surface),
            y: surface.height - frame.loudness.clamp(0.0, 1.0) * intensity_height,
        })
        .collect()
}
