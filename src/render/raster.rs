use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::scene::{DrawCommand, Point, Rgba};
use super::text::TextOverlay;
use crate::error::PitchtrailError;

/// Software surface that executes draw commands into an RGBA frame.
pub struct Rasterizer {
    pixmap: Pixmap,
    text: Option<TextOverlay>,
}

impl Rasterizer {
    pub fn new(width: u32, height: u32, text: Option<TextOverlay>) -> Result<Self, PitchtrailError> {
        let pixmap = Pixmap::new(width, height).ok_or(PitchtrailError::Surface { width, height })?;
        Ok(Self { pixmap, text })
    }

    /// Run `commands` in order and return the resulting RGBA bytes.
    /// All drawing is opaque, so the premultiplied buffer is plain RGBA.
    pub fn draw(&mut self, commands: &[DrawCommand]) -> &[u8] {
        for command in commands {
            match command {
                DrawCommand::Clear { color } => self.pixmap.fill(to_color(*color)),
                DrawCommand::Path { subpaths, color, width } => {
                    self.stroke(subpaths, *color, *width)
                }
                DrawCommand::Text { text, x, y, size, color } => {
                    if let Some(overlay) = &self.text {
                        let (w, h) = (self.pixmap.width(), self.pixmap.height());
                        overlay.composite(self.pixmap.data_mut(), w, h, text, *x, *y, *size, *color);
                    }
                }
            }
        }
        self.pixmap.data()
    }

    fn stroke(&mut self, subpaths: &[Vec<Point>], color: Rgba, width: f32) {
        let mut pb = PathBuilder::new();
        for subpath in subpaths.iter().filter(|s| s.len() > 1) {
            pb.move_to(subpath[0].x, subpath[0].y);
            for point in &subpath[1..] {
                pb.line_to(point.x, point.y);
            }
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;
        let stroke = Stroke {
            width,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

fn to_color(color: Rgba) -> Color {
    Color::from_rgba8(color[0], color[1], color[2], color[3])
}
