use fontdue::{Font, FontSettings};
use std::path::{Path, PathBuf};

use crate::error::PitchtrailError;

/// Fonts tried, in order, when none is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct TextOverlay {
    font: Font,
}

impl TextOverlay {
    pub fn from_file(path: &Path) -> Result<Self, PitchtrailError> {
        let font_err = |reason: String| PitchtrailError::Font {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|e| font_err(e.to_string()))?;
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| font_err(e.to_string()))?;
        Ok(Self { font })
    }

    /// The configured font, else the first usable system font.
    pub fn load(configured: Option<&Path>) -> Option<Self> {
        if let Some(path) = configured {
            match Self::from_file(path) {
                Ok(overlay) => return Some(overlay),
                Err(err) => log::warn!("{}", err),
            }
        }
        let found = SYSTEM_FONTS
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .find_map(|p| Self::from_file(&p).ok());
        if found.is_none() {
            log::warn!("No usable font found, text labels will not be drawn (set output.font)");
        }
        found
    }

    /// Composite text onto an RGBA pixel buffer with its baseline at `y`.
    pub fn composite(
        &self,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        color: [u8; 4],
    ) {
        let mut cursor_x = x;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, size);
            let left = (cursor_x + metrics.xmin as f32).round() as i32;
            let top = (y - metrics.height as f32 - metrics.ymin as f32).round() as i32;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }

                    let px = left + gx as i32;
                    let py = top + gy as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        continue;
                    }

                    let idx = ((py as u32 * width + px as u32) * 4) as usize;
                    if idx + 3 >= pixels.len() {
                        continue;
                    }
                    blend(&mut pixels[idx..idx + 4], color, coverage);
                }
            }

            cursor_x += metrics.advance_width;
        }
    }
}

fn blend(pixel: &mut [u8], color: [u8; 4], coverage: u8) {
    let a = coverage as f32 / 255.0 * (color[3] as f32 / 255.0);
    let inv_a = 1.0 - a;
    for c in 0..3 {
        pixel[c] = (color[c] as f32 * a + pixel[c] as f32 * inv_a) as u8;
    }
    pixel[3] = 255;
}
