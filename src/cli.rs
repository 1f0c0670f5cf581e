use clap::Parser;
use std::path::PathBuf;

use crate::audio::pitch::Method;

#[derive(Parser, Debug)]
#[command(name = "pitchtrail", about = "Scrolling pitch and loudness graph of a vocal take")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Output video file
    #[arg(short, long, default_value = "pitchtrail.mp4")]
    pub output: PathBuf,

    /// Config file (default: ./pitchtrail.toml, then the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Video width in pixels
    #[arg(long, default_value_t = 900)]
    pub width: u32,

    /// Video height in pixels
    #[arg(long, default_value_t = 380)]
    pub height: u32,

    /// Ticks (and video frames) per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// Samples per analysis window
    #[arg(long, default_value_t = 2048)]
    pub window_size: usize,

    /// Autocorrelation method
    #[arg(long, value_enum, default_value_t = Method::Direct)]
    pub method: Method,

    /// Time zoom (1 = whole history, 5 = newest fifth)
    #[arg(long, default_value_t = 1.0)]
    pub zoom: f32,

    /// TTF/OTF font for grid and note labels
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Also write every analysis frame as JSON
    #[arg(long)]
    pub frames_json: Option<PathBuf>,

    /// Analyze only, skip rendering and encoding
    #[arg(long)]
    pub no_video: bool,
}
