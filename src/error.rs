use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PitchtrailError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot allocate a {width}x{height} drawing surface")]
    Surface { width: u32, height: u32 },

    #[error("Failed to load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },

    #[error("Frame is {actual} bytes, encoder expects {expected}")]
    FrameSize { expected: usize, actual: usize },
}
