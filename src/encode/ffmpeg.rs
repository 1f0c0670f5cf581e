use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::error::PitchtrailError;

/// Video settings for one encode.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
}

impl EncodeSettings {
    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    fn args(&self, audio: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(), "error".into(),
            "-nostats".into(),
            "-f".into(), "rawvideo".into(),
            "-pixel_format".into(), "rgba".into(),
            "-video_size".into(), format!("{}x{}", self.width, self.height),
            "-framerate".into(), self.fps.to_string(),
            "-i".into(), "pipe:0".into(),
            "-i".into(), audio.to_string_lossy().into_owned(),
            "-map".into(), "0:v".into(),
            "-map".into(), "1:a".into(),
            "-c:v".into(), self.codec.clone(),
            "-pix_fmt".into(), self.pix_fmt.clone(),
            "-crf".into(), self.crf.to_string(),
            "-preset".into(), "medium".into(),
            "-c:a".into(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

/// Read `reader` to the end on its own thread. ffmpeg blocks once its
/// stderr pipe is full, which would stall our writes to its stdin.
fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Err(err) = reader.read_to_end(&mut bytes) {
            log::debug!("Stopped reading ffmpeg stderr: {}", err);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

/// Pipes raw RGBA frames into an `ffmpeg` child that muxes them with the
/// analyzed audio track.
pub struct FfmpegEncoder {
    child: Child,
    stderr: Option<JoinHandle<String>>,
    frame_len: usize,
    frames: u64,
    output: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(output: &Path, audio: &Path, settings: &EncodeSettings) -> Result<Self> {
        let mut child = Command::new("ffmpeg")
            .args(settings.args(audio, output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            settings.width, settings.height, settings.fps, settings.codec
        );

        let stderr = child.stderr.take().map(drain);

        Ok(Self {
            child,
            stderr,
            frame_len: settings.frame_len(),
            frames: 0,
            output: output.to_path_buf(),
        })
    }

    fn stdin(&mut self) -> Result<&mut ChildStdin> {
        self.child.stdin.as_mut().context("FFmpeg stdin not available")
    }

    pub fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
        if rgba.len() != self.frame_len {
            return Err(PitchtrailError::FrameSize {
                expected: self.frame_len,
                actual: rgba.len(),
            }
            .into());
        }
        self.stdin()?
            .write_all(rgba)
            .context("Failed to write frame to ffmpeg")?;
        self.frames += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // EOF on stdin ends the stream
        drop(self.child.stdin.take());

        let status = self.child.wait().context("Failed to wait for ffmpeg")?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            anyhow::bail!("FFmpeg exited with {}:\n{}", status, stderr);
        }

        log::info!("Encoded {} frames to {}", self.frames, self.output.display());
        Ok(())
    }
}
