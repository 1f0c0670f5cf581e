mod audio;
mod cli;
mod config;
mod encode;
mod error;
mod gesture;
mod history;
mod render;
mod render_loop;
mod session;
mod viewport;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use audio::analysis::Analyzer;
use audio::features::AnalysisFrame;
use audio::pitch::Method;
use audio::source::PlaybackSource;
use cli::Cli;
use config::Config;
use encode::ffmpeg::{EncodeSettings, FfmpegEncoder};
use gesture::GestureScript;
use history::HistoryBuffer;
use render::raster::Rasterizer;
use render::scene::Surface;
use render::text::TextOverlay;
use render_loop::{ActivityFlag, ExternalInputs, Pacing, RenderLoop, Scheduler};
use session::{AnalysisContext, SessionId};
use viewport::{clamp_horizontal_zoom, ViewportController};

/// One line of `--frames-json` output.
#[derive(Serialize)]
struct FrameRecord {
    tick: u64,
    time: f32,
    #[serde(flatten)]
    frame: AnalysisFrame,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let mut cfg = match config::resolve_config_path(cli.config.clone()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };
    merge_cli(&mut cli, &mut cfg);
    cfg.validate()?;

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    log::info!("pitchtrail - vocal pitch and loudness graph");
    log::info!("Input: {}", cli.input.display());
    log::info!("Resolution: {}x{} @ {}fps", cli.width, cli.height, cli.fps);
    log::info!(
        "Analysis: window={} method={:?} history={} frames",
        cfg.analysis.window_size,
        cfg.analysis.method,
        cfg.history.capacity
    );

    log::info!("Decoding audio...");
    let audio_data = audio::decode::decode_audio(&cli.input)?;
    let mut source = PlaybackSource::new(audio_data, cfg.analysis.window_size);
    let expected_ticks = (source.duration().as_secs_f64() * cli.fps as f64).ceil() as u64;
    log::info!("Duration: {:.1}s, ~{} ticks", source.duration().as_secs_f32(), expected_ticks);

    let capacity = cfg.history.capacity;
    let context = AnalysisContext::new(
        HistoryBuffer::with_capacity(capacity),
        ViewportController::new(&cfg.viewport, capacity),
    );
    let mut render = RenderLoop::new(
        Analyzer::from_config(&cfg.analysis),
        context,
        Surface::new(cli.width, cli.height),
    );
    let mut inputs = ExternalInputs::new(
        SessionId::default(),
        clamp_horizontal_zoom(cfg.viewport.horizontal_zoom),
    );
    let mut gestures = GestureScript::new(std::mem::take(&mut cfg.gestures));
    if !gestures.is_empty() {
        log::info!("Replaying {} scripted gestures", gestures.len());
    }

    let mut video = if cli.no_video {
        None
    } else {
        let raster = Rasterizer::new(cli.width, cli.height, TextOverlay::load(cli.font.as_deref()))?;
        let settings = EncodeSettings {
            width: cli.width,
            height: cli.height,
            fps: cli.fps,
            codec: cli.codec.clone(),
            pix_fmt: cli.pix_fmt.clone(),
            crf: cli.crf,
        };
        log::info!("Starting FFmpeg encoder...");
        Some((raster, FfmpegEncoder::new(&cli.output, &cli.input, &settings)?))
    };
    let mut records = Vec::new();

    let pb = ProgressBar::new(expected_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining) {msg}")?
            .progress_chars("=>-"),
    );

    let scheduler = Scheduler::new(cli.fps, Pacing::Offline, ActivityFlag::new(true));
    let tick_secs = scheduler.period().as_secs_f32();
    let keep_records = cli.frames_json.is_some();

    let summary = scheduler.run(&mut render, &mut source, &mut inputs, &mut gestures, |tick, out| {
        if let Some((raster, encoder)) = video.as_mut() {
            encoder.write_frame(raster.draw(&out.commands))?;
        }
        if keep_records {
            records.push(FrameRecord {
                tick,
                time: (tick + 1) as f32 * tick_secs,
                frame: out.frame,
            });
        }
        pb.set_position(tick + 1);
        pb.set_message(out.label.clone());
        Ok(())
    })?;
    pb.finish_with_message("Analysis complete");

    let voiced = records.iter().filter(|r| r.frame.is_voiced()).count();
    log::info!("Drew {} ticks, skipped {}", summary.drawn, summary.skipped);
    let context = render.context();
    if context.history.is_empty() {
        log::warn!("No analysis frames were produced; is the recording shorter than one tick?");
    }
    log::debug!("Final viewport: {:?}", context.viewport.state());

    if let Some((_, encoder)) = video {
        log::info!("Finishing encoding...");
        encoder.finish()?;
        log::info!("Video: {}", cli.output.display());
    }

    if let Some(path) = &cli.frames_json {
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write frames to {}", path.display()))?;
        log::info!("Wrote {} frames ({} voiced) to {}", records.len(), voiced, path.display());
    }

    log::info!("Done!");
    Ok(())
}

/// Config values apply only where the CLI is at its default; the merged
/// values are written back so validation sees what will run.
fn merge_cli(cli: &mut Cli, cfg: &mut Config) {
    if cli.width == 900 { cli.width = cfg.output.width; }
    if cli.height == 380 { cli.height = cfg.output.height; }
    if cli.fps == 60 { cli.fps = cfg.output.fps; }
    if cli.crf == 18 { cli.crf = cfg.output.crf; }
    if cli.codec == "libx264" { cli.codec = cfg.output.codec.clone(); }
    if cli.font.is_none() { cli.font = cfg.output.font.clone(); }
    if cli.window_size == 2048 { cli.window_size = cfg.analysis.window_size; }
    if cli.method == Method::Direct { cli.method = cfg.analysis.method; }
    if cli.zoom == 1.0 { cli.zoom = cfg.viewport.horizontal_zoom; }

    cfg.output.width = cli.width;
    cfg.output.height = cli.height;
    cfg.output.fps = cli.fps;
    cfg.output.crf = cli.crf;
    cfg.output.codec = cli.codec.clone();
    cfg.output.font = cli.font.clone();
    cfg.analysis.window_size = cli.window_size;
    cfg.analysis.method = cli.method;
    cfg.viewport.horizontal_zoom = cli.zoom;
}
