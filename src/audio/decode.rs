use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A whole recording, downmixed to mono.
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open recording: {}", path.display()))?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Unrecognized audio format: {}", path.display()))?;
    Ok(probed.format)
}

/// Decode the first audio track of `path` and downmix it to mono.
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let mut format = open_format(path)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("Recording has no audio track")?;
    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Recording does not declare a sample rate")?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("No decoder for this codec")?;

    let mut audio = AudioData {
        samples: Vec::new(),
        sample_rate,
    };
    let mut scratch: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("Failed to read packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(err)) => {
                log::debug!("Skipping corrupt packet: {}", err);
                continue;
            }
            Err(e) => return Err(e).context("Decoder failed"),
        };

        // SampleBuffer capacity counts interleaved samples, not frames
        let frames = decoded.capacity();
        let needed = frames * decoded.spec().channels.count();
        if scratch.as_ref().map_or(true, |buf| buf.capacity() < needed) {
            scratch = Some(SampleBuffer::<f32>::new(frames as u64, *decoded.spec()));
        }
        let Some(buf) = scratch.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        downmix_into(&mut audio.samples, buf.samples(), channels);
    }

    log::info!(
        "Decoded {} ({} ch -> mono): {} samples at {}Hz, {:.1}s",
        path.display(),
        channels,
        audio.samples.len(),
        sample_rate,
        audio.duration_secs()
    );
    Ok(audio)
}

/// Average interleaved frames down to a single channel.
fn downmix_into(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}
