//! Streaming audio decode stage.
//!
//! Uses Symphonia to:
//! - probe the input container/codec
//! - decode packets into interleaved `f32` samples
//! - push samples into a bounded [`SampleQueue`] from a background thread
//!
//! The queue is closed when the decoder reaches end of stream or fails, so
//! downstream consumers always see a terminating stream.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crate::queue::{SampleQueue, queue_capacity_samples};
use anyhow::{Context, Result, anyhow, bail};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::CodecParameters;
use symphonia::core::io::MediaSource;
use symphonia::core::{
    audio::SignalSpec, codecs::DecoderOptions, formats::FormatOptions, io::MediaSourceStream,
    meta::MetadataOptions, probe::Hint,
};

/// A probed source with its decode thread already running.
pub struct DecodedSource {
    /// Sample rate and channel layout of the decoded stream.
    pub spec: SignalSpec,
    /// Queue the decode thread is filling.
    pub queue: Arc<SampleQueue>,
    /// Best-effort total duration.
    pub duration_ms: Option<u64>,
    /// Best-effort codec label, for logging.
    pub codec: Option<String>,
}

/// Probe `path` and start a background thread that streams interleaved
/// `f32` samples into a bounded queue.
pub fn open_path(path: &Path, buffer_seconds: f32) -> Result<DecodedSource> {
    let file = File::open(path).with_context(|| format!("open {:?}", path))?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    open_source(Box::new(file), hint, buffer_seconds)
}

/// Probe an arbitrary Symphonia [`MediaSource`] and start the decode thread.
pub fn open_source(
    source: Box<dyn MediaSource>,
    hint: Hint,
    buffer_seconds: f32,
) -> Result<DecodedSource> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("no default audio track"))?;

    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| anyhow!("unknown channel layout"))?;
    if channels.count() == 0 {
        bail!("source reports zero channels");
    }

    let rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| anyhow!("unknown sample rate"))?;

    let spec = SignalSpec::new(rate, channels);
    let codec_params: CodecParameters = track.codec_params.clone();
    let duration_ms = duration_ms_from_codec_params(&codec_params);
    let codec = codec_name_from_params(&codec_params);

    let max_buffered_samples = queue_capacity_samples(rate, channels.count(), buffer_seconds);
    let queue = Arc::new(SampleQueue::new(channels.count(), max_buffered_samples));

    let queue_for_thread = queue.clone();
    thread::spawn(move || {
        if let Err(e) = decode_loop(format, codec_params, &queue_for_thread) {
            tracing::error!("decoder thread error: {e:#}");
        }
        queue_for_thread.close();
    });

    Ok(DecodedSource {
        spec,
        queue,
        duration_ms,
        codec,
    })
}

/// Decode packets from a probed `FormatReader` and push interleaved `f32`
/// into `queue`. Runs on the thread spawned by [`open_source`].
fn decode_loop(
    mut format: Box<dyn symphonia::core::formats::FormatReader>,
    codec_params: CodecParameters,
    queue: &Arc<SampleQueue>,
) -> Result<()> {
    let mut decoder =
        symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(_) => break, // EOF
        };

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(_) => continue,
        };

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
        sample_buf.copy_interleaved_ref(decoded);

        queue.push_blocking(sample_buf.samples());
    }

    Ok(())
}

/// Best-effort duration in milliseconds from codec metadata.
///
/// Returns `None` if the container does not provide total frames or sample
/// rate.
fn duration_ms_from_codec_params(codec_params: &CodecParameters) -> Option<u64> {
    let frames = codec_params.n_frames?;
    let rate = codec_params.sample_rate? as u64;
    if rate == 0 {
        return None;
    }
    Some(frames.saturating_mul(1000) / rate)
}

/// Best-effort codec label for the startup log line.
fn codec_name_from_params(params: &CodecParameters) -> Option<String> {
    use symphonia::core::codecs::*;
    let name = match params.codec {
        CODEC_TYPE_FLAC => "FLAC",
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_AAC => "AAC",
        CODEC_TYPE_ALAC => "ALAC",
        CODEC_TYPE_VORBIS => "VORBIS",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM_S16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM_S24",
        CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_S32BE => "PCM_S32",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM_F32",
        _ => return None,
    };
    Some(name.to_string())
}
