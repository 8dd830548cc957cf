//! Output device discovery and selection.
//!
//! Thin wrappers around CPAL for:
//! - listing available output devices
//! - selecting the default device or a device by substring match
//! - finding a config that matches the source stream exactly
//!
//! The player does not resample or remap channels, so the device config
//! must carry the source's sample rate and channel count as-is; only the
//! sample format is negotiated.

use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait};

/// Pick the first output device matching `needle` (case-insensitive), or
/// the host default when no needle is given.
///
/// Returns an error if no suitable device is found.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    let mut devices: Vec<cpal::Device> = host
        .output_devices()
        .context("No output devices")?
        .collect();

    if let Some(needle) = needle {
        if let Some(d) = devices.drain(..).find(|d| {
            d.description()
                .ok()
                .map(|n| matches_device_name(&n.name(), needle))
                .unwrap_or(false)
        }) {
            return Ok(d);
        }
        return Err(anyhow!("No output device matched: {needle}"));
    }

    host.default_output_device()
        .ok_or_else(|| anyhow!("No default output device"))
}

/// Find a supported output config carrying exactly `rate` Hz and
/// `channels` channels.
///
/// Among matching config ranges, the one with the friendliest sample
/// format wins (f32 first, then the integer formats).
pub fn pick_output_config(
    device: &cpal::Device,
    rate: u32,
    channels: u16,
) -> Result<cpal::SupportedStreamConfig> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> = device
        .supported_output_configs()
        .context("query supported output configs")?
        .collect();
    if ranges.is_empty() {
        bail!("No supported output configs");
    }

    let mut best: Option<(u8, cpal::SupportedStreamConfig)> = None;

    for range in ranges {
        if !range_matches(
            range.channels(),
            range.min_sample_rate(),
            range.max_sample_rate(),
            channels,
            rate,
        ) {
            continue;
        }
        let rank = sample_format_rank(range.sample_format());
        let replace = match &best {
            None => true,
            Some((best_rank, _)) => rank < *best_rank,
        };
        if replace {
            best = Some((rank, range.with_sample_rate(rate)));
        }
    }

    best.map(|(_, cfg)| cfg)
        .ok_or_else(|| anyhow!("Device does not support {channels} channel(s) at {rate} Hz"))
}

/// Ask for a fixed callback period of `frames`, clamped to what the device
/// advertises.
///
/// Returns `None` when the device only supports its default buffer size.
pub fn pick_buffer_size(
    config: &cpal::SupportedStreamConfig,
    frames: u32,
) -> Option<cpal::BufferSize> {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            Some(cpal::BufferSize::Fixed(clamp_frames(*min, *max, frames)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

/// Print available output devices to stdout (`--list-devices` UX).
pub fn list_devices(host: &cpal::Host) -> Result<()> {
    let devices = host.output_devices().context("No output devices")?;
    for (i, d) in devices.enumerate() {
        println!("#{i}: {}", d.description()?);
    }
    Ok(())
}

fn range_matches(
    range_channels: u16,
    min_rate: u32,
    max_rate: u32,
    want_channels: u16,
    want_rate: u32,
) -> bool {
    range_channels == want_channels && min_rate <= want_rate && want_rate <= max_rate
}

fn clamp_frames(min: u32, max: u32, want: u32) -> u32 {
    if max < min {
        return min;
    }
    want.clamp(min, max)
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&needle.to_lowercase())
}
