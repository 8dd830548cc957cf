//! Output stage (CPAL stream + the render callback).
//!
//! [`Render`] is the state owned by the real-time callback: the staging
//! buffer it pulls decoded samples into, the per-channel filter banks, and
//! the end-of-stream latch. The callback itself stays allocation-free: the
//! staging buffer is handed in pre-sized, the queue copies into it, and the
//! mixer works in place.
//!
//! Period handling: the staging buffer holds one requested period. When the
//! device delivers a larger buffer, the callback refills in period-sized
//! chunks, and each pull is additionally capped at the queue's capacity so
//! an oversized period never waits on more samples than the queue can hold
//! while the decode thread is stuck pushing into a full buffer. Interleaved
//! channel routing is derived from the absolute sample position, so chunk
//! boundaries need not land on frame boundaries.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;
use eq_dsp::{GainVector, MixPolicy, Mixer};

use crate::queue::SampleQueue;
use crate::shutdown::Shutdown;

/// What the callback did with the buffer it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// A full buffer of audio was written; more will follow.
    Continue,
    /// The stream is over: the source drained or a stop request was
    /// observed. No further audio will be produced.
    Complete,
}

/// Callback-side state: source queue, EQ mix, staging storage.
pub struct Render {
    queue: Arc<SampleQueue>,
    gains: Arc<GainVector>,
    mixer: Mixer,
    shutdown: Arc<Shutdown>,
    staging: Vec<f32>,
    /// Per-pull sample cap: one staging period, never more than the queue
    /// holds at capacity.
    pull_limit: usize,
    channels: usize,
    finished: bool,
}

impl Render {
    /// `staging` must hold at least one whole frame; the session sizes it
    /// to one callback period.
    pub fn new(
        queue: Arc<SampleQueue>,
        gains: Arc<GainVector>,
        policy: MixPolicy,
        shutdown: Arc<Shutdown>,
        staging: Vec<f32>,
    ) -> Self {
        let channels = queue.channels().max(1);
        debug_assert!(staging.len() >= channels);
        // Waiting for more samples than the queue can ever hold would
        // deadlock against a decode thread blocked on the full queue.
        let pull_limit = staging.len().min(queue.capacity_samples()).max(1);
        Self {
            mixer: Mixer::new(channels, policy),
            queue,
            gains,
            shutdown,
            staging,
            pull_limit,
            channels,
            finished: false,
        }
    }

    /// Produce one device buffer.
    ///
    /// Pulls decoded samples period-by-period, runs each through the EQ mix
    /// and converts to the device sample format. Three terminal behaviors:
    ///
    /// - stop requested (or already finished): the whole buffer is written
    ///   as silence, so nothing stale plays while the session shuts the
    ///   stream down;
    /// - source drained mid-buffer: the mixed samples are written and the
    ///   tail of `data` is left exactly as the device provided it;
    /// - otherwise the buffer is filled completely.
    pub fn fill<T>(&mut self, data: &mut [T]) -> FillOutcome
    where
        T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
    {
        if self.finished || self.shutdown.stop_requested() {
            data.fill(<T as cpal::Sample>::from_sample::<f32>(0.0));
            self.finished = true;
            return FillOutcome::Complete;
        }

        let mut written = 0usize;
        while written < data.len() {
            let want = self.pull_limit.min(data.len() - written);
            let got = self.queue.read_exact_or_end(&mut self.staging[..want]);

            for i in 0..got {
                let channel = (written + i) % self.channels;
                let gains = self.gains.snapshot();
                let mixed = self.mixer.mix(channel, self.staging[i], &gains);
                data[written + i] = <T as cpal::Sample>::from_sample::<f32>(mixed);
            }
            written += got;

            if got < want {
                self.finished = true;
                return FillOutcome::Complete;
            }
        }

        FillOutcome::Continue
    }
}

/// Build a CPAL output stream around `render`.
///
/// The callback reports `Complete` outcomes through `shutdown`, which is
/// what the session's wait phase sleeps on. Device-side stream errors are
/// logged and also treated as stream completion.
pub fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    render: Render,
    shutdown: &Arc<Shutdown>,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, render, shutdown),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, render, shutdown),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, render, shutdown),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, render, shutdown),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

/// Type-specialized stream builder for CPAL sample formats.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut render: Render,
    shutdown: &Arc<Shutdown>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let err_shutdown = shutdown.clone();
    let err_fn = move |err| {
        tracing::warn!("stream error: {err}");
        err_shutdown.mark_stream_complete();
    };

    let cb_shutdown = shutdown.clone();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            if render.fill(data) == FillOutcome::Complete {
                cb_shutdown.mark_stream_complete();
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
