//! Playback session lifecycle.
//!
//! A [`Session`] walks one source file through a fixed phase order:
//!
//! ```text
//! (uninitialized) --open--> DeviceReady --start--> Streaming
//!     Streaming --wait--> (stream complete / stop requested)
//!     any phase --close--> Stopping --> Closed
//! ```
//!
//! `open` acquires resources in dependency order: decoder first (it decides
//! rate and channel count), then the staging buffer, then the device and
//! its config. A failure at any step releases what was already acquired
//! before the error propagates. `close` is idempotent and runs in reverse:
//! it ends the input queue (which unblocks a callback waiting on it), stops
//! the stream so the device confirms no further callbacks, then drops
//! everything.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, StreamTrait};
use eq_dsp::{GainVector, MixPolicy};

use crate::decode::{self, DecodedSource};
use crate::device;
use crate::playback::{self, Render};
use crate::queue::SampleQueue;
use crate::shutdown::{Shutdown, StopCause};

/// How long `start` waits for the decode thread to buffer the first period
/// before the stream begins.
const PREBUFFER_WAIT: Duration = Duration::from_millis(500);

/// Where a session is in its life. A session only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Decoder running, staging allocated, device and config chosen.
    DeviceReady,
    /// Output stream playing; the callback owns the audio path.
    Streaming,
    /// Teardown in progress.
    Stopping,
    /// All resources released. Terminal.
    Closed,
}

/// Knobs for one playback session.
pub struct SessionOptions {
    pub path: PathBuf,
    /// Output device substring; `None` picks the host default.
    pub device: Option<String>,
    /// Requested callback period in frames.
    pub frames: u32,
    /// Decode prebuffer target in seconds.
    pub buffer_seconds: f32,
    pub policy: MixPolicy,
}

/// Staging allocation failure carries its own type so `main` can map it to
/// a distinct exit code.
#[derive(Debug, thiserror::Error)]
#[error("cannot allocate staging buffer ({frames} frames x {channels} channels)")]
pub struct StagingAllocError {
    pub frames: usize,
    pub channels: usize,
}

/// One file, one device, one run.
pub struct Session {
    queue: Arc<SampleQueue>,
    shutdown: Arc<Shutdown>,
    gains: Arc<GainVector>,
    policy: MixPolicy,
    device: Option<cpal::Device>,
    stream_config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    stream: Option<cpal::Stream>,
    staging: Option<Vec<f32>>,
    prebuffer_samples: usize,
    phase: Phase,
}

impl Session {
    /// Open the source and prepare the device: the transition into
    /// `DeviceReady`.
    pub fn open(
        host: &cpal::Host,
        opts: &SessionOptions,
        shutdown: Arc<Shutdown>,
        gains: Arc<GainVector>,
    ) -> Result<Session> {
        let source = decode::open_path(&opts.path, opts.buffer_seconds)?;

        // From here on a decode thread is filling the queue; closing the
        // queue on failure lets that thread retire instead of parking on a
        // full buffer forever.
        let queue = source.queue.clone();
        let session = Self::finish_open(host, opts, shutdown, gains, source);
        if session.is_err() {
            queue.close();
        }
        session
    }

    fn finish_open(
        host: &cpal::Host,
        opts: &SessionOptions,
        shutdown: Arc<Shutdown>,
        gains: Arc<GainVector>,
        source: DecodedSource,
    ) -> Result<Session> {
        let rate = source.spec.rate;
        let channels = source.spec.channels.count();
        tracing::info!(
            rate_hz = rate,
            channels,
            codec = source.codec.as_deref().unwrap_or("unknown"),
            duration_ms = source.duration_ms,
            "source ready"
        );

        let frames = opts.frames.max(1);
        let staging = alloc_staging(frames as usize, channels)?;

        let device = device::pick_device(host, opts.device.as_deref())?;
        let description = device.description()?;
        tracing::info!(device = %description, "output device");

        let supported = device::pick_output_config(&device, rate, channels as u16)?;
        let mut stream_config: cpal::StreamConfig = supported.clone().into();
        if let Some(size) = device::pick_buffer_size(&supported, frames) {
            if let cpal::BufferSize::Fixed(actual) = size {
                if actual != frames {
                    tracing::warn!(
                        requested = frames,
                        actual,
                        "device clamps the callback period"
                    );
                }
            }
            stream_config.buffer_size = size;
        }
        tracing::debug!(
            ?stream_config,
            format = ?supported.sample_format(),
            "output config chosen"
        );

        Ok(Session {
            queue: source.queue,
            shutdown,
            gains,
            policy: opts.policy,
            device: Some(device),
            stream_config,
            sample_format: supported.sample_format(),
            stream: None,
            staging: Some(staging),
            prebuffer_samples: frames as usize * channels,
            phase: Phase::DeviceReady,
        })
    }

    /// Build and start the output stream: `DeviceReady` → `Streaming`.
    ///
    /// On failure the session closes itself before the error propagates,
    /// so no stream or decode thread outlives the attempt.
    pub fn start(&mut self) -> Result<()> {
        if self.phase != Phase::DeviceReady {
            bail!("cannot start a session in phase {:?}", self.phase);
        }

        let staging = self
            .staging
            .take()
            .ok_or_else(|| anyhow!("staging buffer already consumed"))?;
        let device = self
            .device
            .take()
            .ok_or_else(|| anyhow!("device already consumed"))?;

        // Give the decode thread a head start so the first callback does
        // not have to wait on the queue.
        let want = self.prebuffer_samples.min(self.queue.capacity_samples());
        if !self.queue.wait_for_samples(want, PREBUFFER_WAIT) {
            tracing::warn!("starting before the first period is buffered");
        }

        let render = Render::new(
            self.queue.clone(),
            self.gains.clone(),
            self.policy,
            self.shutdown.clone(),
            staging,
        );

        let stream = match playback::build_output_stream(
            &device,
            &self.stream_config,
            self.sample_format,
            render,
            &self.shutdown,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                self.close_quietly();
                return Err(e.context("build output stream"));
            }
        };

        if let Err(e) = stream.play() {
            drop(stream);
            self.close_quietly();
            return Err(e).context("start output stream");
        }

        self.stream = Some(stream);
        self.phase = Phase::Streaming;
        tracing::debug!("streaming");
        Ok(())
    }

    /// Block until the callback reports the stream complete or a stop is
    /// requested. Call after `start`.
    pub fn wait(&self) -> StopCause {
        self.shutdown.wait()
    }

    /// Tear the session down: any phase → `Closed`. Idempotent.
    ///
    /// A stop/teardown failure is still returned after the remaining
    /// resources are released.
    pub fn close(&mut self) -> Result<()> {
        if self.phase == Phase::Closed {
            return Ok(());
        }
        self.phase = Phase::Stopping;

        // End the input first. A callback blocked on the queue wakes up,
        // finishes its buffer and completes, so the stream below can stop.
        self.queue.close();

        let mut result = Ok(());
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                result = Err(anyhow::Error::new(e).context("stop output stream"));
            }
            drop(stream);
        }

        self.device = None;
        self.staging = None;
        self.phase = Phase::Closed;
        tracing::debug!("session closed");
        result
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn close_quietly(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("session close failed: {e:#}");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close_quietly();
    }
}

fn alloc_staging(frames: usize, channels: usize) -> Result<Vec<f32>, StagingAllocError> {
    let samples = frames
        .checked_mul(channels)
        .ok_or(StagingAllocError { frames, channels })?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(samples)
        .map_err(|_| StagingAllocError { frames, channels })?;
    buf.resize(samples, 0.0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> Session {
        Session {
            queue: Arc::new(SampleQueue::new(1, 4_096)),
            shutdown: Arc::new(Shutdown::new()),
            gains: Arc::new(GainVector::new()),
            policy: MixPolicy::AlwaysEvaluate,
            device: None,
            stream_config: cpal::StreamConfig {
                channels: 1,
                sample_rate: 48_000,
                buffer_size: cpal::BufferSize::Default,
            },
            sample_format: cpal::SampleFormat::F32,
            stream: None,
            staging: Some(vec![0.0; 256]),
            prebuffer_samples: 256,
            phase: Phase::DeviceReady,
        }
    }

    #[test]
    fn alloc_staging_sizes_by_frames_and_channels() {
        let buf = alloc_staging(256, 2).unwrap();
        assert_eq!(buf.len(), 512);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn alloc_staging_rejects_overflowing_requests() {
        assert!(alloc_staging(usize::MAX, 2).is_err());
        // Within usize range but beyond anything an allocator will grant.
        assert!(alloc_staging(usize::MAX / 4, 2).is_err());
    }

    #[test]
    fn close_is_idempotent_and_terminal() {
        let mut session = test_session();
        assert_eq!(session.phase(), Phase::DeviceReady);

        assert!(session.close().is_ok());
        assert_eq!(session.phase(), Phase::Closed);
        assert!(session.queue.is_closed());
        assert!(session.staging.is_none());

        assert!(session.close().is_ok());
        assert_eq!(session.phase(), Phase::Closed);
    }

    #[test]
    fn start_refuses_a_closed_session() {
        let mut session = test_session();
        session.close().unwrap();
        assert!(session.start().is_err());
        assert_eq!(session.phase(), Phase::Closed);
    }

    #[test]
    fn dropping_a_session_closes_its_queue() {
        let session = test_session();
        let queue = session.queue.clone();
        drop(session);
        assert!(queue.is_closed());
    }

    #[test]
    fn staging_error_mentions_the_request() {
        let err = alloc_staging(usize::MAX, 2).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("staging buffer"), "{msg}");
    }
}
