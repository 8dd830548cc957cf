//! dspeq — a small CLI player that runs a decoded audio stream through a
//! bank of fixed IIR filters and blends their outputs by live-adjustable
//! gains.
//!
//! ## Pipeline
//! 1. **Decode**: a background thread uses Symphonia to decode the input into
//!    interleaved `f32` samples feeding a bounded queue.
//! 2. **Mix**: the CPAL output callback pulls one period at a time, runs each
//!    sample through every filter and blends the outputs by the current
//!    gains (`eq-dsp`).
//! 3. **Control**: a stdin thread parses `<filter> <gain>` commands and
//!    updates the shared gain vector the callback reads.
//!
//! Shutdown is driven by one shared [`shutdown::Shutdown`]: the callback
//! latches stream completion, `exit` and Ctrl-C request a stop, and the main
//! thread owns the teardown ordering (pause the stream, close the decode
//! queue, release the device).

mod cli;
mod control;
mod decode;
mod device;
mod playback;
mod queue;
mod session;
mod shutdown;

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use eq_dsp::{GainVector, MixPolicy};
use tracing_subscriber::EnvFilter;

use crate::session::{Session, SessionOptions, StagingAllocError};
use crate::shutdown::{Shutdown, StopCause};

fn main() -> ExitCode {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,dspeq=info")),
        )
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Map a fatal error to the process exit code: staging-buffer allocation
/// failures get their own code, everything else (decoder, device, stream)
/// exits 1.
fn exit_code_for(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<StagingAllocError>().is_some() {
        2
    } else {
        1
    }
}

fn run(args: cli::Args) -> Result<()> {
    let host = cpal::default_host();

    if args.list_devices {
        return device::list_devices(&host);
    }

    tracing::info!(version = cli::VERSION, "dspeq");

    let path = args.path.context("no input file")?;

    let shutdown = Arc::new(Shutdown::new());
    let gains = Arc::new(GainVector::new());

    // The handler runs on ctrlc's own thread and only sets the stop flag;
    // teardown stays here on the main thread.
    let signal_shutdown = shutdown.clone();
    ctrlc::set_handler(move || signal_shutdown.request_stop())
        .context("install Ctrl-C handler")?;

    let opts = SessionOptions {
        path,
        device: args.device,
        frames: args.frames,
        buffer_seconds: args.buffer_seconds,
        policy: if args.skip_idle_filters {
            MixPolicy::SkipIdle
        } else {
            MixPolicy::AlwaysEvaluate
        },
    };

    let mut session = Session::open(&host, &opts, shutdown.clone(), gains.clone())?;
    session.start()?;

    // stdin can block forever between commands, so the control loop gets its
    // own thread and is never joined: when playback ends first, the process
    // exits out from under the blocked read.
    {
        let gains = gains.clone();
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            control::run_control_loop(std::io::stdin().lock(), &gains, &shutdown);
        });
    }

    match session.wait() {
        StopCause::StreamComplete => tracing::info!("stream complete"),
        StopCause::StopRequested => tracing::info!("stop requested"),
    }

    session.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn staging_alloc_errors_exit_2() {
        let e = anyhow::Error::new(StagingAllocError {
            frames: 256,
            channels: 2,
        });
        assert_eq!(exit_code_for(&e), 2);
        // Context layers must not hide the typed error.
        let wrapped = e.context("open session");
        assert_eq!(exit_code_for(&wrapped), 2);
    }

    #[test]
    fn other_errors_exit_1() {
        assert_eq!(exit_code_for(&anyhow!("no output device")), 1);
    }
}
