//! Cross-thread stop and completion signaling.
//!
//! One [`Shutdown`] is shared by the output callback, the control thread,
//! the Ctrl-C handler and the main thread. Two conditions end a run:
//!
//! - the callback reports the stream complete (source drained, or a stop
//!   request observed),
//! - somebody requests a stop (`exit` command, SIGINT).
//!
//! The stop flag is mirrored in an atomic so the callback can poll it
//! without taking the mutex; the mutex/condvar pair exists for the main
//! thread, which sleeps until either condition holds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

/// Why [`Shutdown::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// The output callback consumed the whole source.
    StreamComplete,
    /// Somebody asked the run to end early.
    StopRequested,
}

#[derive(Default)]
struct Flags {
    stop: bool,
    complete: bool,
}

pub struct Shutdown {
    stop: AtomicBool,
    flags: Mutex<Flags>,
    cv: Condvar,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            flags: Mutex::new(Flags::default()),
            cv: Condvar::new(),
        }
    }

    /// Ask the run to end. Idempotent.
    ///
    /// Takes the flag mutex to wake the waiter, so callers must be ordinary
    /// threads (the control loop, ctrlc's handler thread) rather than
    /// async-signal context.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        let mut f = self.flags.lock().unwrap();
        f.stop = true;
        drop(f);
        self.cv.notify_all();
    }

    /// Lock-free check used by the output callback.
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Called by the output callback when it will produce no more audio.
    /// Idempotent.
    pub fn mark_stream_complete(&self) {
        let mut f = self.flags.lock().unwrap();
        if !f.complete {
            f.complete = true;
            drop(f);
            self.cv.notify_all();
        }
    }

    /// Block until the stream completes or a stop is requested.
    ///
    /// When both raced in, the stop request wins the classification: the
    /// callback also completes in response to a stop, but the run ended
    /// because somebody asked.
    pub fn wait(&self) -> StopCause {
        let mut f = self.flags.lock().unwrap();
        while !f.complete && !f.stop {
            f = self.cv.wait(f).unwrap();
        }
        if f.stop {
            StopCause::StopRequested
        } else {
            StopCause::StreamComplete
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
