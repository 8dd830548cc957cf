//! Thread-safe bounded queue for interleaved audio samples.
//!
//! [`SampleQueue`] is the hand-off between the decode thread and the output
//! callback:
//! - decode thread → `push_blocking` (backpressure when full)
//! - output callback → `read_exact_or_end` (short reads only at end of stream)
//!
//! A `closed` flag lives *under the same mutex* as the buffer so readers and
//! writers never race against shutdown. `close()` is idempotent and doubles
//! as the wake-up for anyone blocked on the queue.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Bounded queue of interleaved `f32` samples.
///
/// Samples are stored interleaved:
/// `frame0[ch0], frame0[ch1], ..., frame1[ch0], frame1[ch1], ...`
///
/// The `channels` count is fixed for the lifetime of the queue. The capacity
/// is a cap in **samples**; use [`queue_capacity_samples`] to size it from a
/// seconds target.
pub struct SampleQueue {
    channels: usize,
    inner: Mutex<QueueInner>,
    cv: Condvar,
    max_buffered_samples: usize,
}

struct QueueInner {
    buf: VecDeque<f32>,
    closed: bool,
}

/// Queue capacity in **samples** for a `(rate, channels, seconds)` target.
///
/// Non-finite or non-positive `buffer_seconds` falls back to two seconds.
/// The returned value is `ceil(rate_hz * seconds) * channels` (saturating),
/// with a floor of one sample per channel.
pub fn queue_capacity_samples(rate_hz: u32, channels: usize, buffer_seconds: f32) -> usize {
    let secs = if buffer_seconds.is_finite() && buffer_seconds > 0.0 {
        buffer_seconds
    } else {
        2.0
    };

    let frames = ((rate_hz as f32 * secs).ceil() as usize).max(1);
    frames.saturating_mul(channels)
}

impl SampleQueue {
    pub fn new(channels: usize, max_buffered_samples: usize) -> Self {
        Self {
            channels,
            inner: Mutex::new(QueueInner {
                buf: VecDeque::new(),
                closed: false,
            }),
            cv: Condvar::new(),
            max_buffered_samples,
        }
    }

    /// Number of channels in the interleaved stream carried by this queue.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Capacity cap in samples.
    pub fn capacity_samples(&self) -> usize {
        self.max_buffered_samples
    }

    /// Currently buffered samples (best-effort snapshot).
    pub fn len_samples(&self) -> usize {
        let g = self.inner.lock().unwrap();
        g.buf.len()
    }

    /// Whether the producer side has closed the queue.
    ///
    /// A closed queue may still hold buffered samples until drained.
    pub fn is_closed(&self) -> bool {
        let g = self.inner.lock().unwrap();
        g.closed
    }

    /// Mark the end of the stream and wake all waiters.
    ///
    /// After this, `read_exact_or_end` drains what is buffered and then
    /// returns short, and `push_blocking` drops its input. Idempotent.
    pub fn close(&self) {
        let mut g = self.inner.lock().unwrap();
        g.closed = true;
        drop(g);
        self.cv.notify_all();
    }

    /// Push interleaved samples, blocking while the queue is full.
    ///
    /// If the queue is closed (before or while waiting), the remaining
    /// samples are dropped and the call returns early.
    pub fn push_blocking(&self, samples: &[f32]) {
        let mut offset = 0;

        while offset < samples.len() {
            let mut g = self.inner.lock().unwrap();

            while g.buf.len() >= self.max_buffered_samples && !g.closed {
                g = self.cv.wait(g).unwrap();
            }
            if g.closed {
                return;
            }

            let mut pushed_any = false;
            while offset < samples.len() && g.buf.len() < self.max_buffered_samples {
                g.buf.push_back(samples[offset]);
                offset += 1;
                pushed_any = true;
            }

            drop(g);
            if pushed_any {
                self.cv.notify_all();
            }
        }
    }

    /// Fill `dst` completely, blocking until enough samples arrive.
    ///
    /// Returns the number of samples written. The count is `dst.len()`
    /// except at end of stream: once the queue is closed, whatever is still
    /// buffered is handed out and the call returns short (possibly zero).
    /// The tail of `dst` past the returned count is left untouched.
    ///
    /// Copies into caller-provided storage, so the caller side stays
    /// allocation-free.
    pub fn read_exact_or_end(&self, dst: &mut [f32]) -> usize {
        let mut g = self.inner.lock().unwrap();

        while g.buf.len() < dst.len() && !g.closed {
            g = self.cv.wait(g).unwrap();
        }

        let take = g.buf.len().min(dst.len());
        for slot in dst[..take].iter_mut() {
            *slot = g.buf.pop_front().unwrap_or(0.0);
        }

        drop(g);
        if take > 0 {
            self.cv.notify_all();
        }
        take
    }

    /// Wait until at least `want` samples are buffered, or the stream ends,
    /// or `timeout` elapses.
    ///
    /// Returns `true` when the queue is ready to be read without blocking
    /// (enough data, or closed so reads return immediately).
    pub fn wait_for_samples(&self, want: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut g = self.inner.lock().unwrap();

        loop {
            if g.buf.len() >= want || g.closed {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (ng, _timeout) = self.cv.wait_timeout(g, deadline - now).unwrap();
            g = ng;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn queue_capacity_samples_fallbacks() {
        assert_eq!(queue_capacity_samples(48_000, 2, 2.0), 192_000);
        assert_eq!(queue_capacity_samples(48_000, 2, -1.0), 192_000);
        assert_eq!(queue_capacity_samples(48_000, 2, f32::NAN), 192_000);
        assert_eq!(queue_capacity_samples(48_000, 2, f32::INFINITY), 192_000);
        assert_eq!(queue_capacity_samples(44_100, 1, 0.5), 22_050);
    }

    #[test]
    fn read_waits_for_a_full_buffer() {
        let q = Arc::new(SampleQueue::new(2, 64));
        let q_push = q.clone();
        let barrier = Arc::new(Barrier::new(2));
        let start = barrier.clone();

        let handle = thread::spawn(move || {
            start.wait();
            let mut out = [0.0_f32; 6];
            let n = q.read_exact_or_end(&mut out);
            assert_eq!(n, 6);
            assert_eq!(out, [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        });

        barrier.wait();
        q_push.push_blocking(&[0.1, 0.2, 0.3, 0.4]);
        q_push.push_blocking(&[0.5, 0.6]);

        handle.join().unwrap();
    }

    #[test]
    fn read_returns_short_only_after_close() {
        let q = Arc::new(SampleQueue::new(2, 64));
        let q_read = q.clone();
        let barrier = Arc::new(Barrier::new(2));
        let start = barrier.clone();

        let handle = thread::spawn(move || {
            start.wait();
            let mut out = [9.0_f32; 8];
            let n = q_read.read_exact_or_end(&mut out);
            assert_eq!(n, 4);
            assert_eq!(&out[..4], &[1.0, 2.0, 3.0, 4.0]);
            // Tail past the count is untouched.
            assert_eq!(&out[4..], &[9.0, 9.0, 9.0, 9.0]);
        });

        barrier.wait();
        q.push_blocking(&[1.0, 2.0, 3.0, 4.0]);
        q.close();

        handle.join().unwrap();
    }

    #[test]
    fn read_on_closed_empty_queue_returns_zero() {
        let q = SampleQueue::new(2, 64);
        q.close();
        let mut out = [0.5_f32; 4];
        assert_eq!(q.read_exact_or_end(&mut out), 0);
        assert_eq!(out, [0.5; 4]);
    }

    #[test]
    fn push_drops_samples_once_closed() {
        let q = SampleQueue::new(1, 64);
        q.close();
        q.push_blocking(&[1.0, 2.0]);
        assert_eq!(q.len_samples(), 0);
    }

    #[test]
    fn push_blocks_at_capacity_until_reader_drains() {
        let q = Arc::new(SampleQueue::new(1, 4));
        let q_push = q.clone();

        let pusher = thread::spawn(move || {
            q_push.push_blocking(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        });

        // Drain in two reads; the pusher can only finish after the first.
        let mut out = [0.0_f32; 4];
        assert_eq!(q.read_exact_or_end(&mut out), 4);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0]);

        let mut rest = [0.0_f32; 2];
        assert_eq!(q.read_exact_or_end(&mut rest), 2);
        assert_eq!(rest, [5.0, 6.0]);

        pusher.join().unwrap();
    }

    #[test]
    fn close_is_idempotent() {
        let q = SampleQueue::new(2, 16);
        q.close();
        q.close();
        assert!(q.is_closed());
    }

    #[test]
    fn wait_for_samples_times_out_when_starved() {
        let q = SampleQueue::new(2, 64);
        assert!(!q.wait_for_samples(4, Duration::from_millis(10)));
    }

    #[test]
    fn wait_for_samples_sees_buffered_data() {
        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0, 3.0, 4.0]);
        assert!(q.wait_for_samples(4, Duration::from_millis(10)));
    }

    #[test]
    fn wait_for_samples_wakes_on_close() {
        let q = Arc::new(SampleQueue::new(2, 64));
        let q_close = q.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            q_close.close();
        });

        assert!(q.wait_for_samples(1_000_000, Duration::from_secs(5)));
        handle.join().unwrap();
    }
}
