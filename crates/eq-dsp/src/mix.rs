//! Gain-weighted blending of filter outputs.
//!
//! The mixer runs one sample of one channel through the filter bank and
//! folds the active outputs into a single sample:
//!
//! - no active filter: the input passes through untouched,
//! - otherwise: `sum(gain_i * filter_i(x)) / active_count`.
//!
//! The divisor is the number of active filters, not the gain sum, so gains
//! scale their own filter without re-normalizing the others.

use crate::bank::{FilterBank, FilterId};
use crate::gain::GainSnapshot;

/// What to do with filters whose gain is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixPolicy {
    /// Run every catalog filter each sample so its state stays warm.
    /// A filter faded in mid-stream continues from the live signal history
    /// instead of producing a cold-start transient.
    #[default]
    AlwaysEvaluate,
    /// Evaluate only filters with non-zero gain. Cheaper per sample, but a
    /// filter re-enabled after idling restarts from whatever state it last
    /// had.
    SkipIdle,
}

/// Per-channel filter banks plus the blend policy.
///
/// `mix` is allocation-free and lock-free; the caller supplies the gain
/// snapshot so one snapshot can cover however many samples the caller
/// wants to treat as a unit.
pub struct Mixer {
    banks: Vec<FilterBank>,
    policy: MixPolicy,
}

impl Mixer {
    /// Builds a mixer with one independent filter bank per channel.
    pub fn new(channels: usize, policy: MixPolicy) -> Self {
        let channels = channels.max(1);
        Self {
            banks: vec![FilterBank::new(); channels],
            policy,
        }
    }

    pub fn channels(&self) -> usize {
        self.banks.len()
    }

    /// Blends one sample of `channel`.
    ///
    /// Panics if `channel` is out of range; callers derive the channel from
    /// the interleaved sample position, which keeps it in range.
    #[inline]
    pub fn mix(&mut self, channel: usize, input: f32, gains: &GainSnapshot) -> f32 {
        let bank = &mut self.banks[channel];
        let mut sum = 0.0_f32;
        let mut active = 0u32;
        for id in FilterId::ALL {
            let gain = gains.get(id);
            if gain != 0.0 {
                sum += gain * bank.process(id, input);
                active += 1;
            } else if self.policy == MixPolicy::AlwaysEvaluate {
                bank.process(id, input);
            }
        }
        if active == 0 {
            input
        } else {
            sum / active as f32
        }
    }

    /// Zeroes the filter histories of every channel.
    pub fn reset(&mut self) {
        for bank in &mut self.banks {
            bank.reset();
        }
    }
}
