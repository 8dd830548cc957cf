//! Shared per-filter gains.
//!
//! The control thread writes gains while the output callback reads them
//! every sample, so the vector is stored as f32 bit patterns in atomics
//! instead of behind a lock. Each entry is individually atomic; a snapshot
//! taken while several entries change may mix old and new values, which is
//! fine for gain staging.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::bank::FilterId;

/// Lock-free gain vector, one entry per catalog filter.
///
/// Gains start at zero (filter inactive). Values are not clamped or
/// validated; negative gains invert, large gains amplify.
#[derive(Debug)]
pub struct GainVector {
    gains: [AtomicU32; FilterId::COUNT],
}

impl GainVector {
    pub fn new() -> Self {
        Self {
            gains: std::array::from_fn(|_| AtomicU32::new(0.0_f32.to_bits())),
        }
    }

    pub fn set(&self, id: FilterId, gain: f32) {
        self.gains[id.index()].store(gain.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self, id: FilterId) -> f32 {
        f32::from_bits(self.gains[id.index()].load(Ordering::Relaxed))
    }

    /// Sets every entry back to zero.
    pub fn clear(&self) {
        for gain in &self.gains {
            gain.store(0.0_f32.to_bits(), Ordering::Relaxed);
        }
    }

    /// Reads all entries into a plain-value snapshot.
    pub fn snapshot(&self) -> GainSnapshot {
        GainSnapshot {
            gains: std::array::from_fn(|i| f32::from_bits(self.gains[i].load(Ordering::Relaxed))),
        }
    }
}

impl Default for GainVector {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of the gain vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSnapshot {
    gains: [f32; FilterId::COUNT],
}

impl GainSnapshot {
    pub const fn from_array(gains: [f32; FilterId::COUNT]) -> Self {
        Self { gains }
    }

    pub fn get(&self, id: FilterId) -> f32 {
        self.gains[id.index()]
    }

    /// True if any filter has a non-zero gain.
    pub fn any_active(&self) -> bool {
        self.gains.iter().any(|&g| g != 0.0)
    }
}
