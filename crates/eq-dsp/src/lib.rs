//! Filter-bank DSP for the `dspeq` player.
//!
//! The crate is split along the audio path:
//! - [`biquad`]: a single direct-form-I IIR section with persistent history.
//! - [`bank`]: the fixed catalog of named filters, one warm state per bank.
//! - [`gain`]: the lock-free gain vector shared between the control thread
//!   and the output callback.
//! - [`mix`]: gain-weighted blending of filter outputs into one sample.
//!
//! Everything here is allocation-free after construction so it can run on
//! the audio callback.

pub mod bank;
pub mod biquad;
pub mod gain;
pub mod mix;

pub use bank::{Filter, FilterBank, FilterId};
pub use biquad::Section;
pub use gain::{GainSnapshot, GainVector};
pub use mix::{MixPolicy, Mixer};
