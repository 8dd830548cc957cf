//! The fixed filter catalog.
//!
//! Four named filters, all designed for a 48 kHz sample rate:
//!
//! | id          | design                                  |
//! |-------------|-----------------------------------------|
//! | `lowpass`   | 4th-order Butterworth, Fc 500 Hz        |
//! | `highpass`  | 4th-order Butterworth, Fc 10 kHz        |
//! | `bandpass1` | Butterworth band-pass, 300 Hz - 2 kHz   |
//! | `bandpass2` | Butterworth band-pass, 2 kHz - 5 kHz    |
//!
//! A [`FilterBank`] owns one warm state per catalog entry. Feeding other
//! sample rates through the bank still works, the corner frequencies just
//! land elsewhere.

use crate::biquad::Section;

/// Identifies one entry of the filter catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterId {
    LowPass = 0,
    HighPass = 1,
    BandPass1 = 2,
    BandPass2 = 3,
}

impl FilterId {
    /// Catalog order; also the index order used by [`FilterBank`] and the
    /// gain vector.
    pub const ALL: [FilterId; 4] = [
        FilterId::LowPass,
        FilterId::HighPass,
        FilterId::BandPass1,
        FilterId::BandPass2,
    ];

    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterId::LowPass => "lowpass",
            FilterId::HighPass => "highpass",
            FilterId::BandPass1 => "bandpass1",
            FilterId::BandPass2 => "bandpass2",
        }
    }

    /// Parses a catalog name or its short alias, case-insensitive.
    pub fn parse(token: &str) -> Option<FilterId> {
        for id in FilterId::ALL {
            if token.eq_ignore_ascii_case(id.name()) || token.eq_ignore_ascii_case(id.alias()) {
                return Some(id);
            }
        }
        None
    }

    fn alias(self) -> &'static str {
        match self {
            FilterId::LowPass => "lp",
            FilterId::HighPass => "hp",
            FilterId::BandPass1 => "bp1",
            FilterId::BandPass2 => "bp2",
        }
    }
}

// 4th-order Butterworth low-pass, Fc 500 Hz at Fs 48 kHz.
const LOWPASS_B: [f32; 5] = [0.00000105, 0.00000422, 0.00000633, 0.00000422, 0.00000105];
const LOWPASS_A: [f32; 4] = [-3.8289861, 5.50142959, -3.51519387, 0.84276724];

// 4th-order Butterworth high-pass, Fc 10 kHz at Fs 48 kHz.
const HIGHPASS_B: [f32; 5] = [0.15284324, -0.61137298, 0.91705946, -0.61137298, 0.15284324];
const HIGHPASS_A: [f32; 4] = [-0.65147165, 0.62047212, -0.14737946, 0.02616866];

// Butterworth band-pass 300 Hz - 2 kHz, as two cascaded second-order stages.
const BANDPASS1_S1_B: [f32; 3] = [0.01066456, 0.02132913, 0.01066456];
const BANDPASS1_S1_A: [f32; 2] = [-1.71860877, 0.76714263];
const BANDPASS1_S2_B: [f32; 3] = [1.0, -2.0, 1.0];
const BANDPASS1_S2_A: [f32; 2] = [-1.94973513, 0.95160794];

// Butterworth band-pass 2 kHz - 5 kHz, as two cascaded second-order stages.
const BANDPASS2_S1_B: [f32; 3] = [0.02995458, 0.05990916, 0.02995458];
const BANDPASS2_S1_A: [f32; 2] = [-1.40872235, 0.69344263];
const BANDPASS2_S2_B: [f32; 3] = [1.0, -2.0, 1.0];
const BANDPASS2_S2_A: [f32; 2] = [-1.74998831, 0.82784342];

/// One catalog filter: a single section, or two cascaded second-order
/// stages.
#[derive(Debug, Clone, Copy)]
pub struct Filter {
    first: Section,
    second: Option<Section>,
}

impl Filter {
    const fn single(section: Section) -> Self {
        Self {
            first: section,
            second: None,
        }
    }

    const fn cascade(first: Section, second: Section) -> Self {
        Self {
            first,
            second: Some(second),
        }
    }

    /// Runs one sample through every stage, advancing all stage histories.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mid = self.first.process(input);
        match &mut self.second {
            Some(stage) => stage.process(mid),
            None => mid,
        }
    }

    pub fn reset(&mut self) {
        self.first.reset();
        if let Some(stage) = &mut self.second {
            stage.reset();
        }
    }
}

/// The catalog with one persistent state per filter.
///
/// Each filter keeps its own histories, so running one filter never
/// disturbs another. A bank is tied to a single channel; multi-channel
/// callers hold one bank per channel.
#[derive(Debug, Clone)]
pub struct FilterBank {
    filters: [Filter; FilterId::COUNT],
}

impl FilterBank {
    pub fn new() -> Self {
        Self {
            filters: [
                Filter::single(Section::new(LOWPASS_B, LOWPASS_A)),
                Filter::single(Section::new(HIGHPASS_B, HIGHPASS_A)),
                Filter::cascade(
                    Section::sos(BANDPASS1_S1_B, BANDPASS1_S1_A),
                    Section::sos(BANDPASS1_S2_B, BANDPASS1_S2_A),
                ),
                Filter::cascade(
                    Section::sos(BANDPASS2_S1_B, BANDPASS2_S1_A),
                    Section::sos(BANDPASS2_S2_B, BANDPASS2_S2_A),
                ),
            ],
        }
    }

    /// Runs one sample through the given filter's persistent state.
    #[inline]
    pub fn process(&mut self, id: FilterId, input: f32) -> f32 {
        self.filters[id.index()].process(input)
    }

    /// Zeroes every filter's histories.
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new()
    }
}
