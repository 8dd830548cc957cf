//! Direct-form-I IIR sections.
//!
//! A [`Section`] holds up to five feed-forward and four feedback
//! coefficients, which covers everything in the filter catalog: fourth-order
//! filters use all taps, second-order stages leave the upper taps at zero.
//! The input/output histories live inside the section, so a section only
//! produces continuous output if it is fed every sample of exactly one
//! channel.

/// One IIR section in direct form I.
///
/// `process` computes
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + .. + b4*x[n-4]
///                - a1*y[n-1] - .. - a4*y[n-4]
/// ```
///
/// and shifts the histories. Coefficients are normalized to `a0 = 1`.
#[derive(Debug, Clone, Copy)]
pub struct Section {
    b: [f32; 5],
    a: [f32; 4],
    /// Previous inputs, most recent first.
    x: [f32; 4],
    /// Previous outputs, most recent first.
    y: [f32; 4],
}

impl Section {
    /// Builds a section with zeroed histories.
    pub const fn new(b: [f32; 5], a: [f32; 4]) -> Self {
        Self {
            b,
            a,
            x: [0.0; 4],
            y: [0.0; 4],
        }
    }

    /// Builds a second-order section; the third- and fourth-order taps stay
    /// at zero.
    pub const fn sos(b: [f32; 3], a: [f32; 2]) -> Self {
        Self::new([b[0], b[1], b[2], 0.0, 0.0], [a[0], a[1], 0.0, 0.0])
    }

    /// Runs one sample through the recurrence and advances the histories.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b[0] * input
            + self.b[1] * self.x[0]
            + self.b[2] * self.x[1]
            + self.b[3] * self.x[2]
            + self.b[4] * self.x[3]
            - self.a[0] * self.y[0]
            - self.a[1] * self.y[1]
            - self.a[2] * self.y[2]
            - self.a[3] * self.y[3];

        self.x[3] = self.x[2];
        self.x[2] = self.x[1];
        self.x[1] = self.x[0];
        self.x[0] = input;

        self.y[3] = self.y[2];
        self.y[2] = self.y[1];
        self.y[1] = self.y[0];
        self.y[0] = output;

        output
    }

    /// Zeroes the histories without touching the coefficients.
    pub fn reset(&mut self) {
        self.x = [0.0; 4];
        self.y = [0.0; 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: Section = Section::new([1.0, 0.0, 0.0, 0.0, 0.0], [0.0; 4]);

    #[test]
    fn identity_section_passes_input_through() {
        let mut s = IDENTITY;
        for x in [0.0, 1.0, -0.5, 0.25, 100.0] {
            assert_eq!(s.process(x), x);
        }
    }

    #[test]
    fn unit_delay_shifts_by_one_sample() {
        let mut s = Section::new([0.0, 1.0, 0.0, 0.0, 0.0], [0.0; 4]);
        let input = [1.0, 2.0, 3.0, 4.0];
        let mut output = Vec::new();
        for x in input {
            output.push(s.process(x));
        }
        assert_eq!(output, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn feedback_tap_accumulates() {
        // y[n] = x[n] + y[n-1] is a running sum.
        let mut s = Section::new([1.0, 0.0, 0.0, 0.0, 0.0], [-1.0, 0.0, 0.0, 0.0]);
        let sums: Vec<f32> = (0..4).map(|_| s.process(1.0)).collect();
        assert_eq!(sums, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn fourth_order_taps_are_used() {
        // b4-only section: output is the input delayed by four samples.
        let mut s = Section::new([0.0, 0.0, 0.0, 0.0, 1.0], [0.0; 4]);
        let mut output = Vec::new();
        for x in [5.0, 6.0, 7.0, 8.0, 9.0, 10.0] {
            output.push(s.process(x));
        }
        assert_eq!(output, vec![0.0, 0.0, 0.0, 0.0, 5.0, 6.0]);
    }

    #[test]
    fn reset_restores_initial_response() {
        let mut s = Section::new([0.3, 0.2, 0.1, 0.0, 0.0], [-0.5, 0.1, 0.0, 0.0]);
        let input = [1.0, -1.0, 0.5, 0.25, -0.75];
        let first: Vec<f32> = input.iter().map(|&x| s.process(x)).collect();
        s.reset();
        let second: Vec<f32> = input.iter().map(|&x| s.process(x)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn sos_matches_full_section_with_zero_upper_taps() {
        let mut narrow = Section::sos([0.4, -0.3, 0.2], [-0.9, 0.4]);
        let mut full = Section::new([0.4, -0.3, 0.2, 0.0, 0.0], [-0.9, 0.4, 0.0, 0.0]);
        for i in 0..32 {
            let x = (i as f32 * 0.37).sin();
            assert_eq!(narrow.process(x), full.process(x));
        }
    }
}
