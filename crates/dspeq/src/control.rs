//! Interactive control surface.
//!
//! Reads line commands and applies them to the shared gain vector:
//!
//! ```text
//! <filter> <gain>   set one filter's gain (lowpass/highpass/bandpass1/
//!                   bandpass2, or lp/hp/bp1/bp2)
//! none              clear all gains (passthrough)
//! exit              stop playback and quit
//! ```
//!
//! Anything else is reported on stderr and ignored; playback continues.
//! End of input (Ctrl-D, or a closed pipe) ends the loop quietly without
//! touching playback.

use std::io::BufRead;

use eq_dsp::{FilterId, GainVector};

use crate::shutdown::Shutdown;

/// One parsed control line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Directive {
    SetGain(FilterId, f32),
    ClearAll,
    Quit,
}

/// Parse one non-empty control line.
///
/// Gains take anything `f32` parses, sign and magnitude included; the mix
/// stage is the place that decides what a gain means, not the parser.
pub fn parse_directive(line: &str) -> Result<Directive, String> {
    let mut parts = line.split_whitespace();
    let head = match parts.next() {
        Some(h) => h,
        None => return Err("empty command".to_string()),
    };

    if head.eq_ignore_ascii_case("exit") {
        return match parts.next() {
            None => Ok(Directive::Quit),
            Some(extra) => Err(format!("unexpected token after exit: {extra}")),
        };
    }

    if head.eq_ignore_ascii_case("none") {
        return match parts.next() {
            None => Ok(Directive::ClearAll),
            Some(extra) => Err(format!("unexpected token after none: {extra}")),
        };
    }

    let Some(id) = FilterId::parse(head) else {
        return Err(format!("unknown filter: {head}"));
    };
    let Some(gain_token) = parts.next() else {
        return Err(format!("missing gain for {}", id.name()));
    };
    let gain: f32 = gain_token
        .parse()
        .map_err(|_| format!("bad gain value: {gain_token}"))?;
    if let Some(extra) = parts.next() {
        return Err(format!("unexpected trailing token: {extra}"));
    }

    Ok(Directive::SetGain(id, gain))
}

/// Drive the control loop over `input` until `exit`, end of input, or an
/// input error.
pub fn run_control_loop<R: BufRead>(input: R, gains: &GainVector, shutdown: &Shutdown) {
    eprint!("> ");
    for line in input.lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            eprint!("> ");
            continue;
        }

        match parse_directive(trimmed) {
            Ok(Directive::SetGain(id, gain)) => {
                gains.set(id, gain);
                tracing::info!(filter = id.name(), gain, "gain set");
            }
            Ok(Directive::ClearAll) => {
                gains.clear();
                tracing::info!("all filters cleared");
            }
            Ok(Directive::Quit) => {
                shutdown.request_stop();
                return;
            }
            Err(reason) => eprintln!("unrecognized command: {reason}"),
        }
        eprint!("> ");
    }
    tracing::debug!("control input ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_set_gain_with_names_and_aliases() {
        assert_eq!(
            parse_directive("lowpass 0.5"),
            Ok(Directive::SetGain(FilterId::LowPass, 0.5))
        );
        assert_eq!(
            parse_directive("lp 0.5"),
            Ok(Directive::SetGain(FilterId::LowPass, 0.5))
        );
        assert_eq!(
            parse_directive("BANDPASS2 -2"),
            Ok(Directive::SetGain(FilterId::BandPass2, -2.0))
        );
        assert_eq!(
            parse_directive("Hp 1000"),
            Ok(Directive::SetGain(FilterId::HighPass, 1000.0))
        );
    }

    #[test]
    fn gain_values_are_not_validated() {
        assert_eq!(
            parse_directive("hp inf"),
            Ok(Directive::SetGain(FilterId::HighPass, f32::INFINITY))
        );
        assert_eq!(
            parse_directive("bp1 0"),
            Ok(Directive::SetGain(FilterId::BandPass1, 0.0))
        );
    }

    #[test]
    fn parses_none_and_exit() {
        assert_eq!(parse_directive("none"), Ok(Directive::ClearAll));
        assert_eq!(parse_directive("NONE"), Ok(Directive::ClearAll));
        assert_eq!(parse_directive("exit"), Ok(Directive::Quit));
        assert_eq!(parse_directive("Exit"), Ok(Directive::Quit));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_directive("bass 1").is_err());
        assert!(parse_directive("lp").is_err());
        assert!(parse_directive("lp abc").is_err());
        assert!(parse_directive("lp 1 2").is_err());
        assert!(parse_directive("none 1").is_err());
        assert!(parse_directive("exit now").is_err());
    }

    #[test]
    fn loop_applies_directives_until_exit() {
        let gains = GainVector::new();
        let shutdown = Shutdown::new();
        let input = Cursor::new("lp 0.5\nnonsense here\nbp1 2\nexit\nhp 9\n");

        run_control_loop(input, &gains, &shutdown);

        assert_eq!(gains.get(FilterId::LowPass), 0.5);
        assert_eq!(gains.get(FilterId::BandPass1), 2.0);
        // Lines after `exit` are never read.
        assert_eq!(gains.get(FilterId::HighPass), 0.0);
        assert!(shutdown.stop_requested());
    }

    #[test]
    fn loop_clears_all_gains_on_none() {
        let gains = GainVector::new();
        let shutdown = Shutdown::new();
        gains.set(FilterId::LowPass, 1.0);
        gains.set(FilterId::BandPass2, 3.0);

        run_control_loop(Cursor::new("\n\nnone\n"), &gains, &shutdown);

        for id in FilterId::ALL {
            assert_eq!(gains.get(id), 0.0);
        }
        assert!(!shutdown.stop_requested());
    }

    #[test]
    fn end_of_input_does_not_stop_playback() {
        let gains = GainVector::new();
        let shutdown = Shutdown::new();

        run_control_loop(Cursor::new("lp 1.0\n"), &gains, &shutdown);

        assert_eq!(gains.get(FilterId::LowPass), 1.0);
        assert!(!shutdown.stop_requested());
    }
}
