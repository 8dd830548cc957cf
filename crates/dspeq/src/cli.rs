use std::path::PathBuf;

use clap::Parser;

pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

/// Play an audio file through a live-adjustable EQ filter mix.
///
/// While playing, commands on stdin steer the mix: `<filter> <gain>`
/// (filters: lowpass/highpass/bandpass1/bandpass2, or lp/hp/bp1/bp2),
/// `none` for passthrough, `exit` to quit.
#[derive(Parser, Debug)]
#[command(name = "dspeq", version = VERSION)]
pub struct Args {
    /// Path to the audio file to play
    #[arg(required_unless_present = "list_devices")]
    pub path: Option<PathBuf>,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Use a specific output device by substring match
    #[arg(long)]
    pub device: Option<String>,

    /// Callback period in frames (samples per channel per device callback)
    #[arg(long, default_value_t = 256)]
    pub frames: u32,

    /// Decode prebuffer target in seconds
    #[arg(long, default_value_t = 2.0)]
    pub buffer_seconds: f32,

    /// Skip zero-gain filters instead of running them to keep their state
    /// warm. Cheaper per sample, but re-enabling a filter mid-stream can
    /// produce a transient.
    #[arg(long)]
    pub skip_idle_filters: bool,
}
