//! Command-line interface definitions.

use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::media::{TimeWindow, Timestamp};
use crate::units::parse_magnitude;

/// Convert any media file to WebM (VP9/Opus), optionally downscaled, trimmed,
/// fitted to a file size, or split into size-capped parts.
#[derive(Parser, Debug)]
#[command(name = "vidfit", version, about, long_about = None)]
pub struct Cli {
    /// Media file to convert.
    pub input: PathBuf,

    /// Output height in pixels; the width follows the aspect ratio. Never upscales.
    #[arg(short = 'r', long, value_name = "HEIGHT")]
    pub resolution: Option<u32>,

    /// Video bitrate in bits/s (e.g. 800K, 2M). Ignored when --size fits a single file.
    #[arg(short = 'b', long, value_name = "BITRATE", value_parser = parse_magnitude)]
    pub video_bitrate: Option<u64>,

    /// Audio bitrate in bits/s (e.g. 128K).
    #[arg(short = 'a', long, value_name = "BITRATE", value_parser = parse_magnitude)]
    pub audio_bitrate: Option<u64>,

    /// Target output size in bytes (e.g. 8M); per file with --split.
    #[arg(short = 's', long, value_name = "BYTES", value_parser = parse_magnitude)]
    pub size: Option<u64>,

    /// Split the output into consecutive files of at most --size bytes.
    #[arg(long, requires = "size")]
    pub split: bool,

    /// Keep only the part between START and END ([[HH:]MM:]SS[.mmm]).
    #[arg(short = 'c', long, num_args = 2, value_names = ["START", "END"])]
    pub cut: Option<Vec<Timestamp>>,

    /// Directory for the output files.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Encoder threads.
    #[arg(short = 't', long, value_name = "N")]
    pub threads: Option<NonZeroUsize>,

    /// Increase logging verbosity and show ffmpeg output (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, env = "VIDFIT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Returns the log level based on verbosity flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Returns the cut window, if one was given.
    pub fn cut_window(&self) -> Option<TimeWindow> {
        match self.cut.as_deref() {
            Some([start, end]) => Some(TimeWindow::between(*start, *end)),
            _ => None,
        }
    }
}
