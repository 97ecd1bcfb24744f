//! Encoding job definitions.

use std::path::PathBuf;

use crate::media::TimeWindow;

/// Video codec for every output.
pub const VIDEO_CODEC: &str = "libvpx-vp9";

/// Audio codec for every output.
pub const AUDIO_CODEC: &str = "libopus";

/// Extension (and container) of every output.
pub const OUTPUT_EXTENSION: &str = "webm";

/// Settings shared by every job of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    /// Audio bitrate in bits per second.
    pub audio_bitrate: u64,
    /// Worker threads forwarded to the encoder.
    pub threads: usize,
    /// libvpx quality preset (`good`, `best`, `realtime`).
    pub deadline: String,
    /// Whether encoder output is shown to the user.
    pub verbose: bool,
}

impl EncodeSettings {
    /// Returns the ffmpeg `-loglevel` matching the verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "info"
        } else {
            "error"
        }
    }
}

/// A single encode: one input, one output, one bitrate.
///
/// Jobs are built once and handed to an encoder by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeJob {
    /// Path to the source file.
    pub input_path: PathBuf,

    /// Path for the encoded output.
    pub output_path: PathBuf,

    /// Video bitrate in bits per second.
    pub video_bitrate: u64,

    /// Portion of the input to encode; `None` encodes all of it.
    pub window: Option<TimeWindow>,

    /// Target height; `None` keeps the source resolution.
    pub scale_height: Option<u32>,

    /// Hard cap on the output size in bytes.
    pub max_file_size: Option<u64>,

    /// Invocation-wide settings.
    pub settings: EncodeSettings,
}

impl EncodeJob {
    /// Creates a job that encodes the whole input at the given bitrate.
    pub fn new(
        input_path: PathBuf,
        output_path: PathBuf,
        video_bitrate: u64,
        settings: EncodeSettings,
    ) -> Self {
        Self {
            input_path,
            output_path,
            video_bitrate,
            window: None,
            scale_height: None,
            max_file_size: None,
            settings,
        }
    }

    /// Restricts the job to part of the input.
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Scales the output to the given height.
    pub fn with_scale(mut self, height: Option<u32>) -> Self {
        self.scale_height = height;
        self
    }

    /// Stops writing once the output reaches `bytes`.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }
}
