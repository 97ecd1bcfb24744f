//! Configuration data structures.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure. Every field has a default, so an empty
/// file (or no file) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// ffmpeg binary name or path.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,

    /// ffprobe binary name or path.
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,

    /// Default output directory; the working directory when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Encoding defaults.
    #[serde(default)]
    pub encoding: EncodingDefaults,
}

/// Encoding defaults applied when the command line does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingDefaults {
    /// Video bitrate magnitude (e.g. "1M") used without a size target.
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,

    /// Audio bitrate magnitude (e.g. "128K").
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// libvpx quality preset.
    #[serde(default)]
    pub deadline: Deadline,

    /// Encoder threads; all available cores when unset.
    #[serde(default)]
    pub threads: Option<usize>,
}

/// libvpx `-deadline` presets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Deadline {
    /// Balanced speed and quality.
    #[default]
    Good,
    /// Slowest, highest quality.
    Best,
    /// Fastest.
    Realtime,
}

impl std::fmt::Display for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Best => write!(f, "best"),
            Self::Realtime => write!(f, "realtime"),
        }
    }
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_video_bitrate() -> String {
    "1M".to_string()
}

fn default_audio_bitrate() -> String {
    "128K".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            output_dir: None,
            encoding: EncodingDefaults::default(),
        }
    }
}

impl Default for EncodingDefaults {
    fn default() -> Self {
        Self {
            video_bitrate: default_video_bitrate(),
            audio_bitrate: default_audio_bitrate(),
            deadline: Deadline::default(),
            threads: None,
        }
    }
}
