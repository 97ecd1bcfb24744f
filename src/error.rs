//! Error types for vidfit.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while merging arguments with configuration.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Unit(#[from] UnitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Config validation failed with {error_count} error(s)")]
    ValidationFailed { error_count: usize },
}

/// Invocation validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Validation failed with {error_count} error(s)")]
    Failed { error_count: usize },
}

/// Magnitude parsing errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UnitError {
    #[error("Invalid magnitude '{value}': expected <number>[K|M|G]")]
    InvalidMagnitude { value: String },
}

/// Media probing errors.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run ffprobe: {0}")]
    SpawnFailed(String),

    #[error("ffprobe failed on '{path}': {stderr}")]
    CommandFailed { path: PathBuf, stderr: String },

    #[error("Failed to parse ffprobe output for '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("No duration metadata in '{path}'")]
    MissingDuration { path: PathBuf },

    #[error("No video stream in '{path}'")]
    NoVideoStream { path: PathBuf },
}

/// Bitrate fitting errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FitError {
    #[error("Cannot fit a target size to a zero-length source")]
    ZeroDuration,
}

/// Encoding operation errors.
#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("Process spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Encode pass {pass} failed with exit code {code}: {stderr}")]
    PassFailed { pass: u8, code: i32, stderr: String },

    #[error("Trim failed with exit code {code}: {stderr}")]
    TrimFailed { code: i32, stderr: String },

    #[error("Failed to prepare pass log: {0}")]
    PassLog(#[source] std::io::Error),
}

/// Conversion pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot upscale: requested {requested}p but the source is {current}p")]
    Upscale { requested: u32, current: u32 },

    #[error("Target size leaves {bitrate} bits/s for video; raise the size or lower audio")]
    NonPositiveBitrate { bitrate: i64 },

    #[error("Segment {index} failed: {source}")]
    SegmentFailed {
        index: u32,
        #[source]
        source: EncoderError,
    },

    #[error("Segment {index} ('{path}') measured zero seconds; splitting cannot make progress")]
    StalledSegment { index: u32, path: PathBuf },

    #[error("Output '{path}' is the input file; choose another --output-dir")]
    OutputIsInput { path: PathBuf },

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability detection errors.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Failed to run '{command}': {message}")]
    CommandFailed { command: String, message: String },

    #[error("Required tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    #[error("ffmpeg was built without the '{encoder}' encoder")]
    EncoderMissing { encoder: String },
}
