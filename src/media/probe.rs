//! FFprobe wrapper for media analysis.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::ProbeError;

/// Queries the properties the conversion pipeline depends on.
///
/// Calls block until the external probe finishes. Results are deterministic
/// for an unchanged file.
#[cfg_attr(test, mockall::automock)]
pub trait MediaProbe {
    /// Returns the total duration in whole seconds, truncated toward zero.
    fn duration(&self, path: &Path) -> Result<u64, ProbeError>;

    /// Returns the height of the first video stream.
    fn vertical_resolution(&self, path: &Path) -> Result<u32, ProbeError>;
}

/// What ffprobe reports about a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    /// Container duration in seconds, if the container reports one.
    pub duration: Option<f64>,
    /// Video streams in stream order.
    pub video_streams: Vec<VideoStream>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoStream {
    pub height: u32,
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    binary: PathBuf,
}

impl Ffprobe {
    /// Creates a probe that runs the given ffprobe binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Probes a media file and returns its duration and video streams.
    pub fn probe(&self, path: &Path) -> Result<ProbeResult, ProbeError> {
        let output = Command::new(&self.binary)
            .args([
                "-v", "error",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| ProbeError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(ProbeError::CommandFailed {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| ProbeError::ParseFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let result = parse_probe_output(&json, path)?;
        debug!(
            path = ?path,
            duration = ?result.duration,
            streams = result.video_streams.len(),
            "Probed media"
        );
        Ok(result)
    }
}

impl MediaProbe for Ffprobe {
    fn duration(&self, path: &Path) -> Result<u64, ProbeError> {
        let result = self.probe(path)?;
        whole_seconds(result.duration).ok_or_else(|| ProbeError::MissingDuration {
            path: path.to_path_buf(),
        })
    }

    fn vertical_resolution(&self, path: &Path) -> Result<u32, ProbeError> {
        let result = self.probe(path)?;
        result
            .video_streams
            .first()
            .map(|stream| stream.height)
            .ok_or_else(|| ProbeError::NoVideoStream {
                path: path.to_path_buf(),
            })
    }
}

/// Floors a fractional duration to whole seconds.
fn whole_seconds(duration: Option<f64>) -> Option<u64> {
    duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d.floor() as u64)
}

/// Parses ffprobe JSON output into structured data.
fn parse_probe_output(json: &serde_json::Value, path: &Path) -> Result<ProbeResult, ProbeError> {
    let format = json.get("format").ok_or_else(|| ProbeError::ParseFailed {
        path: path.to_path_buf(),
        message: "missing format in ffprobe output".to_string(),
    })?;
    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let duration = format
        .get("duration")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok());

    let video_streams = streams
        .iter()
        .filter(|stream| stream.get("codec_type").and_then(|v| v.as_str()) == Some("video"))
        .filter_map(parse_video_stream)
        .collect();

    Ok(ProbeResult {
        duration,
        video_streams,
    })
}

/// Parses a video stream from ffprobe JSON. Streams without a height
/// (attached pictures in some containers) are skipped.
fn parse_video_stream(stream: &serde_json::Value) -> Option<VideoStream> {
    let height = stream.get("height")?.as_u64()?;
    Some(VideoStream {
        height: u32::try_from(height).ok()?,
    })
}
