//! Semantic validation for configuration values.

use crate::config::model::AppConfig;
use crate::units::parse_magnitude;

use super::{ValidationIssue, ValidationResult};

/// Highest bitrate libopus accepts for a stereo stream.
const MAX_OPUS_STEREO_BITRATE: u64 = 510_000;

/// Validates semantic correctness of configuration values.
pub fn validate(config: &AppConfig) -> ValidationResult {
    let mut result = ValidationResult::new();
    let encoding = &config.encoding;

    validate_bitrate(&encoding.video_bitrate, "encoding.video_bitrate", &mut result);

    let audio = validate_bitrate(&encoding.audio_bitrate, "encoding.audio_bitrate", &mut result);
    if let Some(audio) = audio {
        if audio > MAX_OPUS_STEREO_BITRATE {
            result.add(
                ValidationIssue::warning(
                    "encoding.audio_bitrate",
                    format!("{} bits/s exceeds what libopus uses for stereo", audio),
                )
                .with_suggestion("Opus rarely benefits from more than 256K"),
            );
        }
    }

    if encoding.threads == Some(0) {
        result.add(ValidationIssue::error(
            "encoding.threads",
            "Threads must be at least 1",
        ));
    }

    if config.ffmpeg.as_os_str().is_empty() {
        result.add(ValidationIssue::error("ffmpeg", "ffmpeg path cannot be empty"));
    }

    if config.ffprobe.as_os_str().is_empty() {
        result.add(ValidationIssue::error("ffprobe", "ffprobe path cannot be empty"));
    }

    result
}

/// Checks that a bitrate magnitude parses and is positive.
fn validate_bitrate(value: &str, path: &str, result: &mut ValidationResult) -> Option<u64> {
    match parse_magnitude(value) {
        Ok(0) => {
            result.add(ValidationIssue::error(path, "Bitrate must be greater than zero"));
            None
        }
        Ok(bits) => Some(bits),
        Err(e) => {
            result.add(
                ValidationIssue::error(path, e.to_string())
                    .with_suggestion("Use a number with an optional K, M or G suffix, e.g. 128K"),
            );
            None
        }
    }
}
