//! Configuration, invocation and system validation.

pub mod paths;
pub mod report;
pub mod semantic;

use std::collections::HashSet;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::model::AppConfig;
use crate::encoder::job::{AUDIO_CODEC, VIDEO_CODEC};
use crate::error::CapabilityError;

/// Whether an issue stops the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

/// One problem with a config field or command-line argument.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    /// Offending field, e.g. `encoding.audio_bitrate` or `--output-dir`.
    pub path: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    fn new(
        severity: ValidationSeverity,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ValidationSeverity::Error, path, message)
    }

    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ValidationSeverity::Warning, path, message)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            ValidationSeverity::Error => "error",
            ValidationSeverity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", label, self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (hint: {})", suggestion)?;
        }
        Ok(())
    }
}

/// Issues gathered by one validation pass. Warnings never fail the run.
#[derive(Debug, Default)]
pub struct ValidationResult {
    issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(ValidationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.with_severity(ValidationSeverity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    fn with_severity(
        &self,
        severity: ValidationSeverity,
    ) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }
}

/// External tools detected at startup.
#[derive(Debug, Clone)]
pub struct SystemCapabilities {
    /// Encoders compiled into ffmpeg.
    pub available_encoders: HashSet<String>,
}

impl SystemCapabilities {
    /// Checks that ffprobe runs and that ffmpeg has the codecs vidfit needs.
    pub fn detect(ffmpeg: &Path, ffprobe: &Path) -> Result<Self, CapabilityError> {
        run_tool(ffprobe, &["-hide_banner", "-version"])?;
        let encoders = run_tool(ffmpeg, &["-hide_banner", "-encoders"])?;

        let capabilities = Self {
            available_encoders: parse_ffmpeg_codec_list(&encoders),
        };
        capabilities.require_encoders(&[VIDEO_CODEC, AUDIO_CODEC])?;

        Ok(capabilities)
    }

    /// Fails on the first encoder ffmpeg does not provide.
    pub fn require_encoders(&self, encoders: &[&str]) -> Result<(), CapabilityError> {
        for encoder in encoders {
            if !self.available_encoders.contains(*encoder) {
                return Err(CapabilityError::EncoderMissing {
                    encoder: encoder.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Runs a tool and returns its stdout.
fn run_tool(binary: &Path, args: &[&str]) -> Result<String, CapabilityError> {
    let command = format!("{} {}", binary.display(), args.join(" "));

    let output = std::process::Command::new(binary)
        .args(args)
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => CapabilityError::ToolNotFound {
                tool: binary.display().to_string(),
            },
            _ => CapabilityError::CommandFailed {
                command: command.clone(),
                message: e.to_string(),
            },
        })?;

    if !output.status.success() {
        return Err(CapabilityError::CommandFailed {
            command,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Parses `ffmpeg -encoders` output into a set of codec names.
fn parse_ffmpeg_codec_list(output: &str) -> HashSet<String> {
    // Lines look like: " V....D libvpx-vp9           libvpx VP9 (codec vp9)"
    // and follow a legend terminated by a " ------" line.
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// Validates the configuration values.
pub fn validate_config(config: &AppConfig) -> ValidationResult {
    semantic::validate(config)
}
