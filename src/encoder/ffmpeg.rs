//! FFmpeg subprocess wrapper and argument builders.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::job::{EncodeJob, AUDIO_CODEC, VIDEO_CODEC};
use crate::error::EncoderError;
use crate::media::TimeWindow;

/// Exit status and captured diagnostics of one ffmpeg run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured stderr (empty when stderr was passed through).
    pub stderr: String,
}

impl CommandOutcome {
    /// Returns true if ffmpeg exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns the exit code, or -1 for signal termination.
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(-1)
    }
}

/// Runs a single ffmpeg invocation to completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FfmpegRunner: Send + Sync {
    async fn run(&self, args: Vec<OsString>) -> Result<CommandOutcome, EncoderError>;
}

/// [`FfmpegRunner`] that spawns the real ffmpeg binary.
///
/// The child is killed if the returned future is dropped.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    binary: PathBuf,
    verbose: bool,
}

impl FfmpegCommand {
    /// Creates a runner for the given ffmpeg binary.
    pub fn new(binary: impl Into<PathBuf>, verbose: bool) -> Self {
        Self {
            binary: binary.into(),
            verbose,
        }
    }
}

#[async_trait]
impl FfmpegRunner for FfmpegCommand {
    async fn run(&self, args: Vec<OsString>) -> Result<CommandOutcome, EncoderError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(if self.verbose {
            Stdio::inherit()
        } else {
            Stdio::piped()
        });
        cmd.kill_on_drop(true);

        debug!(cmd = ?cmd, "Running FFmpeg");

        let output = cmd
            .output()
            .await
            .map_err(|e| EncoderError::SpawnFailed(e.to_string()))?;

        Ok(CommandOutcome {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// The two stages of a two-pass encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Statistics gathering; output is discarded.
    Analysis,
    /// Real encode using the statistics.
    Final,
}

impl Pass {
    /// Returns ffmpeg's pass number.
    pub fn number(self) -> u8 {
        match self {
            Self::Analysis => 1,
            Self::Final => 2,
        }
    }
}

/// Builds the ffmpeg arguments for one pass of `job`.
pub fn pass_args(job: &EncodeJob, pass: Pass, pass_log: &Path) -> Vec<OsString> {
    let mut args = shared_args(job, pass_log);

    args.push("-pass".into());
    args.push(pass.number().to_string().into());

    match pass {
        Pass::Analysis => {
            args.push("-an".into());
            args.push("-f".into());
            args.push("null".into());
            args.push("-".into());
        }
        Pass::Final => {
            if let Some(max) = job.max_file_size {
                args.push("-fs".into());
                args.push(max.to_string().into());
            }
            args.push(job.output_path.clone().into());
        }
    }

    args
}

/// Arguments identical for both passes of a job.
fn shared_args(job: &EncodeJob, pass_log: &Path) -> Vec<OsString> {
    let settings = &job.settings;
    let mut args: Vec<OsString> = [
        "-hide_banner",
        "-nostdin",
        "-y",
        "-loglevel",
        settings.log_level(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    if let Some(window) = &job.window {
        push_window(&mut args, window);
    }
    args.push("-i".into());
    args.push(job.input_path.clone().into());

    args.push("-threads".into());
    args.push(settings.threads.to_string().into());

    args.push("-c:v".into());
    args.push(VIDEO_CODEC.into());
    args.push("-b:v".into());
    args.push(job.video_bitrate.to_string().into());
    args.push("-deadline".into());
    args.push(settings.deadline.clone().into());

    if let Some(height) = job.scale_height {
        args.push("-vf".into());
        args.push(format!("scale=-2:{}", height).into());
    }

    args.push("-c:a".into());
    args.push(AUDIO_CODEC.into());
    args.push("-b:a".into());
    args.push(settings.audio_bitrate.to_string().into());

    args.push("-passlogfile".into());
    args.push(pass_log.into());

    args
}

/// Input-side seeking, so both passes see the same frames.
fn push_window(args: &mut Vec<OsString>, window: &TimeWindow) {
    args.push("-ss".into());
    args.push(window.start.to_string().into());
    if let Some(end) = window.end {
        args.push("-to".into());
        args.push(end.to_string().into());
    }
}

/// Copies the `window` portion of `input` into `output` without re-encoding.
pub async fn trim<R: FfmpegRunner + ?Sized>(
    runner: &R,
    input: &Path,
    window: &TimeWindow,
    output: &Path,
    log_level: &str,
) -> Result<(), EncoderError> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-loglevel", log_level]
        .into_iter()
        .map(OsString::from)
        .collect();
    push_window(&mut args, window);
    args.push("-i".into());
    args.push(input.into());
    args.push("-c".into());
    args.push("copy".into());
    args.push(output.into());

    info!(
        input = ?input,
        start = %window.start,
        end = ?window.end.map(|e| e.to_string()),
        "Trimming input"
    );

    let outcome = runner.run(args).await?;
    if !outcome.success() {
        return Err(EncoderError::TrimFailed {
            code: outcome.exit_code(),
            stderr: outcome.stderr,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::job::EncodeSettings;
    use crate::media::Timestamp;

    fn settings() -> EncodeSettings {
        EncodeSettings {
            audio_bitrate: 128_000,
            threads: 8,
            deadline: "good".to_string(),
            verbose: false,
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn value_after(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    }

    #[test]
    fn analysis_pass_discards_output_and_audio() {
        let job = EncodeJob::new("in.mp4".into(), "out.webm".into(), 538_667, settings());
        let args = strings(&pass_args(&job, Pass::Analysis, Path::new("/tmp/log")));

        assert_eq!(value_after(&args, "-pass").as_deref(), Some("1"));
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(&args[args.len() - 3..], ["-f", "null", "-"]);
        assert!(!args.contains(&"out.webm".to_string()));
    }

    #[test]
    fn final_pass_writes_output_with_size_cap() {
        let job = EncodeJob::new("in.mp4".into(), "out.webm".into(), 1_000_000, settings())
            .with_max_file_size(500_000);
        let args = strings(&pass_args(&job, Pass::Final, Path::new("/tmp/log")));

        assert_eq!(value_after(&args, "-pass").as_deref(), Some("2"));
        assert_eq!(value_after(&args, "-fs").as_deref(), Some("500000"));
        assert_eq!(args.last().map(String::as_str), Some("out.webm"));
        assert!(!args.contains(&"-an".to_string()));
    }

    #[test]
    fn both_passes_share_job_arguments() {
        let job = EncodeJob::new("in.mp4".into(), "out.webm".into(), 750_000, settings())
            .with_window(TimeWindow::starting_at(Timestamp::from_secs(25)))
            .with_scale(Some(480));
        let log = Path::new("/tmp/passlog-abc");
        let first = strings(&pass_args(&job, Pass::Analysis, log));
        let second = strings(&pass_args(&job, Pass::Final, log));

        for args in [&first, &second] {
            assert_eq!(value_after(args, "-ss").as_deref(), Some("25"));
            assert_eq!(value_after(args, "-i").as_deref(), Some("in.mp4"));
            assert_eq!(value_after(args, "-threads").as_deref(), Some("8"));
            assert_eq!(value_after(args, "-c:v").as_deref(), Some(VIDEO_CODEC));
            assert_eq!(value_after(args, "-b:v").as_deref(), Some("750000"));
            assert_eq!(value_after(args, "-vf").as_deref(), Some("scale=-2:480"));
            assert_eq!(value_after(args, "-passlogfile").as_deref(), Some("/tmp/passlog-abc"));
            assert!(!args.contains(&"-to".to_string()));
        }

        let ss = first.iter().position(|a| a == "-ss").unwrap();
        let input = first.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input, "seek must be an input option");
    }

    #[test]
    fn no_scale_filter_without_height() {
        let job = EncodeJob::new("in.mp4".into(), "out.webm".into(), 1, settings());
        let args = strings(&pass_args(&job, Pass::Final, Path::new("log")));
        assert!(!args.contains(&"-vf".to_string()));
        assert!(!args.contains(&"-fs".to_string()));
    }

    #[tokio::test]
    async fn trim_copies_streams_for_window() {
        let mut runner = MockFfmpegRunner::new();
        runner
            .expect_run()
            .withf(|args| {
                let args = strings(args);
                value_after(&args, "-ss").as_deref() == Some("10")
                    && value_after(&args, "-to").as_deref() == Some("70.500")
                    && value_after(&args, "-c").as_deref() == Some("copy")
                    && args.last().map(String::as_str) == Some("/tmp/trimmed.mkv")
            })
            .times(1)
            .returning(|_| Ok(CommandOutcome { code: Some(0), stderr: String::new() }));

        let window = TimeWindow::between(Timestamp::from_secs(10), Timestamp::from_millis(70_500));
        trim(&runner, Path::new("in.mkv"), &window, Path::new("/tmp/trimmed.mkv"), "error")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn trim_failure_is_reported() {
        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().returning(|_| {
            Ok(CommandOutcome {
                code: Some(1),
                stderr: "Invalid data found".to_string(),
            })
        });

        let window = TimeWindow::between(Timestamp::from_secs(0), Timestamp::from_secs(5));
        let err = trim(&runner, Path::new("in.mkv"), &window, Path::new("out.mkv"), "error")
            .await
            .unwrap_err();
        assert!(matches!(err, EncoderError::TrimFailed { code: 1, .. }));
    }
}
