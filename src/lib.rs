//! vidfit - convert media to WebM with size targeting and splitting.
//!
//! The heavy lifting happens in [`pipeline`]: bitrate fitting from a target
//! size, two-pass encoding through ffmpeg, and split mode that measures each
//! written segment to decide where the next one starts.

pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod units;
pub mod validation;

use std::future::Future;

use anyhow::{anyhow, Context, Result};
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::encoder::{EncodeSettings, FfmpegCommand};
use crate::error::{AppError, ValidationError};
use crate::media::Ffprobe;
use crate::pipeline::{ConversionRequest, Converter, OutputMode};
use crate::units::parse_magnitude;
use crate::validation::{paths, report, SystemCapabilities};

/// Runs one conversion with the provided CLI arguments.
pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.log_level(), cli.log_json)?;

    let config = config::load_and_validate(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let request = build_request(&cli, &config)?;

    let result =
        paths::validate_invocation(&request.input, &request.output_dir, request.cut.as_ref());
    for issue in result.warnings() {
        warn!(path = %issue.path, message = %issue.message, "Validation warning");
    }
    if !result.is_valid() {
        error!("{}", report::format_report(&result));
        return Err(ValidationError::Failed {
            error_count: result.error_count(),
        }
        .into());
    }

    let capabilities = SystemCapabilities::detect(&config.ffmpeg, &config.ffprobe)?;
    info!(encoders = capabilities.available_encoders.len(), "Detected ffmpeg");

    // Holds the trim output and pass logs; removed on every exit path.
    let work_dir = tempfile::Builder::new()
        .prefix("vidfit-")
        .tempdir()
        .context("Failed to create temporary directory")?;

    let converter = Converter::new(
        FfmpegCommand::new(&config.ffmpeg, cli.verbose > 0),
        Ffprobe::new(&config.ffprobe),
        work_dir.path(),
    );

    info!(
        input = ?request.input,
        output_dir = ?request.output_dir,
        mode = ?request.mode,
        "Starting conversion"
    );

    let outcome = until_interrupted(converter.convert(&request), tokio::signal::ctrl_c()).await??;

    for output in &outcome.outputs {
        println!("{}\t{} bytes", output.path.display(), output.size_bytes);
    }
    info!(files = outcome.outputs.len(), total_size = outcome.total_size(), "Conversion complete");

    work_dir.close().context("Failed to remove temporary directory")?;
    Ok(())
}

/// Drives `work` to completion unless `interrupt` resolves first.
///
/// `interrupt` is polled first, so a signal handler behind it is installed
/// before `work` gets a chance to block. Dropping `work` releases whatever it
/// holds.
async fn until_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = interrupt => {
            warn!("Interrupted, cleaning up");
            Err(anyhow!("interrupted"))
        }
        output = work => Ok(output),
    }
}

/// Initializes the tracing subscriber. Logs go to stderr; stdout carries results.
fn setup_logging(level: &str, json: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .try_init()
    } else {
        builder.with_target(false).try_init()
    }
    .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Merges command-line arguments over configuration defaults.
fn build_request(cli: &Cli, config: &AppConfig) -> Result<ConversionRequest, AppError> {
    let encoding = &config.encoding;

    let audio_bitrate = match cli.audio_bitrate {
        Some(bits) => bits,
        None => parse_magnitude(&encoding.audio_bitrate)?,
    };
    let default_video_bitrate = parse_magnitude(&encoding.video_bitrate)?;

    // clap enforces that --split comes with --size.
    let mode = match (cli.split, cli.size) {
        (true, Some(segment_size)) => OutputMode::Split { segment_size },
        _ => OutputMode::Single {
            target_size: cli.size,
        },
    };

    let output_dir = match cli.output_dir.as_ref().or(config.output_dir.as_ref()) {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let threads = cli
        .threads
        .map(|n| n.get())
        .or(encoding.threads)
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));

    Ok(ConversionRequest {
        input: cli.input.clone(),
        output_dir,
        resolution: cli.resolution,
        video_bitrate: cli.video_bitrate,
        default_video_bitrate,
        mode,
        cut: cli.cut_window(),
        settings: EncodeSettings {
            audio_bitrate,
            threads,
            deadline: encoding.deadline.to_string(),
            verbose: cli.verbose > 0,
        },
    })
}
