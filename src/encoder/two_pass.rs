//! Two-pass encoding driven through an [`FfmpegRunner`].

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use super::ffmpeg::{pass_args, FfmpegRunner, Pass};
use super::job::EncodeJob;
use super::pass_log::PassLog;
use crate::error::EncoderError;

/// Turns an [`EncodeJob`] into an output file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, job: EncodeJob) -> Result<(), EncoderError>;
}

/// Encodes in two passes so the output honors the job's bitrate.
///
/// Pass 1 writes statistics to a private [`PassLog`] and discards its video;
/// pass 2 reads them and writes the real file. The log is deleted whichever
/// way the job ends, including when the future is dropped mid-encode. A failed
/// pass 2 may leave a partial output behind.
pub struct TwoPassEncoder<R> {
    runner: R,
    log_dir: PathBuf,
}

impl<R: FfmpegRunner> TwoPassEncoder<R> {
    /// Creates an encoder that keeps pass logs in `log_dir`.
    pub fn new(runner: R, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            log_dir: log_dir.into(),
        }
    }

    /// Returns the underlying ffmpeg runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn run_pass(
        &self,
        job: &EncodeJob,
        pass: Pass,
        log: &PassLog,
    ) -> Result<(), EncoderError> {
        debug!(pass = pass.number(), output = ?job.output_path, "Starting encode pass");

        let outcome = self.runner.run(pass_args(job, pass, &log.prefix())).await?;
        if !outcome.success() {
            return Err(EncoderError::PassFailed {
                pass: pass.number(),
                code: outcome.exit_code(),
                stderr: outcome.stderr,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl<R: FfmpegRunner> Encoder for TwoPassEncoder<R> {
    async fn encode(&self, job: EncodeJob) -> Result<(), EncoderError> {
        let log = PassLog::acquire(&self.log_dir)?;

        info!(
            input = ?job.input_path,
            output = ?job.output_path,
            video_bitrate = job.video_bitrate,
            scale = ?job.scale_height,
            "Starting two-pass encode"
        );

        self.run_pass(&job, Pass::Analysis, &log).await?;
        self.run_pass(&job, Pass::Final, &log).await?;
        drop(log);

        info!(output = ?job.output_path, "Two-pass encode completed");
        Ok(())
    }
}
