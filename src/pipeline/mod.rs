//! Conversion orchestration: trim, scale, size-fit, encode or split.

pub mod fit;
pub mod scale;
pub mod segment;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::encoder::{
    ffmpeg, EncodeJob, EncodeSettings, Encoder, FfmpegRunner, TwoPassEncoder, OUTPUT_EXTENSION,
};
use crate::error::PipelineError;
use crate::media::{MediaProbe, TimeWindow};

pub use fit::{fit_video_bitrate, VideoBitrate};
pub use scale::{resolve_scale, ScaleDecision};
pub use segment::{Segment, SegmentPlan, SegmentPlanner, SegmentState};

/// How the output is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One file; with a target size the bitrate is fitted to it.
    Single { target_size: Option<u64> },
    /// Consecutive files of at most `segment_size` bytes each.
    Split { segment_size: u64 },
}

/// A validated conversion request.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Source media.
    pub input: PathBuf,
    /// Directory receiving the outputs.
    pub output_dir: PathBuf,
    /// Requested output height.
    pub resolution: Option<u32>,
    /// User-specified video bitrate in bits/s.
    pub video_bitrate: Option<u64>,
    /// Video bitrate when neither a bitrate nor a size applies.
    pub default_video_bitrate: u64,
    /// Single file or split.
    pub mode: OutputMode,
    /// Part of the input to keep.
    pub cut: Option<TimeWindow>,
    /// Settings shared by every encode.
    pub settings: EncodeSettings,
}

/// A file produced by a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Measured duration, known for split segments.
    pub duration: Option<u64>,
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    pub outputs: Vec<OutputFile>,
}

impl ConversionReport {
    /// Returns the combined size of all outputs in bytes.
    pub fn total_size(&self) -> u64 {
        self.outputs.iter().map(|o| o.size_bytes).sum()
    }
}

/// Runs a conversion from start to finish.
///
/// Every intermediate file (trim output, pass logs) lives in `work_dir`,
/// which the caller owns and removes.
pub struct Converter<R, P> {
    encoder: TwoPassEncoder<R>,
    probe: P,
    work_dir: PathBuf,
}

impl<R, P> Converter<R, P>
where
    R: FfmpegRunner,
    P: MediaProbe,
{
    pub fn new(runner: R, probe: P, work_dir: &Path) -> Self {
        Self {
            encoder: TwoPassEncoder::new(runner, work_dir),
            probe,
            work_dir: work_dir.to_path_buf(),
        }
    }

    /// Converts `request.input` into one or more WebM files.
    pub async fn convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionReport, PipelineError> {
        let stem = output_stem(&request.input);

        // ffmpeg truncates its output before reading the input.
        let single_output = request
            .output_dir
            .join(format!("{}.{}", stem, OUTPUT_EXTENSION));
        if matches!(request.mode, OutputMode::Single { .. })
            && same_file(&request.input, &single_output)
        {
            return Err(PipelineError::OutputIsInput {
                path: single_output,
            });
        }

        let input = self.prepare_input(request).await?;
        let scale_height = self.scale_height(request, &input)?;

        match request.mode {
            OutputMode::Single { target_size } => {
                self.convert_single(request, input, single_output, scale_height, target_size)
                    .await
            }
            OutputMode::Split { segment_size } => {
                self.convert_split(request, input, stem, scale_height, segment_size)
                    .await
            }
        }
    }

    /// Trims the input when a cut is requested; returns the file to encode.
    async fn prepare_input(&self, request: &ConversionRequest) -> Result<PathBuf, PipelineError> {
        let Some(window) = &request.cut else {
            return Ok(request.input.clone());
        };

        let extension = request
            .input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mkv".to_string());
        let trimmed = self.work_dir.join(format!("trimmed.{}", extension));

        ffmpeg::trim(
            self.encoder.runner(),
            &request.input,
            window,
            &trimmed,
            request.settings.log_level(),
        )
        .await?;

        Ok(trimmed)
    }

    fn scale_height(
        &self,
        request: &ConversionRequest,
        input: &Path,
    ) -> Result<Option<u32>, PipelineError> {
        let Some(requested) = request.resolution else {
            return Ok(None);
        };

        let current = self.probe.vertical_resolution(input)?;
        let decision = resolve_scale(requested, current)?;
        if let ScaleDecision::AlreadyAtResolution(height) = decision {
            warn!(height, "Source is already at the requested resolution; not scaling");
        }

        Ok(decision.filter_height())
    }

    async fn convert_single(
        &self,
        request: &ConversionRequest,
        input: PathBuf,
        output: PathBuf,
        scale_height: Option<u32>,
        target_size: Option<u64>,
    ) -> Result<ConversionReport, PipelineError> {
        let fitted = match target_size {
            Some(size) => {
                let duration = self.probe.duration(&input)?;
                let bitrate = fit_video_bitrate(size, duration, request.settings.audio_bitrate)?;
                info!(
                    target_size = size,
                    duration,
                    video_bitrate = bitrate,
                    "Fitted video bitrate to target size"
                );
                Some(bitrate)
            }
            None => None,
        };

        let choice = VideoBitrate::resolve(
            request.video_bitrate,
            fitted,
            request.default_video_bitrate,
        );
        if let Some(discarded) = choice.discarded() {
            warn!(discarded, "Ignoring video bitrate; target size takes precedence");
        }
        let video_bitrate = choice.into_positive()?;

        let job = EncodeJob::new(input, output.clone(), video_bitrate, request.settings.clone())
            .with_scale(scale_height);

        self.encoder.encode(job).await?;

        let size_bytes = std::fs::metadata(&output)?.len();
        if let Some(target) = target_size {
            info!(target_size = target, actual_size = size_bytes, "Output written");
        }

        Ok(ConversionReport {
            outputs: vec![OutputFile {
                path: output,
                size_bytes,
                duration: None,
            }],
        })
    }

    async fn convert_split(
        &self,
        request: &ConversionRequest,
        input: PathBuf,
        stem: String,
        scale_height: Option<u32>,
        segment_size: u64,
    ) -> Result<ConversionReport, PipelineError> {
        let video_bitrate =
            VideoBitrate::resolve(request.video_bitrate, None, request.default_video_bitrate)
                .into_positive()?;

        let plan = SegmentPlan {
            input,
            output_dir: request.output_dir.clone(),
            stem,
            video_bitrate,
            segment_size,
            scale_height,
            settings: request.settings.clone(),
        };

        let segments = SegmentPlanner::new(&self.encoder, &self.probe).run(&plan).await?;

        let outputs = segments
            .into_iter()
            .map(|segment| {
                let size_bytes = std::fs::metadata(&segment.path)?.len();
                Ok(OutputFile {
                    path: segment.path,
                    size_bytes,
                    duration: Some(segment.duration),
                })
            })
            .collect::<Result<Vec<_>, std::io::Error>>()?;

        Ok(ConversionReport { outputs })
    }
}

/// Stem for output names, taken from the original (untrimmed) input.
fn output_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string())
}

/// True when both paths name the same existing file. `output` may not exist
/// yet, so its directory is resolved instead.
fn same_file(input: &Path, output: &Path) -> bool {
    let Ok(input) = input.canonicalize() else {
        return false;
    };
    let output = output.canonicalize().or_else(|_| {
        let dir = output
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = output.file_name().unwrap_or_default();
        dir.canonicalize().map(|dir| dir.join(name))
    });
    output.map_or(false, |output| output == input)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::encoder::ffmpeg::{CommandOutcome, MockFfmpegRunner};
    use crate::error::ProbeError;
    use crate::media::probe::MockMediaProbe;
    use crate::media::Timestamp;

    fn settings() -> EncodeSettings {
        EncodeSettings {
            audio_bitrate: 128_000,
            threads: 4,
            deadline: "good".to_string(),
            verbose: false,
        }
    }

    fn request(out: &Path, mode: OutputMode) -> ConversionRequest {
        ConversionRequest {
            input: PathBuf::from("/media/holiday.mov"),
            output_dir: out.to_path_buf(),
            resolution: None,
            video_bitrate: None,
            default_video_bitrate: 1_000_000,
            mode,
            cut: None,
            settings: settings(),
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

    /// Runner that records every invocation and writes pass 2 outputs.
    fn recording_runner(calls: Arc<Mutex<Vec<Vec<String>>>>) -> MockFfmpegRunner {
        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().returning(move |args| {
            let args = strings(&args);
            if value_after(&args, "-pass").as_deref() == Some("2") {
                std::fs::write(args.last().unwrap(), vec![0u8; 1024]).unwrap();
            }
            calls.lock().unwrap().push(args);
            Ok(CommandOutcome {
                code: Some(0),
                stderr: String::new(),
            })
        });
        runner
    }

    #[tokio::test]
    async fn single_mode_fits_bitrate_to_size() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut probe = MockMediaProbe::new();
        probe.expect_duration().times(1).returning(|_| Ok(60));

        let mut req = request(out.path(), OutputMode::Single { target_size: Some(5_000_000) });
        req.video_bitrate = Some(2_000_000);

        let converter = Converter::new(recording_runner(calls.clone()), probe, work.path());
        let report = converter.convert(&req).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        for args in calls.iter() {
            assert_eq!(value_after(args, "-b:v").as_deref(), Some("538667"));
            assert_eq!(value_after(args, "-i").as_deref(), Some("/media/holiday.mov"));
        }
        assert_eq!(report.outputs.len(), 1);
        assert_eq!(report.outputs[0].path, out.path().join("holiday.webm"));
        assert_eq!(report.outputs[0].size_bytes, 1024);
    }

    #[tokio::test]
    async fn single_mode_without_size_uses_fixed_bitrate() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut probe = MockMediaProbe::new();
        probe.expect_duration().times(0);

        let mut req = request(out.path(), OutputMode::Single { target_size: None });
        req.video_bitrate = Some(750_000);

        let converter = Converter::new(recording_runner(calls.clone()), probe, work.path());
        converter.convert(&req).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(value_after(&calls[0], "-b:v").as_deref(), Some("750000"));
    }

    #[tokio::test]
    async fn budget_below_audio_is_refused_before_encoding() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().times(0);
        let mut probe = MockMediaProbe::new();
        probe.expect_duration().returning(|_| Ok(600));

        let req = request(out.path(), OutputMode::Single { target_size: Some(100_000) });
        let err = Converter::new(runner, probe, work.path())
            .convert(&req)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::NonPositiveBitrate { bitrate } if bitrate < 0));
    }

    #[tokio::test]
    async fn zero_duration_source_cannot_be_size_fitted() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().times(0);
        let mut probe = MockMediaProbe::new();
        probe.expect_duration().returning(|_| Ok(0));

        let req = request(out.path(), OutputMode::Single { target_size: Some(1_000_000) });
        let err = Converter::new(runner, probe, work.path())
            .convert(&req)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Fit(crate::error::FitError::ZeroDuration)));
    }

    #[tokio::test]
    async fn upscale_is_rejected_before_encoding() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().times(0);
        let mut probe = MockMediaProbe::new();
        probe.expect_vertical_resolution().returning(|_| Ok(720));

        let mut req = request(out.path(), OutputMode::Single { target_size: None });
        req.resolution = Some(1080);

        let err = Converter::new(runner, probe, work.path())
            .convert(&req)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Upscale { requested: 1080, current: 720 }));
    }

    #[tokio::test]
    async fn equal_resolution_encodes_without_filter() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut probe = MockMediaProbe::new();
        probe.expect_vertical_resolution().returning(|_| Ok(720));

        let mut req = request(out.path(), OutputMode::Single { target_size: None });
        req.resolution = Some(720);

        Converter::new(recording_runner(calls.clone()), probe, work.path())
            .convert(&req)
            .await
            .unwrap();

        assert!(calls.lock().unwrap().iter().all(|args| !args.contains(&"-vf".to_string())));
    }

    #[tokio::test]
    async fn cut_trims_into_work_dir_first() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut probe = MockMediaProbe::new();
        probe.expect_vertical_resolution().returning(|p| {
            assert!(p.ends_with("trimmed.mov"), "resolution must be probed on the trimmed file");
            Ok(1080)
        });

        let mut req = request(out.path(), OutputMode::Single { target_size: None });
        req.cut = Some(TimeWindow::between(Timestamp::from_secs(30), Timestamp::from_secs(90)));
        req.resolution = Some(480);

        let report = Converter::new(recording_runner(calls.clone()), probe, work.path())
            .convert(&req)
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        let trimmed = work.path().join("trimmed.mov").to_string_lossy().into_owned();
        assert_eq!(calls.len(), 3);
        assert_eq!(value_after(&calls[0], "-c").as_deref(), Some("copy"));
        assert_eq!(calls[0].last(), Some(&trimmed));
        for args in &calls[1..] {
            assert_eq!(value_after(args, "-i"), Some(trimmed.clone()));
            assert_eq!(value_after(args, "-vf").as_deref(), Some("scale=-2:480"));
            assert!(!args.contains(&"-ss".to_string()));
        }
        assert_eq!(report.outputs[0].path, out.path().join("holiday.webm"));
    }

    #[tokio::test]
    async fn split_mode_writes_indexed_segments() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let input = Path::new("/media/holiday.mov");
        let mut probe = MockMediaProbe::new();
        probe
            .expect_duration()
            .withf(move |p| p == input)
            .returning(|_| Ok(50));
        probe
            .expect_duration()
            .withf(move |p| p != input)
            .returning(|_| Ok(25));

        let req = request(out.path(), OutputMode::Split { segment_size: 500_000 });
        let report = Converter::new(recording_runner(calls.clone()), probe, work.path())
            .convert(&req)
            .await
            .unwrap();

        let paths: Vec<PathBuf> = report.outputs.iter().map(|o| o.path.clone()).collect();
        assert_eq!(paths, [out.path().join("holiday_1.webm"), out.path().join("holiday_2.webm")]);
        assert_eq!(report.total_size(), 2048);
        assert!(report.outputs.iter().all(|o| o.duration == Some(25)));

        let calls = calls.lock().unwrap();
        assert_eq!(value_after(&calls[3], "-ss").as_deref(), Some("25"));
        assert_eq!(value_after(&calls[3], "-fs").as_deref(), Some("500000"));
        assert_eq!(value_after(&calls[3], "-b:v").as_deref(), Some("1000000"));
    }

    #[tokio::test]
    async fn probe_errors_surface_unchanged() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().times(0);
        let mut probe = MockMediaProbe::new();
        probe
            .expect_duration()
            .returning(|p| Err(ProbeError::MissingDuration { path: p.to_path_buf() }));

        let req = request(out.path(), OutputMode::Split { segment_size: 500_000 });
        let err = Converter::new(runner, probe, work.path())
            .convert(&req)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Probe(_)));
    }

    #[tokio::test]
    async fn refuses_to_overwrite_the_input() {
        let work = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let source = media.path().join("clip.webm");
        std::fs::write(&source, b"ORIGINAL SOURCE").unwrap();

        let mut runner = MockFfmpegRunner::new();
        runner.expect_run().times(0);
        let probe = MockMediaProbe::new();

        // Same file reached through a different spelling of the path.
        let mut req = request(media.path(), OutputMode::Single { target_size: None });
        req.input = media.path().join(".").join("clip.webm");

        let err = Converter::new(runner, probe, work.path())
            .convert(&req)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::OutputIsInput { ref path } if path == &source));
        assert_eq!(std::fs::read(&source).unwrap(), b"ORIGINAL SOURCE");
    }

    #[tokio::test]
    async fn split_mode_may_share_the_input_directory() {
        let work = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let source = media.path().join("clip.webm");
        std::fs::write(&source, b"ORIGINAL SOURCE").unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut probe = MockMediaProbe::new();
        probe.expect_duration().returning(|_| Ok(10));

        let mut req = request(media.path(), OutputMode::Split { segment_size: 500_000 });
        req.input = source.clone();

        let report = Converter::new(recording_runner(calls), probe, work.path())
            .convert(&req)
            .await
            .unwrap();

        assert_eq!(report.outputs[0].path, media.path().join("clip_1.webm"));
        assert_eq!(std::fs::read(&source).unwrap(), b"ORIGINAL SOURCE");
    }

    #[test]
    fn same_file_resolves_missing_outputs_through_their_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.webm");
        std::fs::write(&input, b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        assert!(same_file(&input, &dir.path().join("sub/../a.webm")));
        assert!(!same_file(&input, &dir.path().join("sub/a.webm")));
        assert!(!same_file(&input, &dir.path().join("b.webm")));
        assert!(!same_file(&dir.path().join("missing.webm"), &input));
    }

    #[test]
    fn stem_comes_from_file_name() {
        assert_eq!(output_stem(Path::new("/a/b/trip.final.mp4")), "trip.final");
        assert_eq!(output_stem(Path::new("/")), "output");
    }
}
