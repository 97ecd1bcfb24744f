//! Split mode: consecutive size-capped segments that together cover the input.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::encoder::{EncodeJob, EncodeSettings, Encoder, OUTPUT_EXTENSION};
use crate::error::PipelineError;
use crate::media::{MediaProbe, TimeWindow, Timestamp};

/// Position of the planner on the input timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentState {
    /// Seconds of input already covered by finished segments.
    pub cursor: u64,
    /// Ordinal of the next segment, starting at 1.
    pub index: u32,
}

impl SegmentState {
    /// Returns the state before the first segment.
    pub fn new() -> Self {
        Self {
            cursor: 0,
            index: 1,
        }
    }

    /// Returns true once the cursor has reached the end of the input.
    pub fn is_done(&self, total_duration: u64) -> bool {
        self.cursor >= total_duration
    }

    /// Records a finished segment of `measured` seconds.
    pub fn advance(&mut self, measured: u64) {
        self.cursor += measured;
        self.index += 1;
    }
}

impl Default for SegmentState {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything needed to build each segment's job.
#[derive(Debug, Clone)]
pub struct SegmentPlan {
    /// Input to split.
    pub input: PathBuf,
    /// Directory for the segment files.
    pub output_dir: PathBuf,
    /// File stem shared by all segments.
    pub stem: String,
    /// Video bitrate for every segment.
    pub video_bitrate: u64,
    /// Size cap of each segment in bytes.
    pub segment_size: u64,
    /// Optional output height.
    pub scale_height: Option<u32>,
    /// Invocation-wide encode settings.
    pub settings: EncodeSettings,
}

impl SegmentPlan {
    /// Returns `<output_dir>/<stem>_<index>.webm`.
    pub fn output_path(&self, index: u32) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.{}", self.stem, index, OUTPUT_EXTENSION))
    }

    /// Builds the job for the segment that starts at the current cursor.
    fn job(&self, state: &SegmentState) -> EncodeJob {
        EncodeJob::new(
            self.input.clone(),
            self.output_path(state.index),
            self.video_bitrate,
            self.settings.clone(),
        )
        .with_window(TimeWindow::starting_at(Timestamp::from_secs(state.cursor)))
        .with_scale(self.scale_height)
        .with_max_file_size(self.segment_size)
    }
}

/// A segment written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: u32,
    pub path: PathBuf,
    /// Input position the segment starts at, in seconds.
    pub start: u64,
    /// Measured duration of the written file, in seconds.
    pub duration: u64,
}

/// Produces segments one at a time, advancing by what each one really holds.
///
/// A size cap only approximates a duration, so after every encode the planner
/// probes the new file and moves the cursor by its measured length. The next
/// segment starts exactly where the previous one ended and errors do not
/// accumulate. A failed encode stops the run; segments already written stay.
pub struct SegmentPlanner<'a, E: ?Sized, P: ?Sized> {
    encoder: &'a E,
    probe: &'a P,
}

impl<'a, E, P> SegmentPlanner<'a, E, P>
where
    E: Encoder + ?Sized,
    P: MediaProbe + ?Sized,
{
    pub fn new(encoder: &'a E, probe: &'a P) -> Self {
        Self { encoder, probe }
    }

    /// Encodes segments until the whole input is covered.
    pub async fn run(&self, plan: &SegmentPlan) -> Result<Vec<Segment>, PipelineError> {
        let total = self.probe.duration(&plan.input)?;
        info!(
            input = ?plan.input,
            duration = total,
            segment_size = plan.segment_size,
            "Splitting input"
        );

        let mut state = SegmentState::new();
        let mut segments = Vec::new();

        while !state.is_done(total) {
            let job = plan.job(&state);
            let path = job.output_path.clone();

            info!(segment = state.index, start = state.cursor, output = ?path, "Encoding segment");
            self.encoder
                .encode(job)
                .await
                .map_err(|source| PipelineError::SegmentFailed {
                    index: state.index,
                    source,
                })?;

            let measured = self.probe.duration(&path)?;
            debug!(segment = state.index, measured, "Measured segment");
            if measured == 0 {
                return Err(PipelineError::StalledSegment {
                    index: state.index,
                    path,
                });
            }

            segments.push(Segment {
                index: state.index,
                path,
                start: state.cursor,
                duration: measured,
            });
            state.advance(measured);
        }

        info!(segments = segments.len(), "Split complete");
        Ok(segments)
    }
}
