//! Two-pass WebM encoding through ffmpeg.

pub mod ffmpeg;
pub mod job;
pub mod pass_log;
pub mod two_pass;

pub use ffmpeg::{FfmpegCommand, FfmpegRunner};
pub use job::{EncodeJob, EncodeSettings, OUTPUT_EXTENSION};
pub use pass_log::PassLog;
pub use two_pass::{Encoder, TwoPassEncoder};
