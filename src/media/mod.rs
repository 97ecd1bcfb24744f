//! Media analysis using ffprobe.

pub mod probe;
pub mod timestamp;

pub use probe::{Ffprobe, MediaProbe};
pub use timestamp::{TimeWindow, Timestamp};
