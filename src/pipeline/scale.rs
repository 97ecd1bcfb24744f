//! Downscale decisions.

use crate::error::PipelineError;

/// What to do with a requested output height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Apply a scale filter to this height.
    Downscale(u32),
    /// The source is already at the requested height; no filter.
    AlreadyAtResolution(u32),
}

impl ScaleDecision {
    /// Returns the height for the scale filter, if one is needed.
    pub fn filter_height(&self) -> Option<u32> {
        match self {
            Self::Downscale(height) => Some(*height),
            Self::AlreadyAtResolution(_) => None,
        }
    }
}

/// Checks a requested height against the source. Upscaling is refused.
pub fn resolve_scale(requested: u32, current: u32) -> Result<ScaleDecision, PipelineError> {
    if requested > current {
        return Err(PipelineError::Upscale { requested, current });
    }
    if requested == current {
        return Ok(ScaleDecision::AlreadyAtResolution(current));
    }
    Ok(ScaleDecision::Downscale(requested))
}
