//! Size-fitting: the video bitrate that makes an output land on a byte budget.

use crate::error::{FitError, PipelineError};

/// Returns the total bitrate (bits/s) that spends `target_size_bytes` over
/// `duration_seconds`, rounded up.
pub fn total_bitrate(target_size_bytes: u64, duration_seconds: u64) -> Result<u64, FitError> {
    if duration_seconds == 0 {
        return Err(FitError::ZeroDuration);
    }

    let bits = u128::from(target_size_bytes) * 8;
    let total = bits.div_ceil(u128::from(duration_seconds));
    Ok(u64::try_from(total).unwrap_or(u64::MAX))
}

/// Returns the video bitrate left after the audio track takes its share.
///
/// The result is not clamped: a budget too small for the audio alone yields
/// zero or a negative value, which callers must report.
pub fn fit_video_bitrate(
    target_size_bytes: u64,
    duration_seconds: u64,
    audio_bitrate: u64,
) -> Result<i64, FitError> {
    let total = i128::from(total_bitrate(target_size_bytes, duration_seconds)?);
    let video = total - i128::from(audio_bitrate);
    Ok(i64::try_from(video).unwrap_or(if video < 0 { i64::MIN } else { i64::MAX }))
}

/// Where the video bitrate of a single-file encode came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoBitrate {
    /// Computed from the target size; a user bitrate, if any, was dropped.
    Fitted { bitrate: i64, discarded: Option<u64> },
    /// Given by the user.
    Fixed(u64),
    /// Neither size nor bitrate given.
    Default(u64),
}

impl VideoBitrate {
    /// Size-fitting wins over a fixed bitrate; the default applies last.
    pub fn resolve(fixed: Option<u64>, fitted: Option<i64>, default: u64) -> Self {
        match (fitted, fixed) {
            (Some(bitrate), discarded) => Self::Fitted { bitrate, discarded },
            (None, Some(fixed)) => Self::Fixed(fixed),
            (None, None) => Self::Default(default),
        }
    }

    /// Returns the fixed bitrate that size-fitting overrode.
    pub fn discarded(&self) -> Option<u64> {
        match self {
            Self::Fitted { discarded, .. } => *discarded,
            _ => None,
        }
    }

    /// Returns the bitrate, refusing values the encoder cannot honor.
    pub fn into_positive(self) -> Result<u64, PipelineError> {
        let bitrate = match self {
            Self::Fitted { bitrate, .. } => bitrate,
            Self::Fixed(b) | Self::Default(b) => i64::try_from(b).unwrap_or(i64::MAX),
        };

        if bitrate <= 0 {
            return Err(PipelineError::NonPositiveBitrate { bitrate });
        }
        Ok(bitrate as u64)
    }
}
