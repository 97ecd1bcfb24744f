//! Timestamps and time windows passed to ffmpeg.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// A media position with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    millis: u64,
}

impl Timestamp {
    /// Creates a timestamp from whole seconds, saturating at the largest
    /// representable position.
    pub fn from_secs(secs: u64) -> Self {
        Self {
            millis: secs.saturating_mul(1000),
        }
    }

    /// Creates a timestamp from milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }
}

/// Formats as fractional seconds, which ffmpeg accepts for `-ss` and `-to`.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.millis / 1000;
        let millis = self.millis % 1000;
        if millis == 0 {
            write!(f, "{}", secs)
        } else {
            write!(f, "{}.{:03}", secs, millis)
        }
    }
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(?:(\d+):)?(\d+):)?(\d+)(?:\.(\d{1,3}))?$")
            .expect("timestamp pattern is valid")
    })
}

impl FromStr for Timestamp {
    type Err = String;

    /// Accepts `SS[.mmm]`, `MM:SS[.mmm]` and `HH:MM:SS[.mmm]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid timestamp '{}': expected [[HH:]MM:]SS[.mmm]", s);
        let caps = timestamp_pattern().captures(s.trim()).ok_or_else(invalid)?;

        let field = |i: usize| -> Result<u64, String> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u64>().map_err(|_| invalid()))
                .unwrap_or(Ok(0))
        };

        let hours = field(1)?;
        let minutes = field(2)?;
        let seconds = field(3)?;

        // A leading field may be unbounded, inner fields are clock positions.
        if caps.get(2).is_some() && seconds >= 60 {
            return Err(invalid());
        }
        if caps.get(1).is_some() && minutes >= 60 {
            return Err(invalid());
        }

        let millis = match caps.get(4) {
            Some(m) => {
                let digits = m.as_str();
                let value: u64 = digits.parse().map_err(|_| invalid())?;
                value * 10u64.pow(3 - digits.len() as u32)
            }
            None => 0,
        };

        let total_secs = hours
            .checked_mul(3600)
            .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(seconds))
            .ok_or_else(invalid)?;

        let millis = total_secs
            .checked_mul(1000)
            .and_then(|m| m.checked_add(millis))
            .ok_or_else(invalid)?;

        Ok(Self { millis })
    }
}

/// A range of the input timeline. An open end runs to the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Option<Timestamp>,
}

impl TimeWindow {
    /// Creates a window with both ends fixed.
    pub fn between(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Creates a window from `start` to the end of the input.
    pub fn starting_at(start: Timestamp) -> Self {
        Self { start, end: None }
    }

    /// Returns true when the window covers a non-empty range.
    pub fn is_valid(&self) -> bool {
        self.end.map_or(true, |end| end > self.start)
    }
}
