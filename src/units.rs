//! Human-readable magnitude parsing (`500K`, `2M`, `1.5G`).

use std::sync::OnceLock;

use regex::Regex;

use crate::error::UnitError;

fn magnitude_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)(?:\.(\d+))?([KkMmGg]?)$").expect("magnitude pattern is valid")
    })
}

/// Parses `<number>[K|M|G]` into an integer count, rounding up.
///
/// `K`, `M` and `G` are decimal (10^3, 10^6, 10^9). Without a suffix the
/// number is taken as-is in whatever unit the caller expects (bits or bytes).
/// Fractions are evaluated exactly, so `1.1K` is 1100 and `0.0005K` is 1.
pub fn parse_magnitude(value: &str) -> Result<u64, UnitError> {
    let invalid = || UnitError::InvalidMagnitude {
        value: value.to_string(),
    };

    let caps = magnitude_pattern().captures(value.trim()).ok_or_else(invalid)?;

    let exponent: u32 = match caps.get(3).map(|m| m.as_str()) {
        Some("K") | Some("k") => 3,
        Some("M") | Some("m") => 6,
        Some("G") | Some("g") => 9,
        _ => 0,
    };

    let whole: u128 = caps[1].parse().map_err(|_| invalid())?;
    let fraction = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let fraction_digits = u32::try_from(fraction.len()).map_err(|_| invalid())?;
    if fraction_digits > 30 {
        return Err(invalid());
    }
    let fraction_value: u128 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().map_err(|_| invalid())?
    };

    // value = (whole * 10^f + fraction) * 10^e / 10^f
    let denominator = 10u128.pow(fraction_digits);
    let numerator = whole
        .checked_mul(denominator)
        .and_then(|n| n.checked_add(fraction_value))
        .and_then(|n| n.checked_mul(10u128.pow(exponent)))
        .ok_or_else(invalid)?;

    let count = numerator.div_ceil(denominator);
    u64::try_from(count).map_err(|_| invalid())
}
