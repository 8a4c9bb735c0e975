use hifitime::prelude::Duration;

/// Converts a (positive) [Duration] to [std::time::Duration].
/// Negative durations are clamped to zero.
pub fn to_std_duration(dt: Duration) -> std::time::Duration {
    let nanos = dt.total_nanoseconds();
    if nanos <= 0 {
        std::time::Duration::ZERO
    } else {
        std::time::Duration::from_nanos(nanos.min(u64::MAX as i128) as u64)
    }
}

/// Parses a [Duration] description like "30 s" or "1 min", no shorter than `min`.
pub fn parse_duration(s: &str, min: Duration) -> Result<Duration, String> {
    let dt = s
        .trim()
        .parse::<Duration>()
        .map_err(|e| format!("invalid duration: {}", e))?;

    if dt < min {
        return Err(format!("duration is limited to {}", min));
    }
    Ok(dt)
}

/// Rounds to 2 decimals, for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
