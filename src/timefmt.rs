/// Format elapsed seconds as `m:ss`. Negative and non-finite input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
  let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
  let minutes = (seconds / 60.0).floor() as u64;
  let secs = (seconds % 60.0).floor() as u64;
  format!("{}:{:02}", minutes, secs)
}

/// Clamp a percentage into `[0, 100]`. NaN is treated as 0.
pub fn clamp_percent(percent: f64) -> f64 {
  if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) }
}

/// Fraction of `duration` covered by `elapsed`, as a clamped percentage.
pub fn percent_of(elapsed: f64, duration: f64) -> f64 {
  if duration <= 0.0 || !duration.is_finite() {
    return 0.0;
  }
  clamp_percent(elapsed / duration * 100.0)
}
