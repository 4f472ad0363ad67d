use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// How timestamp columns are rendered: absolute wall-clock time or a
/// natural phrase relative to now, both anchored to the configured zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMode {
  Absolute,
  Relative,
}

#[derive(Debug, Clone, Copy)]
pub struct TimeDisplay {
  pub mode: TimeMode,
  pub tz: Tz,
}

impl TimeDisplay {
  /// Parses the configured display string, `"time:<tz>"` or
  /// `"natural-time:<tz>"`. A missing or unknown zone falls back to UTC.
  pub fn parse(raw: &str) -> Self {
    let (mode, rest) = if let Some(rest) = raw.strip_prefix("natural-time") {
      (TimeMode::Relative, rest)
    } else if let Some(rest) = raw.strip_prefix("time") {
      (TimeMode::Absolute, rest)
    } else {
      (TimeMode::Absolute, "")
    };
    let tz = rest
      .strip_prefix(':')
      .or_else(|| rest.strip_prefix('-'))
      .and_then(|name| name.parse().ok())
      .unwrap_or(chrono_tz::UTC);
    Self { mode, tz }
  }

  /// Formats an optional epoch-seconds timestamp. Missing input yields
  /// `None` so the caller leaves the table cell blank rather than
  /// printing a placeholder.
  pub fn format(&self, timestamp: Option<f64>) -> Option<String> {
    let ts = timestamp.filter(|t| t.is_finite())?;
    let secs = ts.div_euclid(1.0) as i64;
    let nanos = (ts.rem_euclid(1.0) * 1e9) as u32;
    let utc = DateTime::<Utc>::from_timestamp(secs, nanos)?;
    let local = utc.with_timezone(&self.tz);
    match self.mode {
      TimeMode::Absolute => Some(local.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
      TimeMode::Relative => Some(natural_from_now(utc, Utc::now())),
    }
  }
}

/// Moment-style natural phrase for the distance between `then` and `now`.
fn natural_from_now(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let delta = (now - then).num_seconds();
  let phrase = natural_span(delta.unsigned_abs());
  if delta >= 0 {
    format!("{phrase} ago")
  } else {
    format!("in {phrase}")
  }
}

fn natural_span(secs: u64) -> String {
  const MINUTE: u64 = 60;
  const HOUR: u64 = 3600;
  const DAY: u64 = 86_400;
  const MONTH: u64 = 30 * DAY;
  const YEAR: u64 = 365 * DAY;
  match secs {
    0..=44 => "a few seconds".into(),
    45..=89 => "a minute".into(),
    90..=2_699 => format!("{} minutes", (secs + MINUTE / 2) / MINUTE),
    2_700..=5_399 => "an hour".into(),
    5_400..=79_199 => format!("{} hours", (secs + HOUR / 2) / HOUR),
    79_200..=129_599 => "a day".into(),
    129_600..=2_246_399 => format!("{} days", (secs + DAY / 2) / DAY),
    2_246_400..=3_887_999 => "a month".into(),
    3_888_000..=27_647_999 => format!("{} months", (secs + MONTH / 2) / MONTH),
    27_648_000..=47_303_999 => "a year".into(),
    _ => format!("{} years", (secs + YEAR / 2) / YEAR),
  }
}

/// Elapsed-duration rendering style. `Compact` prints hour/minute
/// components only when non-zero ("1h 1m 1s"); `Seconds2` prints total
/// seconds with two decimals ("12.34 sec").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationStyle {
  Compact,
  Seconds2,
}

/// Formats the span between two epoch-seconds stamps, or "N/A" when
/// either side is missing or non-finite.
pub fn format_duration(started: Option<f64>, ended: Option<f64>, style: DurationStyle) -> String {
  match (started, ended) {
    (Some(started), Some(ended)) if started.is_finite() && ended.is_finite() => {
      // Clock skew between reporting workers can put the end stamp
      // before the start; clamp instead of rendering a negative span.
      let span = (ended - started).max(0.0);
      match style {
        DurationStyle::Seconds2 => format!("{span:.2} sec"),
        DurationStyle::Compact => {
          let total = span as i64;
          let hours = total / 3600;
          let minutes = (total % 3600) / 60;
          let seconds = total % 60;
          let mut out = String::new();
          if hours > 0 {
            out.push_str(&format!("{hours}h "));
          }
          if minutes > 0 {
            out.push_str(&format!("{minutes}m "));
          }
          out.push_str(&format!("{seconds}s"));
          out
        }
      }
    }
    _ => "N/A".into(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duration_missing_or_non_finite_is_na() {
    assert_eq!(format_duration(None, Some(1.0), DurationStyle::Compact), "N/A");
    assert_eq!(format_duration(Some(1.0), None, DurationStyle::Compact), "N/A");
    assert_eq!(format_duration(None, None, DurationStyle::Seconds2), "N/A");
    assert_eq!(format_duration(Some(f64::NAN), Some(1.0), DurationStyle::Compact), "N/A");
    assert_eq!(format_duration(Some(0.0), Some(f64::INFINITY), DurationStyle::Seconds2), "N/A");
  }

  #[test]
  fn duration_compact_components() {
    assert_eq!(format_duration(Some(0.0), Some(3661.0), DurationStyle::Compact), "1h 1m 1s");
    assert_eq!(format_duration(Some(10.0), Some(10.0), DurationStyle::Compact), "0s");
    assert_eq!(format_duration(Some(0.0), Some(59.0), DurationStyle::Compact), "59s");
    assert_eq!(format_duration(Some(0.0), Some(61.0), DurationStyle::Compact), "1m 1s");
  }

  #[test]
  fn duration_compact_truncates_fractions() {
    assert_eq!(format_duration(Some(0.0), Some(3661.9), DurationStyle::Compact), "1h 1m 1s");
  }

  #[test]
  fn duration_negative_span_clamps_to_zero() {
    assert_eq!(format_duration(Some(100.0), Some(30.0), DurationStyle::Compact), "0s");
    assert_eq!(format_duration(Some(100.0), Some(30.0), DurationStyle::Seconds2), "0.00 sec");
  }

  #[test]
  fn duration_two_decimal_style() {
    assert_eq!(format_duration(Some(0.0), Some(12.339), DurationStyle::Seconds2), "12.34 sec");
    assert_eq!(format_duration(Some(2.5), Some(3.0), DurationStyle::Seconds2), "0.50 sec");
  }

  #[test]
  fn parse_modes_and_zones() {
    let display = TimeDisplay::parse("natural-time:Europe/London");
    assert_eq!(display.mode, TimeMode::Relative);
    assert_eq!(display.tz, chrono_tz::Europe::London);

    let display = TimeDisplay::parse("time:UTC");
    assert_eq!(display.mode, TimeMode::Absolute);
    assert_eq!(display.tz, chrono_tz::UTC);

    let display = TimeDisplay::parse("time:not-a-zone");
    assert_eq!(display.tz, chrono_tz::UTC);
  }

  #[test]
  fn absolute_format_renders_millis_in_zone() {
    let display = TimeDisplay::parse("time:UTC");
    assert_eq!(
      display.format(Some(0.5)),
      Some("1970-01-01 00:00:00.500".into())
    );
    assert_eq!(display.format(None), None);
  }

  #[test]
  fn relative_phrases() {
    let now = Utc::now();
    assert_eq!(natural_from_now(now - chrono::Duration::seconds(10), now), "a few seconds ago");
    assert_eq!(natural_from_now(now - chrono::Duration::seconds(180), now), "3 minutes ago");
    assert_eq!(natural_from_now(now + chrono::Duration::seconds(7200), now), "in 2 hours");
  }
}
