//! Text helpers for slider tooltips and popups.

use chrono::DateTime;

const DETAIL_BASE_URL: &str = "http://norskmeteornettverk.no/meteor/";

/// Formats Unix seconds as `YYYY-MM-DD HH:MM` (UTC), or `--` when the value
/// is not a representable time.
pub fn format_timestamp(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "--".to_string();
    }
    let millis = (seconds * 1000.0).round();
    if millis.abs() >= i64::MAX as f64 {
        return "--".to_string();
    }
    DateTime::from_timestamp_millis(millis as i64)
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "--".to_string())
}

/// Renders a range bound, using `∞` for an unbounded upper value.
pub fn format_bound(value: f64) -> String {
    if value >= f64::MAX {
        "∞".to_string()
    } else {
        value.to_string()
    }
}

/// Parses a bound as typed into a control; accepts `∞`.
pub fn parse_bound(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed == "∞" {
        return Some(f64::INFINITY);
    }
    trimmed.parse::<f64>().ok().filter(|value| !value.is_nan())
}

/// Detail page of an event; ids look like `20250105_031512`.
pub fn event_url(event_id: &str) -> String {
    format!("{}{}", DETAIL_BASE_URL, event_id.replacen('_', "/", 1))
}
