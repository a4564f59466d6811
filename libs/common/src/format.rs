//! Display helpers for timestamps and long values

use chrono::{DateTime, Local, Utc};

/// Describe how long ago `timestamp` happened relative to `now`
///
/// Months are 30-day blocks and years 12-month blocks. Unparsable
/// timestamps are returned unchanged.
pub fn format_relative_time(timestamp: &str, now: DateTime<Utc>) -> String {
    let Some(then) = parse_timestamp(timestamp) else {
        return timestamp.to_string();
    };

    let seconds = (now - then).num_seconds();
    if seconds < 60 {
        return format!("{} seconds ago", seconds);
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return ago(minutes, "minute");
    }

    let hours = minutes / 60;
    if hours < 24 {
        return ago(hours, "hour");
    }

    let days = hours / 24;
    if days < 30 {
        return ago(days, "day");
    }

    let months = days / 30;
    if months < 12 {
        return ago(months, "month");
    }

    ago(months / 12, "year")
}

/// Render a timestamp in the local time zone
pub fn format_date(timestamp: &str) -> String {
    match parse_timestamp(timestamp) {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => timestamp.to_string(),
    }
}

/// Cut `text` to at most `max_len` characters, appending `...` when cut
pub fn truncate(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn ago(count: i64, unit: &str) -> String {
    let plural = if count > 1 { "s" } else { "" };
    format!("{} {}{} ago", count, unit, plural)
}

/// Accepts RFC 3339 as well as the naive `YYYY-MM-DD HH:MM:SS` form, read as UTC
fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    let timestamp = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(timestamp, fmt).ok())
        .map(|naive| naive.and_utc())
}
