//! Formatting utilities for map display data.

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Timestamp layout used on cards, result rows and the update label
const TIMESTAMP_FORMAT: &str = "%Y/%-m/%-d %-H:%M:%S";

fn display_offset(utc_offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// Format a UTC instant as `YYYY/M/D H:MM:SS` in the display offset.
pub fn format_timestamp(at: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    at.with_timezone(&display_offset(utc_offset_minutes))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Format a "last seen" unix timestamp (seconds) for display.
///
/// Out-of-range timestamps render as the epoch.
pub fn format_last_seen(epoch_seconds: i64, utc_offset_minutes: i32) -> String {
    let at = DateTime::from_timestamp(epoch_seconds, 0).unwrap_or_default();
    format_timestamp(at, utc_offset_minutes)
}

/// Truncate a zone name to `max_chars` characters, appending "..." when cut.
pub fn truncate_zone_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let mut truncated: String = name.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

/// Paging footer shown under search results.
pub fn format_paging_summary(shown: usize, total: usize) -> String {
    format!("Showing top {} results out of {} results", shown, total)
}
