// src/text_utils.rs
// Formatting helpers for track metadata and progress

use chrono::{DateTime, Utc};

/// `m:ss` for a position in seconds. Non-finite or negative input reads as 0.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Compact view count: `1.2M`, `3.4K`, or the plain number.
pub fn format_views(views: u64) -> String {
    if views >= 1_000_000 {
        format!("{:.1}M", views as f64 / 1_000_000.0)
    } else if views >= 1_000 {
        format!("{:.1}K", views as f64 / 1_000.0)
    } else {
        views.to_string()
    }
}

/// Relative publish date ("3 days ago", "2 weeks ago") falling back to
/// `Mon YYYY` for anything older than a year.
pub fn format_published(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (now - published).num_milliseconds().unsigned_abs();
    let day_ms = 24 * 60 * 60 * 1000;
    let days = diff_ms.div_ceil(day_ms);
    match days {
        d if d < 7 => format!("{d} days ago"),
        d if d < 30 => format!("{} weeks ago", d / 7),
        d if d < 365 => format!("{} months ago", d / 30),
        _ => published.format("%b %Y").to_string(),
    }
}
