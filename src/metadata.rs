use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{Error, Result};

/// Raw video metadata as reported by the metadata lookup
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    /// ISO-8601 publish timestamp, e.g. `2023-05-01T12:00:00Z`
    pub published_at: String,
    pub view_count: u64,
    pub thumbnail_url: String,
    /// ISO-8601 duration, e.g. `PT1H2M3S`
    pub duration: Option<String>,
}

/// Display-ready view of a video's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub title: String,
    pub author: String,
    pub date: String,
    pub view_count: String,
    pub thumbnail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Turn raw metadata into its display form
pub fn normalize(raw: &VideoMetadata) -> Result<DisplayRecord> {
    let duration = raw.duration.as_deref().map(format_duration).transpose()?;

    Ok(DisplayRecord {
        title: raw.title.clone(),
        author: raw.author.clone(),
        date: format_date(&raw.published_at)?,
        view_count: format_view_count(raw.view_count),
        thumbnail: raw.thumbnail_url.clone(),
        duration,
    })
}

/// Render an ISO-8601 timestamp as `Month DD, YYYY`
pub fn format_date(timestamp: &str) -> Result<String> {
    let timestamp = timestamp.trim();
    let local = timestamp.trim_end_matches(|c: char| c.is_ascii_alphabetic());

    let date = NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(local, "%Y-%m-%d"))
        .or_else(|_| DateTime::parse_from_rfc3339(timestamp).map(|dt| dt.naive_local().date()))
        .map_err(|_| Error::MalformedMetadata(format!("invalid publish timestamp {timestamp:?}")))?;

    Ok(date.format("%B %d, %Y").to_string())
}

/// Compress a view count to K/M notation, truncating
pub fn format_view_count(views: u64) -> String {
    if views >= 1_000_000 {
        format!("{}M", views / 1_000_000)
    } else if views >= 10_000 {
        format!("{}K", views / 1_000)
    } else {
        views.to_string()
    }
}

/// Render an ISO-8601 duration as `1h 2m 3s`, `2m 3s` or `3s`
pub fn format_duration(duration: &str) -> Result<String> {
    let total = parse_iso_duration(duration)?;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    Ok(if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    })
}

/// Parse an ISO-8601 duration into whole seconds (fractions truncated)
fn parse_iso_duration(duration: &str) -> Result<u64> {
    let malformed = || Error::MalformedMetadata(format!("invalid duration {duration:?}"));

    let body = duration.trim().strip_prefix('P').ok_or_else(malformed)?;
    let mut total = 0.0f64;
    let mut in_time = false;
    let mut seen_component = false;
    let mut num = String::new();

    for c in body.chars() {
        match c {
            '0'..='9' | '.' => num.push(c),
            ',' => num.push('.'),
            'T' if !in_time && num.is_empty() => in_time = true,
            _ => {
                let value: f64 = num.parse().map_err(|_| malformed())?;
                num.clear();
                // Years and months have no fixed length in seconds
                let unit = match (in_time, c) {
                    (false, 'W') => 604_800.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => return Err(malformed()),
                };
                total += value * unit;
                seen_component = true;
            }
        }
    }

    if !num.is_empty() || !seen_component {
        return Err(malformed());
    }

    Ok(total as u64)
}
