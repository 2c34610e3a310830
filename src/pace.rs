use chrono::DateTime;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaceError {
    #[error("pace is missing")]
    Missing,
    #[error("pace '{0}' is not in MM:SS form")]
    Shape(String),
    #[error("pace '{0}' has a non-numeric part")]
    NotNumeric(String),
    #[error("pace '{0}' has seconds of 60 or more")]
    SecondsOutOfRange(String),
    #[error("pace '{0}' is too large")]
    Overflow(String),
}

/// Parses an `MM:SS` pace into total seconds.
///
/// Zero padding is not required, so `"7:5"` is 425 seconds.
pub fn try_parse_pace(text: Option<&str>) -> Result<u32, PaceError> {
    let text = text.ok_or(PaceError::Missing)?;
    let mut parts = text.split(':');
    let (minutes, seconds) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(s), None) => (m, s),
        _ => return Err(PaceError::Shape(text.to_string())),
    };

    let minutes = parse_part(minutes).ok_or_else(|| PaceError::NotNumeric(text.to_string()))?;
    let seconds = parse_part(seconds).ok_or_else(|| PaceError::NotNumeric(text.to_string()))?;
    if seconds >= 60 {
        return Err(PaceError::SecondsOutOfRange(text.to_string()));
    }

    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(|| PaceError::Overflow(text.to_string()))
}

// Digits only: rejects signs, decimals and empty parts.
fn parse_part(part: &str) -> Option<u32> {
    let part = part.trim();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Total seconds for a pace, or `0` when the input is not a valid pace.
pub fn parse_pace_to_seconds(text: Option<&str>) -> u32 {
    try_parse_pace(text).unwrap_or(0)
}

pub fn format_pace_tick(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Short `Mon DD` label for an epoch-millisecond timestamp, in UTC.
pub fn format_date_tick(timestamp_ms: i64) -> String {
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%b %d").to_string(),
        None => String::new(),
    }
}
