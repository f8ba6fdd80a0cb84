//! Escaping and formatting helpers shared by the views

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Escape text placed inside an element (`&`, `<`, `>`)
pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Escape text placed inside a quoted attribute (`&`, `"`, `'`, `<`, `>`)
pub fn escape_attr(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

/// URL-safe identifier derived from a display name.
///
/// "Física Cuántica" -> "fisica-cuantica"
pub fn generate_slug(text: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static DASHES: OnceLock<Regex> = OnceLock::new();
    let invalid = INVALID.get_or_init(|| Regex::new(r"[^a-z0-9\s-]").expect("valid regex"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let dashes = DASHES.get_or_init(|| Regex::new(r"-+").expect("valid regex"));

    // decompose so accents become separate marks, then drop the marks
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let cleaned = invalid.replace_all(&folded, "");
    let dashed = spaces.replace_all(cleaned.trim(), "-");
    dashes.replace_all(&dashed, "-").into_owned()
}

/// Seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let mins = (total / 60.0).floor() as u64;
    let mut secs = (total % 60.0).round() as u64;
    // 59.6s rounds up to a full minute
    let mins = if secs == 60 {
        secs = 0;
        mins + 1
    } else {
        mins
    };
    format!("{}:{:02}", mins, secs)
}

/// Seconds as `"{h}h {m}m"`, or `"{m}m"` under an hour
pub fn format_hours_minutes(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// First `max` characters of `text`, with "..." appended when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Round to two decimals, the precision used in tables
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Backend timestamps (RFC 3339 or naive ISO) as `dd/mm/yyyy HH:MM`
pub fn format_timestamp(raw: &str) -> Option<String> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.format("%d/%m/%Y %H:%M").to_string());
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
}
