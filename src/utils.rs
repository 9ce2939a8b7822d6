use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use num_format::{Locale, ToFormattedString};
use xxhash_rust::xxh3::xxh3_64;

static WARNED_MESSAGES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

pub fn warn_once(message: impl Into<String>) {
    let message = message.into();
    let cache = WARNED_MESSAGES.get_or_init(|| Mutex::new(HashSet::new()));

    if let Ok(mut warned) = cache.lock()
        && warned.insert(message.clone())
    {
        eprintln!("{message}");
    }
}

#[derive(Clone)]
pub struct NumberFormatOptions {
    pub use_comma: bool,
    pub use_human: bool,
    pub locale: String,
    pub decimal_places: usize,
}

/// Format a number for display. Accepts both u32 and u64.
pub fn format_number(n: impl Into<u64>, options: &NumberFormatOptions) -> String {
    let n: u64 = n.into();
    let locale = match options.locale.as_str() {
        "de" => Locale::de,
        "fr" => Locale::fr,
        "es" => Locale::es,
        "it" => Locale::it,
        "ja" => Locale::ja,
        "ko" => Locale::ko,
        "zh" => Locale::zh,
        _ => Locale::en,
    };

    if options.use_human {
        let (divisor, suffix) = match n {
            n if n >= 1_000_000_000_000 => (1_000_000_000_000.0, "t"),
            n if n >= 1_000_000_000 => (1_000_000_000.0, "b"),
            n if n >= 1_000_000 => (1_000_000.0, "m"),
            n if n >= 1_000 => (1_000.0, "k"),
            _ => return n.to_string(),
        };
        format!(
            "{:.prec$}{suffix}",
            n as f64 / divisor,
            prec = options.decimal_places
        )
    } else if options.use_comma {
        n.to_formatted_string(&locale)
    } else {
        n.to_string()
    }
}

/// Format optional minutes for a table cell, `-` when undefined.
pub fn format_minutes(minutes: Option<f64>, options: &NumberFormatOptions) -> String {
    match minutes {
        Some(m) => format!("{m:.prec$}", prec = options.decimal_places),
        None => "-".to_string(),
    }
}

pub fn format_date_for_display(date: Option<&str>) -> String {
    let Some(date) = date else {
        return "Unknown".to_string();
    };

    match parse_report_date(date) {
        Some(parsed) => {
            let day = parsed.date_naive();
            format!("{}/{}/{}", day.month(), day.day(), day.year())
        }
        None => date.to_string(),
    }
}

/// Parse a date string as written in reports.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) and bare `YYYY-MM-DD`
/// (midnight UTC). Anything else is treated as unknown.
pub fn parse_report_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Round to two decimals, the precision reports carry for derived figures.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fast content hash used to skip re-merging unchanged input files.
pub fn fast_hash(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}
