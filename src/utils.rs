use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Deserializer};

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
    pub locale: String,
    pub decimal_places: usize,
}

impl Default for NumberFormatOptions {
    fn default() -> Self {
        Self {
            use_comma: false,
            locale: "en".to_string(),
            decimal_places: 1,
        }
    }
}

fn locale_for(name: &str) -> Locale {
    match name {
        "de" => Locale::de,
        "fr" => Locale::fr,
        "es" => Locale::es,
        "it" => Locale::it,
        "ja" => Locale::ja,
        "ko" => Locale::ko,
        "zh" => Locale::zh,
        _ => Locale::en,
    }
}

/// Format a count for display. Accepts both u32 and u64.
pub fn format_number(n: impl Into<u64>, options: &NumberFormatOptions) -> String {
    let n: u64 = n.into();
    if options.use_comma {
        n.to_formatted_string(&locale_for(&options.locale))
    } else {
        n.to_string()
    }
}

/// Duration label for a number of minutes, rounded to the nearest minute.
/// `"2h 5m"` from one hour up, `"45 min"` below.
pub fn format_duration_minutes(minutes: f64) -> String {
    let total = if minutes.is_finite() && minutes > 0.0 {
        minutes.round() as u64
    } else {
        0
    };
    let (hours, mins) = (total / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins} min")
    }
}

pub fn format_duration_secs(secs: u64) -> String {
    format_duration_minutes(secs as f64 / 60.0)
}

pub fn format_distance_km(km: f64, options: &NumberFormatOptions) -> String {
    format!("{:.prec$} km", km, prec = options.decimal_places)
}

/// Heatmap shading level 0-4 for a day's weight in minutes.
pub fn intensity_level(weight: u64) -> u8 {
    match weight {
        0 => 0,
        1..=9 => 1,
        10..=29 => 2,
        30..=59 => 3,
        _ => 4,
    }
}

pub fn intensity_glyph(weight: u64) -> char {
    match intensity_level(weight) {
        0 => '·',
        1 => '░',
        2 => '▒',
        3 => '▓',
        _ => '█',
    }
}

/// `M/D/YYYY`, with a trailing `*` when `date` is `today`.
pub fn format_date_for_display(date: NaiveDate, today: NaiveDate) -> String {
    let formatted = format!("{}/{}/{}", date.month(), date.day(), date.year());
    if date == today {
        format!("{formatted}*")
    } else {
        formatted
    }
}

/// Custom serde deserializer for RFC3339 timestamp strings to DateTime<Utc>
pub fn deserialize_utc_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.into())
        .map_err(serde::de::Error::custom)
}

/// Get the system's local timezone as an IANA timezone string (e.g., "America/Chicago")
pub fn get_local_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}
