//! Tolerant datetime parsing.
//!
//! Post pages express dates in whatever the theme or CMS happens to emit:
//! RFC 3339 in `<time datetime>`, RFC 2822 in feeds, or human text such as
//! "February 18, 2026". [`parse_datetime_str`] tries a list of formats and
//! always answers in UTC. Values without an offset are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Formats that carry an explicit offset.
const OFFSET_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Naive date-times, assumed UTC.
const NAIVE_DATETIME_FORMATS: [&str; 13] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
    "%B %d, %Y at %I:%M %p",
    "%m/%d/%Y %H:%M",
    "%A, %B %d, %Y %I:%M %p",
    "%d %B %Y %H:%M",
    "%d %b %Y %H:%M",
    "%a, %d %b %Y %H:%M:%S",
];

/// Bare dates, assumed midnight UTC.
const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%m/%d/%Y",
    "%A, %B %d, %Y",
    "%B %d %Y",
];

/// A trailing `Z` after a time, rewritten to an explicit offset.
static ZULU_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)Z$").expect("valid zulu regex"));

/// A trailing `UTC`/`GMT` zone name; naive formats already assume UTC.
static UTC_ZONE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\b(?:UTC|GMT)$").expect("valid zone regex"));

/// AP-style month abbreviations: "Feb." -> "Feb", "Sept." -> "Sep".
static AP_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Oct|Nov|Dec)t?(?:\.|\b)")
        .expect("valid month regex")
});

/// "18th" -> "18", so human dates match `%d`.
static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"));

/// Parse `raw` into a UTC timestamp, or `None` if no known format matches.
pub fn parse_datetime_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let zoned = ZULU_SUFFIX.replace(&raw, "${1}+00:00");
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&zoned, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let human = UTC_ZONE_NAME.replace(&raw, "");
    let human = AP_MONTH.replace_all(&human, "$1");
    let human = ORDINAL_SUFFIX.replace_all(&human, "$1");
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&human, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&human, format) {
            return Some(date.and_time(NaiveTime::MIN).and_utc());
        }
    }
    None
}

/// `<pubDate>` form, e.g. `Wed, 18 Feb 2026 00:00:00 +0000`.
pub fn format_rfc2822(dt: &DateTime<Utc>) -> String {
    dt.to_rfc2822()
}

/// Sort-key form, e.g. `2026-02-18T00:00:00+00:00`.
pub fn format_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}
