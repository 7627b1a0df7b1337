use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::candidate::SchemaField;

/// Month-name dates as they appear inline: `August 21, 2025`, `Sept. 5 2025`.
pub static RE_MONTH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}\b").unwrap()
});

static RE_MONTH_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$").unwrap());
static RE_DAY_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]+)\.?,?\s+(\d{4})$").unwrap());

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september", "october", "november", "december",
];

fn month_number(word: &str) -> Option<u32> {
    let w = word.to_lowercase();
    if w.len() < 3 {
        return None;
    }
    MONTHS.iter().position(|m| m.starts_with(&w)).map(|i| i as u32 + 1)
}

fn strip_trailing_punct(s: &str) -> &str {
    let t = s.trim();
    t.strip_suffix(',').or_else(|| t.strip_suffix('.')).unwrap_or(t).trim()
}

/// Parse a calendar date written as ISO, `MM/DD/YYYY`, or with a month name.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = strip_trailing_punct(raw);
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    if let Some(cap) = RE_MONTH_FIRST.captures(s) {
        let month = month_number(&cap[1])?;
        return NaiveDate::from_ymd_opt(cap[3].parse().ok()?, month, cap[2].parse().ok()?);
    }
    if let Some(cap) = RE_DAY_FIRST.captures(s) {
        let month = month_number(&cap[2])?;
        return NaiveDate::from_ymd_opt(cap[3].parse().ok()?, month, cap[1].parse().ok()?);
    }
    None
}

pub fn iso_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Short human rendering, e.g. `Aug 1, 2025`.
pub fn display_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format("%b %-d, %Y").to_string())
}

/// Dedup key for a value under a schema field. Dates collapse to ISO so that
/// differently written equal dates match; everything else loses one trailing
/// comma or period and surrounding whitespace. No case folding.
pub fn normalize_value(raw: &str, field: Option<SchemaField>) -> String {
    if field.map(|f| f.is_date_like()).unwrap_or(false) {
        if let Some(iso) = iso_date(raw) {
            return iso;
        }
    }
    strip_trailing_punct(raw).to_string()
}
