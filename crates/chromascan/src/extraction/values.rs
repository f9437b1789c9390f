//! Tolerant parsing of numbers, quantities, dates and ratios as printed on instrument reports.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static THOUSANDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("Thousands separator regex pattern is valid and should compile")
});
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("Number regex pattern is valid and should compile"));
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    // Lookalike letters count only when a real digit follows them.
    Regex::new(r"^([+-]?[\dOoIl|,]*\d(?:\.(?:[\dOoIl|]*\d)?)?)\s*(.*)$")
        .expect("Leading number regex pattern is valid and should compile")
});
static RATIO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?):(\d+(?:\.\d+)?)$").expect("Ratio regex pattern is valid and should compile")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d-%b-%y %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%y %H:%M",
    "%d-%b-%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
];

/// A parsed date, with or without a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
}

/// Parse a printed number.
///
/// Accepts thousands separators (`12,345.6`), a single decimal comma (`12,5`), a trailing
/// percent sign and the usual recognition slips where letters stand in for digits
/// (`O`/`o` for 0, `l`/`I`/`|` for 1). Substitution only happens when the token already
/// contains a real digit.
pub fn parse_number(token: &str) -> Option<f64> {
    let trimmed = token
        .trim()
        .trim_start_matches(['(', '['])
        .trim_end_matches([')', ']', '%', ';'])
        .trim();
    if trimmed.is_empty() || !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let repaired: String = trimmed
        .chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'l' | 'I' | '|' => '1',
            other => other,
        })
        .collect();

    let normalized = if THOUSANDS.is_match(&repaired) {
        repaired.replace(',', "")
    } else if repaired.matches(',').count() == 1 && !repaired.contains('.') {
        repaired.replace(',', ".")
    } else {
        repaired
    };

    if !NUMBER.is_match(&normalized) {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a strictly positive number.
pub fn parse_positive(token: &str) -> Option<f64> {
    parse_number(token).filter(|v| *v > 0.0)
}

/// Whether a token reads as a plain integer (no decimal point).
pub fn is_integer_token(token: &str) -> bool {
    let trimmed = token.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Split `"1.0 mL/min"` or `"1.0mL/min"` into a number and an optional unit.
pub fn split_quantity(value: &str) -> Option<(f64, Option<String>)> {
    let captures = LEADING_NUMBER.captures(value.trim())?;
    let number = parse_number(captures.get(1)?.as_str())?;
    let unit = captures
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    Some((number, unit))
}

/// Parse `"1:10"` (spaces allowed) or a plain number `n`, read as `n:1`.
pub fn parse_ratio(value: &str) -> Option<(f64, f64)> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(captures) = RATIO.captures(&compact) {
        let numerator = captures.get(1)?.as_str().parse::<f64>().ok()?;
        let denominator = captures.get(2)?.as_str().parse::<f64>().ok()?;
        if denominator <= 0.0 {
            return None;
        }
        return Some((numerator, denominator));
    }
    parse_positive(&compact).map(|n| (n, 1.0))
}

/// Parse the date and time formats commonly printed by chromatography data systems.
pub fn parse_date(value: &str) -> Option<ParsedDate> {
    let cleaned = value.replace(", ", " ").replace(',', " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(ParsedDate::DateTime(parsed));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(ParsedDate::Date(parsed));
        }
    }
    None
}
