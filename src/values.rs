//! String parsing shared by type inference and coercion.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::types::{NUMERIC_INTEGER_DIGITS, NUMERIC_SCALE};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("hardcoded regex pattern")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses a date or date-time string into a naive timestamp.
///
/// Dates become midnight; RFC 3339 values keep their wall-clock time and drop the offset.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    // Every supported layout starts with a four-digit year.
    if value.len() < 8 || !value.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Parses a plain decimal number (optional sign, fraction and exponent) into its canonical text
/// form: no exponent, no redundant zeros, `-` only for non-zero values.
///
/// Returns `None` when the value is not plain notation or does not fit the numeric column type
/// exactly (more than [`NUMERIC_INTEGER_DIGITS`] integer digits or [`NUMERIC_SCALE`] fraction
/// digits). Exactness matters more than acceptance: such values stay text.
pub(crate) fn parse_decimal(value: &str) -> Option<String> {
    let value = value.trim();
    if !NUMBER.is_match(value) {
        return None;
    }
    let negative = value.starts_with('-');
    let body = value.trim_start_matches(['+', '-']);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(at) => (&body[..at], body[at + 1..].parse::<i32>().ok()?),
        None => (body, 0),
    };
    let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    // `point` is the position of the decimal point within `digits`.
    let mut point = integer.len() as i64 + i64::from(exponent);
    let mut digits = format!("{integer}{fraction}");
    let leading = digits.len() - digits.trim_start_matches('0').len();
    digits.drain(..leading);
    point -= leading as i64;
    digits.truncate(digits.trim_end_matches('0').len());
    if digits.is_empty() {
        return Some("0".to_string());
    }

    let len = digits.len() as i64;
    if point > NUMERIC_INTEGER_DIGITS as i64 || len - point > NUMERIC_SCALE as i64 {
        return None;
    }
    let mut out = String::with_capacity(digits.len() + NUMERIC_SCALE + 3);
    if negative {
        out.push('-');
    }
    if point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', (-point) as usize));
        out.push_str(&digits);
    } else if point >= len {
        out.push_str(&digits);
        out.extend(std::iter::repeat_n('0', (point - len) as usize));
    } else {
        out.push_str(&digits[..point as usize]);
        out.push('.');
        out.push_str(&digits[point as usize..]);
    }
    Some(out)
}

/// Canonical text of a native spreadsheet number, rounded to the numeric column scale.
///
/// Binary floats carry noise below that scale (`0.1 + 0.2`), so rounding here loses nothing the
/// cell meant to hold.
pub(crate) fn decimal_from_f64(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    parse_decimal(&format!("{value:.prec$}", prec = NUMERIC_SCALE))
}

/// Whether the number is written with a redundant leading zero (`07`, `02124`), the usual sign
/// of a code or identifier rather than a quantity.
pub(crate) fn has_leading_zero(value: &str) -> bool {
    let digits = value.trim().trim_start_matches(['+', '-']);
    let integer_part = digits.split(['.', 'e', 'E']).next().unwrap_or("");
    integer_part.len() > 1 && integer_part.starts_with('0')
}
