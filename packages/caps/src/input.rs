// ABOUTME: Normalization of loosely typed client input
// ABOUTME: Date parsing, expenditure amount coercion, and string trimming

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::CapError;

/// Offset-less datetimes, as sent by `datetime-local` inputs; read as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn invalid_date(field: &str, raw: &str) -> CapError {
    CapError::Validation(format!("Invalid date for {}: '{}'", field, raw))
}

/// Parse an RFC 3339 timestamp, an offset-less datetime (UTC), or a plain
/// `YYYY-MM-DD` date (midnight UTC)
pub fn parse_date(field: &str, raw: &str) -> Result<DateTime<Utc>, CapError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Ok(naive.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| invalid_date(field, raw))
}

/// Parse an optional date field, treating blank strings as absent
pub fn parse_optional_date(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, CapError> {
    match raw {
        Some(s) if !s.trim().is_empty() => parse_date(field, s).map(Some),
        _ => Ok(None),
    }
}

/// Parse a date supplied as any JSON value.
///
/// Strings go through [`parse_date`], numbers are epoch milliseconds, and
/// `null` or a blank string leaves the field untouched.
pub fn parse_date_value(
    field: &str,
    value: Option<&Value>,
) -> Result<Option<DateTime<Utc>>, CapError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => parse_optional_date(field, Some(raw)),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .and_then(DateTime::from_timestamp_millis)
            .map(Some)
            .ok_or_else(|| invalid_date(field, &n.to_string())),
        Some(other) => Err(invalid_date(field, &other.to_string())),
    }
}

/// Coerce an expenditure amount supplied as any JSON value.
///
/// Returns `None` for `null` (field left untouched). Numbers pass through,
/// strings use their longest numeric prefix, and anything else or any
/// non-finite result becomes 0.
pub fn coerce_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Null => return None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_leading_float(s),
        _ => None,
    };

    Some(amount.filter(|a| a.is_finite()).unwrap_or(0.0))
}

fn parse_leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let scan_digits = |mut i: usize| {
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_end = scan_digits(end);
    let mut digits = int_end - end;
    end = int_end;

    if end < len && bytes[end] == b'.' {
        let frac_end = scan_digits(end + 1);
        digits += frac_end - (end + 1);
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut exp_start = end + 1;
        if exp_start < len && matches!(bytes[exp_start], b'+' | b'-') {
            exp_start += 1;
        }
        let exp_end = scan_digits(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Trim surrounding whitespace from optional free text
pub fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string())
}

/// Trimmed value, or `None` when empty after trimming
pub fn non_empty(value: Option<String>) -> Option<String> {
    trimmed(value).filter(|s| !s.is_empty())
}

/// Trim a required title, rejecting blank values
pub fn required_title(title: &str) -> Result<String, CapError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CapError::Validation("Title is required".to_string()));
    }
    Ok(title.to_string())
}
