//! Typed cell values and the parse helpers behind cleaning and inference.
//!
//! Every parser here returns an explicit [`ParseError`] instead of panicking
//! or silently coercing; callers decide whether a failure falls through to
//! the next type candidate (inference) or becomes a null (cleaning).
//! Temporal parsing is day-first throughout, matching the `DD.MM.YYYY`
//! convention of the upstream sheets.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cell-level conversion failure. Recovered locally by callers; never
/// propagates out of the cleaning or inference layers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'{0}' is not an integer")]
    Integer(String),
    #[error("'{0}' is not a number")]
    Numeric(String),
    #[error("'{0}' is not a recognized boolean token")]
    Boolean(String),
    #[error("'{0}' does not parse as a day-first date")]
    Temporal(String),
}

/// A typed cell after cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Numeric(Decimal),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    /// Canonical string form used for fingerprinting and the staging ledger:
    /// ISO-8601 for temporal values, normalized decimals, plain tokens for
    /// the rest. Equal logical content always renders identically.
    pub fn canonical(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Numeric(d) => d.normalize().to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Timestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

fn strip_separators(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .collect()
}

/// Parses an optionally-negative digit string after stripping ordinary and
/// non-breaking spaces used as thousands separators ("1 000" → 1000).
pub fn parse_integer_token(raw: &str) -> Result<i64, ParseError> {
    let cleaned = strip_separators(raw);
    let digits = cleaned.strip_prefix('-').unwrap_or(&cleaned);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::Integer(raw.to_string()));
    }
    cleaned
        .parse::<i64>()
        .map_err(|_| ParseError::Integer(raw.to_string()))
}

/// Parses a real number after replacing the decimal comma with a decimal
/// point and stripping separator spaces ("1 000,50" → 1000.50).
pub fn parse_numeric_token(raw: &str) -> Result<Decimal, ParseError> {
    let cleaned = strip_separators(raw).replace(',', ".");
    if cleaned.is_empty() {
        return Err(ParseError::Numeric(raw.to_string()));
    }
    cleaned
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| ParseError::Numeric(raw.to_string()))
}

/// Maps the explicit boolean token table (`true`/`false`, `1`/`0`, case
/// variants) to a boolean. Anything else is an error.
pub fn parse_boolean_token(raw: &str) -> Result<bool, ParseError> {
    let token = raw.trim();
    if token.eq_ignore_ascii_case("true") || token == "1" {
        return Ok(true);
    }
    if token.eq_ignore_ascii_case("false") || token == "0" {
        return Ok(false);
    }
    Err(ParseError::Boolean(raw.to_string()))
}

// Two-digit-year form first: %Y would otherwise swallow "01.02.23" as year 23.
const DATE_FORMATS: &[&str] = &["%d.%m.%y", "%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Day-first date parse across the supported separator variants.
pub fn parse_day_first_date(raw: &str) -> Result<NaiveDate, ParseError> {
    let trimmed = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    Err(ParseError::Temporal(raw.to_string()))
}

/// Day-first datetime parse across the supported separator variants.
pub fn parse_day_first_datetime(raw: &str) -> Result<NaiveDateTime, ParseError> {
    let trimmed = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    Err(ParseError::Temporal(raw.to_string()))
}

/// Parses a temporal cell, preferring the timestamp forms so a time-of-day
/// suffix is never dropped.
pub fn parse_temporal(raw: &str) -> Result<Value, ParseError> {
    if let Ok(ts) = parse_day_first_datetime(raw) {
        return Ok(Value::Timestamp(ts));
    }
    parse_day_first_date(raw).map(Value::Date)
}
