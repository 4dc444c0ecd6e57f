//! Semantic interpretation of column default values.
//!
//! Defaults are stored as the literal text found in a schema description.
//! Two defaults are the same when they denote the same value for the
//! column's type, so `"10"` and `"1e+1"` on a `DOUBLE` column, or
//! `"2024-01-05"` and `" 2024-01-05 "` on a `DATE` column, are equal.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::TypeCode;

/// A default value interpreted according to its column type.
///
/// Equality is value equality, except that `NaN` equals `NaN` so that a
/// column compares equal to itself.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    /// Integer and decimal types: exact decimal comparison.
    Exact(Decimal),
    /// Floating point types.
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// Anything else, or text that does not parse for the column type.
    Raw(String),
}

impl DefaultValue {
    /// Interprets `text` as a default for a column of `type_code`.
    ///
    /// Never fails: text that cannot be read as the column's type is kept
    /// verbatim and compared as a string.
    pub fn parse(type_code: TypeCode, text: &str) -> Self {
        let trimmed = text.trim();
        let parsed = if type_code.is_integer() || type_code.is_decimal() {
            parse_decimal(trimmed).map(DefaultValue::Exact)
        } else if type_code.is_floating() {
            trimmed.parse::<f64>().ok().map(DefaultValue::Float)
        } else if type_code.is_boolean() {
            parse_bool(trimmed).map(DefaultValue::Boolean)
        } else {
            match type_code {
                TypeCode::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .map(DefaultValue::Date),
                TypeCode::Time => parse_time(trimmed).map(DefaultValue::Time),
                TypeCode::Timestamp => parse_timestamp(trimmed).map(DefaultValue::Timestamp),
                _ => None,
            }
        };
        parsed.unwrap_or_else(|| DefaultValue::Raw(text.to_string()))
    }
}

impl PartialEq for DefaultValue {
    fn eq(&self, other: &Self) -> bool {
        use DefaultValue::*;
        match (self, other) {
            (Exact(a), Exact(b)) => a == b,
            (Float(a), Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Boolean(a), Boolean(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (Raw(a), Raw(b)) => a == b,
            _ => false,
        }
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    if unsigned.contains(['e', 'E']) {
        Decimal::from_scientific(unsigned).ok()
    } else {
        Decimal::from_str(unsigned).ok()
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
