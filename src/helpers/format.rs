//! Date and number formatting helpers.
//!
//! Patterns follow the .NET custom format conventions template authors tend to
//! know (`yyyy-MM-dd`, `N2`, `#,##0.00`). Date patterns are translated into
//! chrono strftime items; numeric patterns are formatted through `Decimal` so
//! rounding is exact.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::value::Value;

const DEFAULT_DATE_PATTERN: &str = "yyyy-MM-dd";
const DEFAULT_NUMBER_PATTERN: &str = "N2";

/// Floats at or above 2^52 have no fractional part left to round.
const MAX_EXACT_FLOAT: f64 = 4_503_599_627_370_496.0;

/// Translates a .NET-style date pattern into a strftime string.
fn strftime_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        let spec = match (c, run) {
            ('y', 1 | 2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', 2) => Some("%d"),
            ('d', 3) => Some("%a"),
            ('d', _) => Some("%A"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', 1) => Some("%-I"),
            ('h', _) => Some("%I"),
            ('m', 1) => Some("%-M"),
            ('m', _) => Some("%M"),
            ('s', 1) => Some("%-S"),
            ('s', _) => Some("%S"),
            ('f' | 'F', 1..=3) => Some("%3f"),
            ('f' | 'F', 4..=6) => Some("%6f"),
            ('f' | 'F', _) => Some("%9f"),
            ('t', _) => Some("%p"),
            _ => None,
        };
        if let Some(spec) = spec {
            out.push_str(spec);
            i += run;
            continue;
        }
        match c {
            '\'' | '"' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j] != c {
                    push_literal(&mut out, chars[j]);
                    j += 1;
                }
                i = j + 1;
            }
            '\\' if i + 1 < chars.len() => {
                push_literal(&mut out, chars[i + 1]);
                i += 2;
            }
            _ => {
                push_literal(&mut out, c);
                i += 1;
            }
        }
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Formats a date-time with a .NET-style pattern.
pub fn format_date(value: &NaiveDateTime, pattern: &str) -> String {
    let mut out = String::new();
    match write!(out, "{}", value.format(&strftime_pattern(pattern))) {
        Ok(()) => out,
        Err(_) => value.to_string(),
    }
}

fn as_date_time(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        Value::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

/// Parses the ISO-8601 shapes accepted by the `date` helper.
fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Int(i) => Some(Decimal::from(*i)),
        Value::Float(f) => Decimal::from_f64(*f),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

/// Inserts `,` every three digits of an unsigned integer string.
fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Renders `value` with between `min` and `max` fraction digits.
fn render_decimal(
    value: Decimal,
    min_frac: u32,
    max_frac: u32,
    min_int: usize,
    grouped: bool,
) -> String {
    let rounded = value.round_dp_with_strategy(max_frac, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut frac = frac_part.to_string();
    while frac.len() < max_frac as usize {
        frac.push('0');
    }
    while frac.len() > min_frac as usize && frac.ends_with('0') {
        frac.pop();
    }

    let mut int_digits = int_part.trim_start_matches('0').to_string();
    while int_digits.len() < min_int {
        int_digits.insert(0, '0');
    }
    if grouped {
        int_digits = group_digits(&int_digits);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&int_digits);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

/// Standard patterns: `N`, `F`, `D`, `P` with an optional precision.
fn standard_number(value: Decimal, pattern: &str) -> Option<String> {
    let mut chars = pattern.chars();
    let kind = chars.next()?.to_ascii_uppercase();
    let rest: String = chars.collect();
    let precision = if rest.is_empty() {
        None
    } else {
        Some(rest.parse::<u32>().ok()?)
    };
    match kind {
        'N' => {
            let p = precision.unwrap_or(2);
            Some(render_decimal(value, p, p, 1, true))
        }
        'F' => {
            let p = precision.unwrap_or(2);
            Some(render_decimal(value, p, p, 1, false))
        }
        'D' => {
            if !value.fract().is_zero() {
                return None;
            }
            Some(render_decimal(value, 0, 0, precision.unwrap_or(1) as usize, false))
        }
        'P' => {
            let p = precision.unwrap_or(2);
            let scaled = value.checked_mul(Decimal::ONE_HUNDRED)?;
            Some(format!("{}%", render_decimal(scaled, p, p, 1, true)))
        }
        _ => None,
    }
}

/// Custom patterns built from `0`, `#`, `,` and `.` with literal text around them.
fn custom_number(value: Decimal, pattern: &str) -> Option<String> {
    let start = pattern.find(|c: char| matches!(c, '0' | '#'))?;
    let end = pattern.rfind(|c: char| matches!(c, '0' | '#'))? + 1;
    let (prefix, body, suffix) = (&pattern[..start], &pattern[start..end], &pattern[end..]);

    let (int_spec, frac_spec) = body.split_once('.').unwrap_or((body, ""));
    let min_int = int_spec.matches('0').count();
    let grouped = int_spec.contains(',');
    let min_frac = frac_spec.matches('0').count() as u32;
    let max_frac = frac_spec.chars().filter(|c| matches!(c, '0' | '#')).count() as u32;

    let scaled = if suffix.contains('%') || prefix.contains('%') {
        value.checked_mul(Decimal::ONE_HUNDRED)?
    } else {
        value
    };
    let digits = render_decimal(scaled, min_frac, max_frac, min_int, grouped);
    let digits = if digits.is_empty() || digits == "-" {
        format!("{digits}0")
    } else {
        digits
    };
    Some(format!("{prefix}{digits}{suffix}"))
}

/// Formats a number with a .NET-style standard or custom pattern.
pub fn format_number(value: &Value, pattern: &str) -> Option<String> {
    let number = to_decimal(value)?;
    let pattern = pattern.trim();
    if pattern.contains(['0', '#']) && !pattern.starts_with(|c: char| c.is_ascii_alphabetic()) {
        custom_number(number, pattern)
    } else {
        standard_number(number, pattern)
    }
}

pub(super) fn format(value: &Value, argument: Option<&str>) -> Value {
    let Some(pattern) = argument else {
        return Value::String(value.to_string());
    };
    if let Some(dt) = as_date_time(value) {
        return Value::String(format_date(&dt, pattern));
    }
    match format_number(value, pattern) {
        Some(text) => Value::String(text),
        None if value.is_null() => Value::Null,
        None => Value::String(value.to_string()),
    }
}

/// Serializes the value as compact JSON.
pub(super) fn json(value: &Value, _: Option<&str>) -> Value {
    match serde_json::to_string(value) {
        Ok(text) => Value::String(text),
        Err(_) => value.clone(),
    }
}

pub(super) fn date(value: &Value, argument: Option<&str>) -> Value {
    let pattern = argument.unwrap_or(DEFAULT_DATE_PATTERN);
    let parsed = match value {
        Value::String(s) => parse_date_time(s),
        other => as_date_time(other),
    };
    match parsed {
        Some(dt) => Value::String(format_date(&dt, pattern)),
        None => value.clone(),
    }
}

pub(super) fn number(value: &Value, argument: Option<&str>) -> Value {
    if !value.is_numeric() {
        return value.clone();
    }
    let pattern = argument.unwrap_or(DEFAULT_NUMBER_PATTERN);
    match format_number(value, pattern) {
        Some(text) => Value::String(text),
        None => value.clone(),
    }
}

pub(super) fn round(value: &Value, argument: Option<&str>) -> Value {
    let places = argument.and_then(|a| a.trim().parse::<u32>().ok()).unwrap_or(0);
    match value {
        Value::Float(f) => {
            let factor = 10f64.powi(places.min(15) as i32);
            let scaled = f * factor;
            if !scaled.is_finite() || f.abs() >= MAX_EXACT_FLOAT {
                return Value::Float(*f);
            }
            Value::Float(scaled.round_ties_even() / factor)
        }
        Value::Decimal(d) => Value::Decimal(d.round_dp(places)),
        other => other.clone(),
    }
}

pub(super) fn floor(value: &Value, _: Option<&str>) -> Value {
    match value {
        Value::Float(f) => Value::Float(f.floor()),
        Value::Decimal(d) => Value::Decimal(d.floor()),
        other => other.clone(),
    }
}

pub(super) fn ceiling(value: &Value, _: Option<&str>) -> Value {
    match value {
        Value::Float(f) => Value::Float(f.ceil()),
        Value::Decimal(d) => Value::Decimal(d.ceil()),
        other => other.clone(),
    }
}
