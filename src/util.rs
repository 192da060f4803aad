// Utility helpers for parsing and number formatting.
//
// This module centralizes all the "dirty" spreadsheet text handling so the
// engine can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

use crate::types::PercentChange;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace and strips currency symbols, `%` and thousands
///   separators.
/// - Accepts accounting negatives like `(1,250.00)`.
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let (negative, body) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%' | ' '))
        .collect();
    let v = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negative { -v } else { v })
}

pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    // `?` propagates `None` early if the option is missing.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

/// Month as `1..=12`, `"06"`, `"Jun"` or `"June"`.
pub fn parse_month_safe(s: Option<&str>) -> Option<u32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    s.parse::<chrono::Month>().ok().map(|m| m.number_from_month())
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, n.abs());
    // The sign follows the rounded text, so -0.004 prints as `0.00`.
    let neg = n < 0.0 && s.bytes().any(|b| matches!(b, b'1'..=b'9'));
    let (int_part, frac_part) = match s.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (s.as_str(), None),
    };
    // Use `num-format` to insert commas into the integer portion; anything
    // too wide for `u128` keeps its plain digits.
    let mut res = int_part
        .parse::<u128>()
        .map(|v| v.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| int_part.to_string());
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values, used for
    // counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

/// `+12.50%`, `-3.00%`, or `N/A` when there was no baseline.
pub fn format_change(change: PercentChange) -> String {
    match change {
        PercentChange::Percent(p) if p > 0.0 => format!("+{}%", format_number(p, 2)),
        PercentChange::Percent(p) => format!("{}%", format_number(p, 2)),
        PercentChange::NotAvailable => "N/A".to_string(),
    }
}
