//! Format-string rendering behind `FORMAT`.
//!
//! Date-times accept strftime patterns (anything containing `%`), the
//! standard single-letter formats and custom `yyyy-MM-dd HH:mm` style
//! patterns. Numbers accept standard specifiers (`F2`, `N0`, `P1`, `D5`,
//! `X4`, ...) and custom `#,##0.00` patterns. Output uses invariant culture.

use crate::errors::{EvalError, Result};
use crate::value::Value;
use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, NaiveDateTime, Timelike};
use itertools::Itertools;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;
use std::str::FromStr;

const MAX_SCALE: u32 = 28;
/// Largest precision digit count a standard numeric format accepts.
const MAX_PRECISION: u32 = 99;

/// Render `value` with `fmt`. Values with no format semantics stringify.
pub fn format_value(value: &Value, fmt: &str) -> Result<String> {
    match value {
        Value::DateTime(dt) => format_datetime(dt, fmt),
        v if v.is_numeric() => match to_decimal(v) {
            Some(d) => format_number(d, v, fmt),
            None => Ok(v.to_text()),
        },
        other => Ok(other.to_text()),
    }
}

pub fn format_datetime(dt: &NaiveDateTime, fmt: &str) -> Result<String> {
    if fmt.contains('%') {
        return strftime(dt, fmt);
    }
    let pattern = match fmt {
        "d" => "MM/dd/yyyy",
        "D" => "dddd, dd MMMM yyyy",
        "t" => "HH:mm",
        "T" => "HH:mm:ss",
        "g" => "MM/dd/yyyy HH:mm",
        "G" => "MM/dd/yyyy HH:mm:ss",
        "f" => "dddd, dd MMMM yyyy HH:mm",
        "F" => "dddd, dd MMMM yyyy HH:mm:ss",
        "s" => "yyyy'-'MM'-'dd'T'HH':'mm':'ss",
        "u" => "yyyy'-'MM'-'dd HH':'mm':'ss'Z'",
        "o" | "O" => "yyyy'-'MM'-'dd'T'HH':'mm':'ss'.'fffffff",
        "" => return Ok(Value::DateTime(*dt).to_text()),
        single if single.chars().count() == 1 => {
            return Err(EvalError::Format(format!(
                "unknown date format specifier `{single}`"
            )))
        }
        custom => custom,
    };
    Ok(custom_datetime(dt, pattern))
}

fn strftime(dt: &NaiveDateTime, fmt: &str) -> Result<String> {
    let items: Vec<Item> = StrftimeItems::new(fmt).collect();
    if items.iter().any(|i| matches!(i, Item::Error)) {
        return Err(EvalError::Format(format!("invalid strftime pattern `{fmt}`")));
    }
    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(items.into_iter()))
        .map_err(|_| EvalError::Format(format!("cannot apply `{fmt}` to a local date-time")))?;
    Ok(out)
}

fn custom_datetime(dt: &NaiveDateTime, pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    out.push(chars[i]);
                    i += 1;
                }
                i += 1;
                continue;
            }
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                }
                i += 2;
                continue;
            }
            _ => {}
        }
        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let piece = match (c, run) {
            ('y', 1) => (dt.year() % 100).to_string(),
            ('y', 2) => format!("{:02}", dt.year() % 100),
            ('y', n) => format!("{:0n$}", dt.year()),
            ('M', 1) => dt.month().to_string(),
            ('M', 2) => format!("{:02}", dt.month()),
            ('M', 3) => dt.format("%b").to_string(),
            ('M', _) => dt.format("%B").to_string(),
            ('d', 1) => dt.day().to_string(),
            ('d', 2) => format!("{:02}", dt.day()),
            ('d', 3) => dt.format("%a").to_string(),
            ('d', _) => dt.format("%A").to_string(),
            ('H', 1) => dt.hour().to_string(),
            ('H', _) => format!("{:02}", dt.hour()),
            ('h', 1) => dt.hour12().1.to_string(),
            ('h', _) => format!("{:02}", dt.hour12().1),
            ('m', 1) => dt.minute().to_string(),
            ('m', _) => format!("{:02}", dt.minute()),
            ('s', 1) => dt.second().to_string(),
            ('s', _) => format!("{:02}", dt.second()),
            ('f' | 'F', n) => {
                let nanos = format!("{:09}", dt.nanosecond() % 1_000_000_000);
                let digits = &nanos[..n.min(9)];
                if c == 'F' {
                    digits.trim_end_matches('0').to_string()
                } else {
                    digits.to_string()
                }
            }
            ('t', n) => {
                let marker = if dt.hour12().0 { "PM" } else { "AM" };
                if n == 1 {
                    marker[..1].to_string()
                } else {
                    marker.to_string()
                }
            }
            (other, n) => std::iter::repeat(other).take(n).collect(),
        };
        out.push_str(&piece);
        i += run;
    }
    out
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Int(n) => Some(Decimal::from(*n)),
        Value::Decimal(d) => Some(*d),
        Value::Float(f) if f.is_finite() => Decimal::from_str(&f.to_string()).ok(),
        Value::Double(f) if f.is_finite() => Decimal::from_str(&f.to_string()).ok(),
        _ => None,
    }
}

fn format_number(d: Decimal, source: &Value, fmt: &str) -> Result<String> {
    if fmt.is_empty() {
        return Ok(source.to_text());
    }
    let mut chars = fmt.chars();
    let spec = chars.next().unwrap_or_default();
    let rest = chars.as_str();
    if spec.is_ascii_alphabetic() && rest.bytes().all(|b| b.is_ascii_digit()) {
        let precision = if rest.is_empty() {
            None
        } else {
            Some(
                rest.parse::<u32>()
                    .map_err(|_| EvalError::Format(format!("bad precision in `{fmt}`")))?,
            )
        };
        if precision.is_some_and(|p| p > MAX_PRECISION) {
            return Err(EvalError::Format(format!(
                "precision in `{fmt}` exceeds {MAX_PRECISION}"
            )));
        }
        return standard_number(d, source, spec, precision);
    }
    custom_number(d, fmt)
}

fn standard_number(d: Decimal, source: &Value, spec: char, precision: Option<u32>) -> Result<String> {
    let out = match spec.to_ascii_uppercase() {
        'F' => fixed(d, precision.unwrap_or(2)),
        'N' => group(&fixed(d, precision.unwrap_or(2))),
        'P' => {
            let scaled = d
                .checked_mul(Decimal::ONE_HUNDRED)
                .ok_or_else(|| EvalError::Format("percentage out of range".into()))?;
            format!("{} %", group(&fixed(scaled, precision.unwrap_or(2))))
        }
        'C' => {
            let body = group(&fixed(d.abs(), precision.unwrap_or(2)));
            if d.is_sign_negative() && !d.is_zero() {
                format!("-¤{body}")
            } else {
                format!("¤{body}")
            }
        }
        'D' => {
            let Value::Int(n) = source else {
                return Err(EvalError::Format("`D` requires an integer".into()));
            };
            let width = precision.unwrap_or(0) as usize;
            let digits = format!("{:0width$}", n.unsigned_abs());
            if *n < 0 {
                format!("-{digits}")
            } else {
                digits
            }
        }
        'X' => {
            let Value::Int(n) = source else {
                return Err(EvalError::Format("`X` requires an integer".into()));
            };
            let width = precision.unwrap_or(0) as usize;
            if spec == 'x' {
                format!("{n:0width$x}")
            } else {
                format!("{n:0width$X}")
            }
        }
        'E' => {
            let f = d
                .to_f64()
                .ok_or_else(|| EvalError::Format("value out of range".into()))?;
            let p = precision.unwrap_or(6) as usize;
            let sci = format!("{f:.p$e}");
            let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            let letter = if spec == 'e' { 'e' } else { 'E' };
            format!("{mantissa}{letter}{sign}{:03}", exp.abs())
        }
        'G' => source.to_text(),
        _ => {
            return Err(EvalError::Format(format!(
                "unknown numeric format specifier `{spec}`"
            )))
        }
    };
    Ok(out)
}

/// `d` rounded half away from zero, with exactly `dp` fraction digits.
fn fixed(d: Decimal, dp: u32) -> String {
    let dp = dp.min(MAX_SCALE);
    let mut r = d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    r.rescale(dp);
    r.to_string()
}

/// Insert thousands separators into the integer part of a plain number.
fn group(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let grouped = int_part
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(String::from_utf8_lossy)
        .join(",");
    match frac {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

fn custom_number(d: Decimal, fmt: &str) -> Result<String> {
    let is_placeholder = |c: char| matches!(c, '0' | '#' | '.' | ',');
    let (Some(first), Some(last)) = (fmt.find(is_placeholder), fmt.rfind(is_placeholder)) else {
        return Ok(fmt.to_string());
    };
    let prefix = &fmt[..first];
    let body = &fmt[first..=last];
    let suffix = &fmt[last + 1..];

    let value = if fmt.contains('%') {
        d.checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| EvalError::Format("percentage out of range".into()))?
    } else {
        d
    };

    let (int_pat, frac_pat) = body.split_once('.').unwrap_or((body, ""));
    let min_int = int_pat.matches('0').count();
    let min_frac = frac_pat.matches('0').count();
    let max_frac = frac_pat.chars().filter(|c| matches!(c, '0' | '#')).count();

    let rounded = value.round_dp_with_strategy(max_frac as u32, RoundingStrategy::MidpointAwayFromZero);
    let text = fixed(rounded.abs(), max_frac as u32);
    let (int_digits, frac_digits) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut frac = frac_digits.to_string();
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }
    let int_digits = if min_int == 0 && int_digits == "0" {
        String::new()
    } else {
        format!("{int_digits:0>min_int$}")
    };
    let int_digits = if int_pat.contains(',') && !int_digits.is_empty() {
        group(&int_digits)
    } else {
        int_digits
    };

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let mut out = format!("{sign}{prefix}{int_digits}");
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out.push_str(suffix);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn dt() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(7, 5, 3, 120)
            .unwrap()
    }

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn custom_date_patterns() {
        assert_eq!(format_datetime(&dt(), "yyyy-MM-dd HH:mm").unwrap(), "2024-03-09 07:05");
        assert_eq!(format_datetime(&dt(), "dddd, MMMM d").unwrap(), "Saturday, March 9");
        assert_eq!(format_datetime(&dt(), "h:mm tt").unwrap(), "7:05 AM");
        assert_eq!(format_datetime(&dt(), "ss.fff").unwrap(), "03.120");
        assert_eq!(format_datetime(&dt(), "'at' HH'h'").unwrap(), "at 07h");
    }

    #[test]
    fn standard_and_strftime_dates() {
        assert_eq!(format_datetime(&dt(), "d").unwrap(), "03/09/2024");
        assert_eq!(format_datetime(&dt(), "s").unwrap(), "2024-03-09T07:05:03");
        assert_eq!(format_datetime(&dt(), "%Y/%m").unwrap(), "2024/03");
        assert!(format_datetime(&dt(), "Q").is_err());
        assert!(format_datetime(&dt(), "%Y %Q").is_err());
    }

    #[test]
    fn standard_numbers() {
        assert_eq!(format_value(&dec("1234.5"), "N2").unwrap(), "1,234.50");
        assert_eq!(format_value(&dec("2.345"), "F2").unwrap(), "2.35");
        assert_eq!(format_value(&dec("0.125"), "P1").unwrap(), "12.5 %");
        assert_eq!(format_value(&Value::Int(42), "D5").unwrap(), "00042");
        assert_eq!(format_value(&Value::Int(-42), "D4").unwrap(), "-0042");
        assert_eq!(format_value(&Value::Int(255), "X4").unwrap(), "00FF");
        assert_eq!(format_value(&Value::Double(1234.5), "E2").unwrap(), "1.23E+003");
        assert!(format_value(&dec("1.5"), "D").is_err());
    }

    #[test]
    fn precision_is_capped() {
        assert!(format_value(&Value::Int(1), "D999999999").is_err());
        assert!(format_value(&Value::Int(255), "X100").is_err());
        assert!(format_value(&Value::Int(1), "E1000").is_err());
        assert_eq!(format_value(&Value::Int(7), "D99").unwrap().len(), 99);
    }

    #[test]
    fn custom_numbers() {
        assert_eq!(format_value(&dec("3.14159"), "0.00").unwrap(), "3.14");
        assert_eq!(format_value(&Value::Int(1234567), "#,##0").unwrap(), "1,234,567");
        assert_eq!(format_value(&dec("0.5"), "#.##").unwrap(), ".5");
        assert_eq!(format_value(&dec("-2.5"), "0.0#").unwrap(), "-2.5");
        assert_eq!(format_value(&dec("0.256"), "0.0%").unwrap(), "25.6%");
        assert_eq!(format_value(&Value::Int(7), "Item 000").unwrap(), "Item 007");
    }

    #[test]
    fn non_formattable_values_stringify() {
        assert_eq!(format_value(&Value::from("abc"), "N2").unwrap(), "abc");
        assert_eq!(format_value(&Value::Null, "N2").unwrap(), "");
        assert_eq!(format_value(&Value::Double(f64::NAN), "N2").unwrap(), "NaN");
    }
}
