// src/parser.rs
use crate::value::Value;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Cursor over a function call's argument text.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Split at commas that sit outside any parentheses.
    ///
    /// Quotes are not tracked: `'a,b'` splits into two pieces, and a
    /// parenthesis inside a string literal shifts the depth.
    pub fn split_args(mut self) -> Vec<&'a str> {
        let mut out = Vec::new();
        if self.s.trim().is_empty() {
            return out;
        }
        let mut depth: i32 = 0;
        let mut start = 0;
        while let Some(c) = self.peek_char() {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    out.push(self.s[start..self.i].trim());
                    start = self.i + 1;
                }
                _ => {}
            }
            self.i += c.len_utf8();
        }
        out.push(self.s[start..].trim());
        out
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }
}

/// Classify `text` as a literal, first matching rule wins:
/// single-quoted, double-quoted, integer, decimal, float, double.
pub fn parse_literal(text: &str) -> Option<Value> {
    if let Some(s) = unquote(text, '\'').or_else(|| unquote(text, '"')) {
        return Some(Value::String(s.to_string()));
    }
    if !looks_numeric(text) {
        return None;
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Int(n));
    }
    if let Ok(d) = Decimal::from_str(text) {
        return Some(Value::Decimal(d));
    }
    if let Ok(f) = text.parse::<f32>() {
        return Some(Value::Float(f));
    }
    text.parse::<f64>().ok().map(Value::Double)
}

// No escape processing: the quotes are simply stripped.
fn unquote(text: &str, quote: char) -> Option<&str> {
    let q = quote.len_utf8();
    if text.len() >= 2 * q && text.starts_with(quote) && text.ends_with(quote) {
        Some(&text[q..text.len() - q])
    } else {
        None
    }
}

// Keeps words like `inf` or `NaN` resolvable as paths.
fn looks_numeric(text: &str) -> bool {
    let body = text.strip_prefix(&['-', '+'][..]).unwrap_or(text);
    body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}
