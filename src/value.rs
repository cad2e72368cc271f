use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value as Json;
use std::fmt;

/// Layout used when a date-time is stringified without an explicit format.
pub const DATETIME_DISPLAY: &str = "%Y-%m-%d %H:%M:%S";

/// Result of evaluating one expression.
///
/// Equality is per variant: `Int(1)` and `Decimal(1)` are different values,
/// while `Decimal(1.0)` and `Decimal(1.00)` are the same.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
    String(String),
    DateTime(NaiveDateTime),
    /// JSON object or array; further path segments navigate into it.
    Object(Json),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::Decimal(_) | Value::Float(_) | Value::Double(_)
        )
    }

    /// Text used when a value is spliced into output. Null renders as empty.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Boolean coercion used by `IF`.
    ///
    /// Strings must spell `true` or `false` (any case); dates and objects
    /// have no boolean meaning.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Null => Some(false),
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::Decimal(d) => Some(!d.is_zero()),
            Value::Float(f) => Some(*f != 0.0),
            Value::Double(f) => Some(*f != 0.0),
            Value::String(s) => {
                let t = s.trim();
                if t.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if t.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            Value::DateTime(_) | Value::Object(_) => None,
        }
    }

    /// Integer coercion used for positional arguments. Fractions round half to even.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Decimal(d) => d
                .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
                .to_i64(),
            Value::Float(f) => float_to_int(f64::from(*f)),
            Value::Double(f) => float_to_int(*f),
            Value::String(s) => s.trim().parse().ok(),
            Value::Null | Value::DateTime(_) | Value::Object(_) => None,
        }
    }

    /// Lift a JSON value: scalars become typed values, containers stay navigable.
    pub fn from_json(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Double).unwrap_or(Value::Null),
            },
            Json::String(s) => Value::String(s),
            container @ (Json::Array(_) | Json::Object(_)) => Value::Object(container),
        }
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    let r = f.round_ties_even();
    if r.is_finite() && r >= i64::MIN as f64 && r <= i64::MAX as f64 {
        Some(r as i64)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_DISPLAY)),
            Value::Object(json) => write!(f, "{json}"),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::from_json(json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
