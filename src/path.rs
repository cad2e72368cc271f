use crate::context::{Context, MemberSource};
use crate::statics::{start_of_day, TypeRegistry};
use crate::value::Value;
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde_json::Value as Json;

/// Resolve a dotted path such as `Sender.Address` or `DateTime.Now.Year`.
///
/// Every miss, including stepping through a null, yields `Value::Null`.
pub fn resolve(path: &str, ctx: &Context, types: &TypeRegistry) -> Value {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((mut current, consumed)) = resolve_root(&segments, ctx, types) else {
        tracing::trace!(path, "path root not found");
        return Value::Null;
    };
    for seg in &segments[consumed..] {
        if current.is_null() {
            return Value::Null;
        }
        match member_of(&current, seg) {
            Some(v) => current = v,
            None => {
                tracing::trace!(path, segment = *seg, "path segment not found");
                return Value::Null;
            }
        }
    }
    current
}

/// Root value and how many segments it used.
///
/// Context mapping, then context record, then a static member of a known
/// type whose name is the leading segment(s).
fn resolve_root(segments: &[&str], ctx: &Context, types: &TypeRegistry) -> Option<(Value, usize)> {
    let first = segments.first()?;
    if let Some(v) = ctx.resolve(first) {
        return Some((v, 1));
    }
    for k in 1..segments.len() {
        let type_name = segments[..k].join(".");
        if types.contains_type(&type_name) {
            return types.lookup(&type_name, segments[k]).map(|v| (v, k + 1));
        }
    }
    None
}

/// One navigation step from `value`.
pub fn member_of(value: &Value, name: &str) -> Option<Value> {
    match value {
        Value::Object(Json::Object(fields)) => fields.member(name),
        Value::Object(Json::Array(items)) => match name {
            "Length" | "Count" => Some(Value::Int(items.len() as i64)),
            _ => name
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .map(Value::from_json),
        },
        Value::DateTime(dt) => datetime_member(dt, name),
        Value::String(s) if name == "Length" => Some(Value::Int(s.chars().count() as i64)),
        _ => None,
    }
}

fn datetime_member(dt: &NaiveDateTime, name: &str) -> Option<Value> {
    let v = match name {
        "Year" => Value::Int(i64::from(dt.year())),
        "Month" => Value::Int(i64::from(dt.month())),
        "Day" => Value::Int(i64::from(dt.day())),
        "Hour" => Value::Int(i64::from(dt.hour())),
        "Minute" => Value::Int(i64::from(dt.minute())),
        "Second" => Value::Int(i64::from(dt.second())),
        "Millisecond" => Value::Int(i64::from(dt.nanosecond() / 1_000_000)),
        "DayOfYear" => Value::Int(i64::from(dt.ordinal())),
        "DayOfWeek" => Value::String(dt.format("%A").to_string()),
        "Date" => Value::DateTime(start_of_day(dt.date())),
        "TimeOfDay" => Value::String(dt.format("%H:%M:%S").to_string()),
        _ => return None,
    };
    Some(v)
}
