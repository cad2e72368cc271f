use crate::errors::{EvalError, Result};
use crate::value::Value;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::collections::{BTreeMap, HashMap};

/// Anything a path segment can be looked up in.
pub trait MemberSource {
    fn member(&self, name: &str) -> Option<Value>;
}

impl MemberSource for HashMap<String, Value> {
    fn member(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl MemberSource for BTreeMap<String, Value> {
    fn member(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl MemberSource for Map<String, Json> {
    fn member(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Value::from_json)
    }
}

/// Data source that template paths are resolved against.
#[derive(Debug, Clone, Default)]
pub enum Context {
    #[default]
    Empty,
    /// Key/value mapping supplied by the caller.
    Mapping(HashMap<String, Value>),
    /// Named fields of a serialized struct. Lookups are case-sensitive.
    Record(Map<String, Json>),
}

impl Context {
    pub fn mapping<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Context::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Capture the public fields of `record` through its `Serialize` impl.
    pub fn record<T: Serialize + ?Sized>(record: &T) -> Result<Self> {
        match serde_json::to_value(record) {
            Ok(Json::Object(fields)) => Ok(Context::Record(fields)),
            Ok(Json::Null) => Ok(Context::Empty),
            Ok(other) => Err(EvalError::InvalidContext(format!(
                "record must serialize to named fields, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(EvalError::InvalidContext(e.to_string())),
        }
    }

    /// Mapping lookup first, then record member lookup.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        self.as_mapping()
            .and_then(|m| m.member(name))
            .or_else(|| self.as_record().and_then(|r| r.member(name)))
    }

    fn as_mapping(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Context::Mapping(m) => Some(m),
            _ => None,
        }
    }

    fn as_record(&self) -> Option<&Map<String, Json>> {
        match self {
            Context::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl From<HashMap<String, Value>> for Context {
    fn from(map: HashMap<String, Value>) -> Self {
        Context::Mapping(map)
    }
}

/// JSON objects become records; `null` becomes the empty context.
impl TryFrom<Json> for Context {
    type Error = EvalError;

    fn try_from(json: Json) -> Result<Self> {
        Context::record(&json)
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Serialize)]
    struct Mail {
        #[serde(rename = "Subject")]
        subject: String,
        size: u32,
    }

    #[test]
    fn record_members_are_case_sensitive() {
        let ctx = Context::record(&Mail {
            subject: "Hello".into(),
            size: 12,
        })
        .unwrap();
        assert_eq!(ctx.resolve("Subject"), Some(Value::from("Hello")));
        assert_eq!(ctx.resolve("subject"), None);
        assert_eq!(ctx.resolve("size"), Some(Value::Int(12)));
    }

    #[test]
    fn mapping_lookup() {
        let ctx = Context::mapping([("name", "Ada")]);
        assert_eq!(ctx.resolve("name"), Some(Value::from("Ada")));
        assert_eq!(ctx.resolve("missing"), None);
        assert_eq!(Context::Empty.resolve("name"), None);
    }

    #[test]
    fn scalar_record_is_rejected() {
        assert!(matches!(
            Context::record(&42),
            Err(EvalError::InvalidContext(_))
        ));
    }
}
