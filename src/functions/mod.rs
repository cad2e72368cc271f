use crate::errors::{EvalError, Result};
use crate::value::Value;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

pub mod format;

/// Trait for functions callable from template expressions.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> RangeInclusive<usize>;
    fn call(&self, args: &[Value]) -> Result<Value>;
}

/// Thread-safe function registry. Names are case-insensitive.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<String, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(builtins::If);
        reg.register(builtins::Concat);
        reg.register(builtins::Format);
        reg.register(builtins::Equals);
        reg.register(builtins::Contains);
        reg.register(builtins::Upper);
        reg.register(builtins::Lower);
        reg.register(builtins::Substring);
        reg.register(builtins::Regex);
        reg
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name().to_ascii_lowercase(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Look up `name`, check the argument count and invoke it.
    pub fn dispatch(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        let arity = f.arity();
        if !arity.contains(&args.len()) {
            return Err(EvalError::invalid_args(
                f.name(),
                format!("expected {} arguments, got {}", describe(&arity), args.len()),
            ));
        }
        f.call(args)
    }
}

fn describe(arity: &RangeInclusive<usize>) -> String {
    match (*arity.start(), *arity.end()) {
        (lo, hi) if lo == hi => lo.to_string(),
        (lo, usize::MAX) => format!("at least {lo}"),
        (lo, hi) => format!("{lo} to {hi}"),
    }
}

pub mod builtins {
    use super::*;

    fn int_arg(function: &str, args: &[Value], idx: usize) -> Result<i64> {
        args[idx].to_int().ok_or_else(|| {
            EvalError::invalid_args(
                function,
                format!("argument {} is not an integer: {}", idx + 1, args[idx].type_name()),
            )
        })
    }

    pub struct If;
    impl Function for If {
        fn name(&self) -> &'static str { "IF" }
        fn arity(&self) -> RangeInclusive<usize> { 3..=3 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let cond = args[0].to_bool().ok_or_else(|| {
                EvalError::invalid_args("IF", format!("cannot use {} as a condition", args[0].type_name()))
            })?;
            Ok(if cond { args[1].clone() } else { args[2].clone() })
        }
    }

    pub struct Concat;
    impl Function for Concat {
        fn name(&self) -> &'static str { "CONCAT" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(args.iter().map(Value::to_text).collect()))
        }
    }

    pub struct Format;
    impl Function for Format {
        fn name(&self) -> &'static str { "FORMAT" }
        fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let fmt = args[1]
                .as_str()
                .ok_or_else(|| EvalError::invalid_args("FORMAT", "format must be a string"))?;
            super::format::format_value(&args[0], fmt).map(Value::String)
        }
    }

    pub struct Equals;
    impl Function for Equals {
        fn name(&self) -> &'static str { "EQUALS" }
        fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::Bool(args[0] == args[1]))
        }
    }

    pub struct Contains;
    impl Function for Contains {
        fn name(&self) -> &'static str { "CONTAINS" }
        fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            if args.iter().any(Value::is_null) {
                return Ok(Value::Null);
            }
            let haystack = args[0].to_text();
            Ok(Value::Bool(haystack.contains(args[1].to_text().as_str())))
        }
    }

    pub struct Upper;
    impl Function for Upper {
        fn name(&self) -> &'static str { "UPPER" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            if args[0].is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::String(args[0].to_text().to_uppercase()))
        }
    }

    pub struct Lower;
    impl Function for Lower {
        fn name(&self) -> &'static str { "LOWER" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            if args[0].is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::String(args[0].to_text().to_lowercase()))
        }
    }

    /// `SUBSTRING(text, length)` or `SUBSTRING(text, start, length)`, counted in characters.
    /// An absent `text` stays absent.
    pub struct Substring;
    impl Function for Substring {
        fn name(&self) -> &'static str { "SUBSTRING" }
        fn arity(&self) -> RangeInclusive<usize> { 2..=3 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            if args[0].is_null() {
                return Ok(Value::Null);
            }
            let text = args[0].to_text();
            let (start, length) = if args.len() == 2 {
                (0, int_arg("SUBSTRING", args, 1)?)
            } else {
                (int_arg("SUBSTRING", args, 1)?, int_arg("SUBSTRING", args, 2)?)
            };
            if length < 0 {
                return Err(EvalError::invalid_args("SUBSTRING", "length is negative"));
            }
            let count = text.chars().count() as i64;
            if start < 0 || start >= count {
                return Ok(Value::String(String::new()));
            }
            let length = length.min(count - start);
            Ok(Value::String(
                text.chars().skip(start as usize).take(length as usize).collect(),
            ))
        }
    }

    /// `REGEX(input, pattern, group = 1)`, matched case-insensitively.
    pub struct Regex;
    impl Function for Regex {
        fn name(&self) -> &'static str { "REGEX" }
        fn arity(&self) -> RangeInclusive<usize> { 2..=3 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let input = args[0].to_text();
            let pattern = args[1].to_text();
            let group = if args.len() == 3 { int_arg("REGEX", args, 2)? } else { 1 };
            let re = regex::RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| EvalError::invalid_args("REGEX", e.to_string()))?;
            let found = usize::try_from(group)
                .ok()
                .and_then(|g| re.captures(&input)?.get(g))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Ok(Value::String(found))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: Vec<Value>) -> Result<Value> {
        Registry::with_builtins().dispatch(name, &args)
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(call("upper", vec!["ab".into()]).unwrap(), Value::from("AB"));
        assert_eq!(call("Lower", vec!["AB".into()]).unwrap(), Value::from("ab"));
    }

    #[test]
    fn unknown_function() {
        assert!(matches!(
            call("NOPE", vec![]),
            Err(EvalError::UnknownFunction(name)) if name == "NOPE"
        ));
    }

    #[test]
    fn arity_is_checked() {
        assert!(matches!(
            call("IF", vec![true.into()]),
            Err(EvalError::InvalidArguments { .. })
        ));
        assert!(matches!(
            call("CONCAT", vec![]),
            Err(EvalError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn if_picks_branch() {
        let args = |c: Value| vec![c, "A".into(), "B".into()];
        assert_eq!(call("IF", args(true.into())).unwrap(), Value::from("A"));
        assert_eq!(call("IF", args("false".into())).unwrap(), Value::from("B"));
        assert!(call("IF", args("maybe".into())).is_err());
    }

    #[test]
    fn concat_treats_null_as_empty() {
        let out = call("CONCAT", vec!["a".into(), Value::Null, Value::Int(1)]).unwrap();
        assert_eq!(out, Value::from("a1"));
    }

    #[test]
    fn substring_bounds() {
        let sub = |args: Vec<Value>| call("SUBSTRING", args).unwrap();
        assert_eq!(sub(vec!["John".into(), 1.into(), 2.into()]), Value::from("oh"));
        assert_eq!(sub(vec!["John".into(), 10.into(), 2.into()]), Value::from(""));
        assert_eq!(sub(vec!["John".into(), (-1).into(), 2.into()]), Value::from(""));
        assert_eq!(sub(vec!["John".into(), 2.into(), 10.into()]), Value::from("hn"));
        assert_eq!(sub(vec!["John".into(), 3.into()]), Value::from("Joh"));
        assert!(call("SUBSTRING", vec!["John".into(), "x".into()]).is_err());
        assert_eq!(sub(vec!["John".into(), 2.5.into(), 2.into()]), Value::from("hn"));
        assert_eq!(sub(vec!["John".into(), 1.5.into(), 2.into()]), Value::from("hn"));
    }

    #[test]
    fn text_functions_keep_null_absent() {
        assert_eq!(call("UPPER", vec![Value::Null]).unwrap(), Value::Null);
        assert_eq!(call("LOWER", vec![Value::Null]).unwrap(), Value::Null);
        assert_eq!(call("SUBSTRING", vec![Value::Null, 1.into()]).unwrap(), Value::Null);
        assert_eq!(call("CONTAINS", vec![Value::Null, "a".into()]).unwrap(), Value::Null);
        assert_eq!(call("CONTAINS", vec!["a".into(), Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn regex_groups() {
        let re = |args: Vec<Value>| call("REGEX", args).unwrap();
        assert_eq!(re(vec!["Data=42".into(), r"data=(\d+)".into()]), Value::from("42"));
        assert_eq!(re(vec!["Data=42".into(), r"(D)ata=(\d+)".into(), 2.into()]), Value::from("42"));
        assert_eq!(re(vec!["Data=42".into(), r"x(\d)".into()]), Value::from(""));
        assert_eq!(re(vec!["Data=42".into(), r"Data=\d+".into()]), Value::from(""));
        assert!(call("REGEX", vec!["a".into(), "(".into()]).is_err());
    }

    #[test]
    fn equals_and_contains() {
        assert_eq!(call("EQUALS", vec![1.into(), 1.into()]).unwrap(), Value::Bool(true));
        assert_eq!(call("EQUALS", vec![1.into(), "1".into()]).unwrap(), Value::Bool(false));
        assert_eq!(
            call("CONTAINS", vec!["Invoice 42".into(), "42".into()]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("CONTAINS", vec!["Invoice".into(), "invoice".into()]).unwrap(),
            Value::Bool(false)
        );
    }

    struct Reverse;
    impl Function for Reverse {
        fn name(&self) -> &'static str { "REVERSE" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(args[0].to_text().chars().rev().collect()))
        }
    }

    #[test]
    fn custom_functions_can_be_registered() {
        let mut reg = Registry::with_builtins();
        reg.register(Reverse);
        assert_eq!(reg.dispatch("reverse", &["abc".into()]).unwrap(), Value::from("cba"));
    }
}
