use crate::value::Value;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Producer of a static member's current value.
pub type StaticMember = Arc<dyn Fn() -> Value + Send + Sync>;

type Members = HashMap<String, StaticMember>;

/// Known type names whose static members paths may start from,
/// e.g. `DateTime.Now.Year` or `System.Math.PI`.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    inner: Arc<HashMap<String, Members>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut reg = Self::new();

        reg.register("DateTime", "Now", || Value::DateTime(now_local()));
        reg.register("DateTime", "Today", || Value::DateTime(today_local()));
        reg.register("DateTime", "UtcNow", || Value::DateTime(now_utc()));
        reg.register("DateTime", "MinValue", || Value::DateTime(NaiveDateTime::MIN));
        reg.register("DateTime", "MaxValue", || Value::DateTime(NaiveDateTime::MAX));

        reg.register("Math", "PI", || Value::Double(std::f64::consts::PI));
        reg.register("Math", "E", || Value::Double(std::f64::consts::E));

        reg.register("String", "Empty", || Value::String(String::new()));

        reg.register("Environment", "NewLine", || Value::from("\n"));
        reg.register("Environment", "UserName", || {
            env_first(&["USER", "USERNAME"])
        });
        reg.register("Environment", "MachineName", || {
            env_first(&["HOSTNAME", "COMPUTERNAME"])
        });
        reg.register("Environment", "CurrentDirectory", || {
            std::env::current_dir()
                .ok()
                .map(|p| p.display().to_string())
                .into()
        });

        for name in ["DateTime", "Math", "String", "Environment"] {
            reg.alias(&format!("System.{name}"), name);
        }
        reg
    }

    pub fn register<F>(&mut self, type_name: &str, member: &str, f: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.inner)
            .entry(type_name.to_string())
            .or_default()
            .insert(member.to_string(), Arc::new(f));
    }

    /// Make `alias` resolve to the members `existing` has right now.
    pub fn alias(&mut self, alias: &str, existing: &str) {
        let Some(members) = self.inner.get(existing).cloned() else {
            return;
        };
        Arc::make_mut(&mut self.inner).insert(alias.to_string(), members);
    }

    pub fn contains_type(&self, type_name: &str) -> bool {
        self.inner.contains_key(type_name)
    }

    /// Read `type_name.member`. `None` when either name is unknown.
    pub fn lookup(&self, type_name: &str, member: &str) -> Option<Value> {
        self.inner.get(type_name)?.get(member).map(|f| f())
    }
}

pub(crate) fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub(crate) fn today_local() -> NaiveDateTime {
    start_of_day(Local::now().date_naive())
}

pub(crate) fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn env_first(keys: &[&str]) -> Value {
    keys.iter()
        .find_map(|k| std::env::var(k).ok())
        .into()
}

/// Midnight of `date`.
pub(crate) fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn builtin_members() {
        let reg = TypeRegistry::with_builtins();
        assert_eq!(
            reg.lookup("Math", "PI"),
            Some(Value::Double(std::f64::consts::PI))
        );
        assert_eq!(reg.lookup("String", "Empty"), Some(Value::from("")));
        assert_eq!(reg.lookup("Math", "Tau"), None);
        assert_eq!(reg.lookup("Nope", "PI"), None);
    }

    #[test]
    fn today_has_no_time_component() {
        let reg = TypeRegistry::with_builtins();
        match reg.lookup("DateTime", "Today") {
            Some(Value::DateTime(dt)) => {
                assert_eq!((dt.hour(), dt.minute(), dt.second()), (0, 0, 0))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn system_aliases() {
        let reg = TypeRegistry::with_builtins();
        assert!(reg.contains_type("System.Math"));
        assert_eq!(reg.lookup("System.String", "Empty"), Some(Value::from("")));
    }

    #[test]
    fn custom_type() {
        let mut reg = TypeRegistry::new();
        reg.register("App", "Version", || Value::from("1.2.3"));
        assert_eq!(reg.lookup("App", "Version"), Some(Value::from("1.2.3")));
    }
}
