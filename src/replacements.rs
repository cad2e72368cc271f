use crate::errors::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Produces the text substituted for a known-replacement key.
pub type Transform = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Sanitizes a value before it is spliced into the output.
pub type EscapeFn = Arc<dyn Fn(Option<&str>) -> Option<String> + Send + Sync>;

/// Escape key that applies to every placeholder without an exact entry.
pub const WILDCARD: &str = "*";

/// Literal substrings replaced across the whole template before any
/// placeholder is evaluated, in insertion order.
#[derive(Clone, Default)]
pub struct KnownReplacements {
    entries: Vec<(String, Transform)>,
}

impl KnownReplacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the transform for `key`. A replaced key keeps its position.
    pub fn insert<F>(&mut self, key: impl Into<String>, transform: F) -> &mut Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        let key = key.into();
        let transform: Transform = Arc::new(transform);
        match self.entries.iter_mut().find(|entry| entry.0 == key) {
            Some(entry) => entry.1 = transform,
            None => self.entries.push((key, transform)),
        }
        self
    }

    /// Replace `key` with a fixed text.
    pub fn insert_text(&mut self, key: impl Into<String>, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        self.insert(key, move |_| Ok(text.clone()))
    }

    pub fn with<F>(mut self, key: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        self.insert(key, transform);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Transform)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sanitizers keyed by placeholder expression (or replacement key), plus the `*` fallback.
#[derive(Clone, Default)]
pub struct EscapeFunctions {
    by_key: HashMap<String, EscapeFn>,
}

impl EscapeFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, key: impl Into<String>, escape: F) -> &mut Self
    where
        F: Fn(Option<&str>) -> Option<String> + Send + Sync + 'static,
    {
        self.by_key.insert(key.into(), Arc::new(escape));
        self
    }

    pub fn with<F>(mut self, key: impl Into<String>, escape: F) -> Self
    where
        F: Fn(Option<&str>) -> Option<String> + Send + Sync + 'static,
    {
        self.insert(key, escape);
        self
    }

    /// Exact entry for `key`, else the wildcard entry.
    pub fn resolve(&self, key: &str) -> Option<&EscapeFn> {
        self.by_key.get(key).or_else(|| self.by_key.get(WILDCARD))
    }

    /// Escape `text` for `key`. A sanitizer returning `None` yields empty text.
    pub fn apply(&self, key: &str, text: String) -> String {
        match self.resolve(key) {
            Some(escape) => escape(Some(&text)).unwrap_or_default(),
            None => text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Run every known replacement over `text`, each against the output of the previous one.
///
/// Transform errors are returned as-is; nothing here is swallowed.
pub fn apply_known(
    mut text: String,
    known: &KnownReplacements,
    escapes: &EscapeFunctions,
) -> Result<String> {
    for (key, transform) in known.iter() {
        if key.is_empty() || !text.contains(key) {
            continue;
        }
        let replacement = escapes.apply(key, transform(key)?);
        tracing::trace!(key, "applying known replacement");
        text = text.replace(key, &replacement);
    }
    Ok(text)
}
