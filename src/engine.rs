use crate::context::Context;
use crate::errors::Result;
use crate::expression::Evaluator;
use crate::functions::Registry;
use crate::replacements::{apply_known, EscapeFunctions, KnownReplacements};
use crate::scanner;
use crate::statics::TypeRegistry;
use crate::value::Value;
use std::collections::HashMap;

/// Default limit on nested function calls in one expression.
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Deeper nesting fails the placeholder instead of growing the stack.
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// Values already computed during one render, keyed by trimmed expression text.
#[derive(Default)]
pub(crate) struct EvalCache {
    values: HashMap<String, Value>,
}

impl EvalCache {
    pub(crate) fn get_or_eval<F>(&mut self, expr: &str, eval: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        if let Some(v) = self.values.get(expr) {
            tracing::trace!(expr, "cache hit");
            return Ok(v.clone());
        }
        let v = eval()?;
        self.values.insert(expr.to_string(), v.clone());
        Ok(v)
    }
}

/// Known replacements first, then every placeholder from last to first.
pub(crate) fn render(
    template: &str,
    ctx: &Context,
    known: &KnownReplacements,
    escapes: &EscapeFunctions,
    functions: &Registry,
    types: &TypeRegistry,
    options: &EngineOptions,
) -> Result<String> {
    if template.is_empty() {
        return Ok(String::new());
    }
    let mut text = apply_known(template.to_string(), known, escapes)?;

    let placeholders = scanner::scan(&text);
    if placeholders.is_empty() {
        return Ok(text);
    }

    let evaluator = Evaluator {
        ctx,
        functions,
        types,
        max_depth: options.max_depth,
    };
    let mut cache = EvalCache::default();

    for ph in placeholders.iter().rev() {
        let value = match cache.get_or_eval(&ph.expr, || evaluator.eval(&ph.expr)) {
            Ok(v) => v,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::debug!(expr = %ph.expr, error = %e, "placeholder left unchanged");
                continue;
            }
        };
        if value.is_null() {
            tracing::debug!(expr = %ph.expr, "placeholder resolved to null, left unchanged");
            continue;
        }
        let replacement = escapes.apply(&ph.expr, value.to_text());
        text.replace_range(ph.start..ph.end(), &replacement);
    }
    Ok(text)
}
