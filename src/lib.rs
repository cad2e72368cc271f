pub mod errors;
pub mod context;
pub mod engine;
pub mod escape;
pub mod functions;  // built-ins plus host-registered functions
pub mod replacements;
pub mod statics;
pub mod value;
mod expression;
mod parser;
mod path;
mod scanner;

use once_cell::sync::Lazy;

pub use context::{Context, MemberSource};
pub use engine::EngineOptions;
pub use errors::{EvalError, Result};
pub use functions::{Function, Registry};
pub use replacements::{EscapeFunctions, KnownReplacements, WILDCARD};
pub use statics::TypeRegistry;
pub use value::Value;

/// Renders `{{...}}` templates. Cheap to clone and safe to share across threads;
/// every render gets its own evaluation cache.
#[derive(Clone)]
pub struct TemplateEngine {
    functions: Registry,
    types: TypeRegistry,
    options: EngineOptions,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Engine with the built-in functions and static types.
    pub fn new() -> Self {
        Self {
            functions: Registry::with_builtins(),
            types: TypeRegistry::with_builtins(),
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_functions(mut self, functions: Registry) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    pub fn functions_mut(&mut self) -> &mut Registry {
        &mut self.functions
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Render `template`; an absent template stays absent.
    ///
    /// Fails only for an unknown function name or a failing known-replacement
    /// transform. Any other problem leaves the affected placeholder as written.
    pub fn evaluate_template(
        &self,
        template: Option<&str>,
        ctx: &Context,
        known: &KnownReplacements,
        escapes: &EscapeFunctions,
    ) -> Result<Option<String>> {
        template
            .map(|t| self.render(t, ctx, known, escapes))
            .transpose()
    }

    pub fn render(
        &self,
        template: &str,
        ctx: &Context,
        known: &KnownReplacements,
        escapes: &EscapeFunctions,
    ) -> Result<String> {
        engine::render(
            template,
            ctx,
            known,
            escapes,
            &self.functions,
            &self.types,
            &self.options,
        )
    }

    /// Evaluate one bare expression (no `{{ }}`), e.g. `UPPER(Subject)`.
    pub fn eval(&self, expr: &str, ctx: &Context) -> Result<Value> {
        expression::Evaluator {
            ctx,
            functions: &self.functions,
            types: &self.types,
            max_depth: self.options.max_depth,
        }
        .eval(expr)
    }
}

static DEFAULT_ENGINE: Lazy<TemplateEngine> = Lazy::new(TemplateEngine::new);

/// Convenience: render with the default engine.
pub fn evaluate_template(
    template: Option<&str>,
    ctx: &Context,
    known: &KnownReplacements,
    escapes: &EscapeFunctions,
) -> Result<Option<String>> {
    DEFAULT_ENGINE.evaluate_template(template, ctx, known, escapes)
}

/// Convenience: render with no replacements or escaping.
pub fn render(template: &str, ctx: &Context) -> Result<String> {
    DEFAULT_ENGINE.render(template, ctx, &KnownReplacements::new(), &EscapeFunctions::new())
}
