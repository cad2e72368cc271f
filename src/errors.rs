use thiserror::Error; // Import the `Error` derive macro from the `thiserror` crate

// Errors raised while rendering a template.
//
// Only `UnknownFunction` and `Replacement` abort a render; every other variant
// is local to one placeholder, which is then left in the output as written.
#[derive(Debug, Error)]
pub enum EvalError {
    // A function name that is not in the registry
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    // A known-replacement transform failed
    #[error("replacement for `{key}` failed: {message}")]
    Replacement { key: String, message: String },

    // Wrong argument count or argument type for a known function
    #[error("invalid arguments to {function}: {reason}")]
    InvalidArguments { function: String, reason: String },

    // A format string that could not be applied to its value
    #[error("format error: {0}")]
    Format(String),

    // Function calls nested deeper than the configured limit
    #[error("expression nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },

    // A record context that does not serialize to named fields
    #[error("invalid context: {0}")]
    InvalidContext(String),
}

impl EvalError {
    pub(crate) fn invalid_args(function: &str, reason: impl Into<String>) -> Self {
        EvalError::InvalidArguments {
            function: function.to_ascii_uppercase(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole render instead of a single placeholder.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EvalError::UnknownFunction(_) | EvalError::Replacement { .. }
        )
    }
}

// Type alias for results that use `EvalError` as the error type
pub type Result<T> = std::result::Result<T, EvalError>;
