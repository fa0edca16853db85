use thiserror::Error;

/// A broken form definition, raised by [`FormBuilder::compile()`](super::FormBuilder::compile).
///
/// These indicate author mistakes and are never produced by user input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate field id '{id}'")]
    DuplicateField { id: String },

    #[error("no fields registered; a form needs at least one field")]
    NoFields,

    #[error("field '{after}', given as insertion point for '{field}', is not registered")]
    UnknownInsertionPoint { field: String, after: String },

    #[error("field '{target}', referenced by a '{rule}' rule on field '{field}', does not exist")]
    UnknownTarget {
        field: String,
        rule: &'static str,
        target: String,
    },

    #[error("custom function '{function}', referenced by field '{field}', is not registered")]
    UnknownFunction { field: String, function: String },

    #[error("callback '{callback}', referenced by field '{field}', is not registered")]
    UnknownCallback { field: String, callback: String },

    #[error("invalid pattern in 'regexp' rule on field '{field}': {source}")]
    InvalidPattern {
        field: String,
        source: regex::Error,
    },
}

/// A failure that aborts a validation pass. Rule failures are *not* errors;
/// they surface as [`FieldOutcome::Invalid`](super::FieldOutcome).
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("dependency cycle detected: {}", trail.join(" -> "))]
    DependencyCycle { trail: Vec<String> },

    #[error("unknown field '{id}'")]
    UnknownField { id: String },
}
