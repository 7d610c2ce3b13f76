//! Error types.
//!
//! Two families of failure leave the engine as values:
//!
//! - [`ExpressionError`]: a numeric config value could not be produced.
//!   These are surfaced to whoever asked for the value, since silently
//!   defaulting a balance number hides broken configuration.
//! - [`HandlerError`]: a condition, effect or trigger handler failed while
//!   running. The reconciler and dispatcher catch these per holder, log them
//!   and carry on.
//!
//! Configuration violations are not errors: they are collected as
//! [`Violation`](crate::arguments::Violation)s and reported to a sink.

use thiserror::Error;

/// Failure to compile or evaluate a numeric config expression.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ExpressionError {
    #[error("cannot parse expression '{expression}' at position {position}: {message}")]
    Parse {
        expression: String,
        position: usize,
        message: String,
    },

    #[error("unknown function '{name}' in expression '{expression}'")]
    UnknownFunction { expression: String, name: String },

    #[error("function '{function}' takes {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: &'static str,
        found: usize,
    },

    #[error("expression expects {expected} variable(s), got {found}")]
    VariableCount { expected: usize, found: usize },

    #[error("placeholder '{token}' could not be resolved")]
    UnresolvedPlaceholder { token: String },

    #[error("placeholder '{token}' resolved to non-numeric value '{value}'")]
    InvalidPlaceholder { token: String, value: String },

    #[error("value at '{path}' is not a number: '{value}'")]
    NotANumber { path: String, value: String },

    #[error("value at '{path}' is not a scalar and cannot be evaluated")]
    NotAnExpression { path: String },
}

/// Failure raised by a capability handler at compile or run time.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("compiled data for '{handler}' is missing or not a {expected}")]
    CompiledData {
        handler: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

impl HandlerError {
    /// Create a handler failure from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Result type for expression evaluation.
pub type ExpressionResult<T> = std::result::Result<T, ExpressionError>;

/// Result type for handler calls.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;
