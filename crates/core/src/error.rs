//! Error types for rivulet.
//!
//! Every failure that crosses a component boundary is mapped to one of these kinds.
//! Compile-time kinds (`UnsupportedFeature`, `UnsupportedExpression`, `Arity`) are raised
//! while a plan is built; the others surface while records flow.

use thiserror::Error;

/// Result type alias for rivulet operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error kinds for query compilation and execution.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// No registered feature for a syntax node or function name.
    #[error("unsupported feature {feature}: {expression}")]
    UnsupportedFeature { feature: String, expression: String },
    /// The expression variant has no compiler at all.
    #[error("unsupported expression: {expression}")]
    UnsupportedExpression { expression: String },
    /// Wrong operand count for a fixed-arity operator or function.
    #[error("{expression}: expected {expected} argument(s), got {got}")]
    Arity {
        expression: String,
        expected: String,
        got: usize,
    },
    /// A value cannot be coerced to the requested type.
    #[error("cannot cast {value} to {target}")]
    Cast { value: String, target: String },
    /// Raised by the grammar collaborator, surfaced unchanged.
    #[error("parse error: {message}")]
    Parse { message: String },
    /// A bound data source failed or is unavailable.
    #[error("source {name}: {message}")]
    Source { name: String, message: String },
    /// More live groups than the configured bound.
    #[error("group limit of {limit} exceeded")]
    GroupLimit { limit: usize },
}

impl Error {
    /// Creates an unsupported feature error.
    pub fn unsupported_feature(feature: impl Into<String>, expression: impl Into<String>) -> Self {
        Error::UnsupportedFeature {
            feature: feature.into(),
            expression: expression.into(),
        }
    }

    /// Creates an unsupported expression error.
    pub fn unsupported_expression(expression: impl Into<String>) -> Self {
        Error::UnsupportedExpression {
            expression: expression.into(),
        }
    }

    /// Creates an arity error. `expected` is free text such as `"2"` or `"1..=3"`.
    pub fn arity(expression: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        Error::Arity {
            expression: expression.into(),
            expected: expected.into(),
            got,
        }
    }

    /// Creates a cast error.
    pub fn cast(value: impl core::fmt::Display, target: impl Into<String>) -> Self {
        Error::Cast {
            value: value.to_string(),
            target: target.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    /// Creates a source error.
    pub fn source(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Source {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors raised while building a plan.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFeature { .. } | Error::UnsupportedExpression { .. } | Error::Arity { .. }
        )
    }
}
