//! Error types for option value resolution.
//!
//! Provides a unified error type covering all failure modes: rejected
//! values, usage violations, arity mismatches from external value
//! sources, and structurally invalid pipeline configurations.

use thiserror::Error;

/// Errors raised while resolving, transforming, or validating an
/// option's value.
///
/// Every variant carries enough attribution for a command-line driver
/// to render it with usage context. All variants abort the enclosing
/// parse; none are retried and no partial value is substituted.
///
/// # Examples
///
/// ```
/// use optflow_core::ParseError;
///
/// let err = ParseError::BadValue {
///     name: "--port".into(),
///     message: "'abc' is not a number".into(),
/// };
/// assert_eq!(err.to_string(), "invalid value for --port: 'abc' is not a number");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A value or per-occurrence transform rejected a specific value.
    /// Attributed to the name the invocation was made with.
    #[error("invalid value for {name}: {message}")]
    BadValue { name: String, message: String },

    /// A validator or aggregate-level check rejected the option's
    /// final value. Attributed to the option's primary display name.
    #[error("{name}: {message}")]
    Usage { name: String, message: String },

    /// An externally sourced value group did not match the declared
    /// arity.
    #[error("{name} expects {expected} value(s) per occurrence, got {got}")]
    IncorrectCount {
        name: String,
        expected: usize,
        got: usize,
    },

    /// The pipeline itself is misconfigured (e.g., secondary names on
    /// a valued option, a bad split pattern, or an arity the default
    /// stages cannot consume). Detected at bind or configuration time
    /// where possible, never caused by end-user input.
    #[error("invalid option configuration: {0}")]
    Config(String),
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
