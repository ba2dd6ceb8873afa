//! Error types for tokenization and value parsing.

use thiserror::Error;

/// Errors produced by the [`Tokenizer`](crate::Tokenizer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The input has no further tokens.
    #[error("end of arguments")]
    EndOfInput,
}

/// Errors produced when converting a token into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The token is not a base-10 integer.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    /// The number violates a configured bound under the reject policy.
    #[error("number {value} is out of range ({bound} bound is {limit})")]
    OutOfRange {
        /// The parsed value.
        value: i64,
        /// Which bound was violated.
        bound: crate::value::Bound,
        /// The configured limit for that bound.
        limit: i64,
    },

    /// The token is not a recognized true/false word.
    #[error("invalid true/false value '{0}'")]
    InvalidBool(String),
}
