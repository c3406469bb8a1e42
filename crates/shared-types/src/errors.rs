//! # Error Types
//!
//! Defines error types shared by the router and the requesting layer.

use thiserror::Error;

/// Errors raised while parsing a raw value into a `TypedMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The message is not a JSON object.
    #[error("Message is not an object")]
    NotAnObject,

    /// A required key is absent.
    #[error("Message is missing the \"{0}\" key")]
    MissingKey(&'static str),

    /// The message carries a key outside `{type, data}`.
    #[error("Message has unexpected key \"{0}\"")]
    UnexpectedKey(String),

    /// The `type` value is not a string.
    #[error("Message type must be a string, got {0}")]
    TypeNotString(String),

    /// The `type` value is an empty string.
    #[error("Message type must not be empty")]
    EmptyType,
}
