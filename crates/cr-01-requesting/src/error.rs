//! Error types for the requesting layer

use thiserror::Error;

/// Errors raised while decoding request or response message data.
///
/// These indicate that the two ends disagree on the protocol. The channel
/// listeners treat them as fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestingError {
    #[error("Malformed request message data: {0}")]
    MalformedRequest(String),

    #[error("Malformed response message data: {0}")]
    MalformedResponse(String),

    #[error("Response must carry exactly one of \"payload\" and \"error\"")]
    AmbiguousResponse,
}
