//! Outcome of a request: succeeded with a payload, failed with a message,
//! or canceled locally.

/// Error text carried by a canceled result.
pub const REQUEST_CANCELED_MESSAGE: &str = "The request was canceled";

/// Discriminant of a `RequestResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestResultStatus {
    Succeeded,
    Failed,
    Canceled,
}

/// Final result of one request. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestResult<T> {
    /// The peer handled the request and returned a payload.
    Succeeded(T),
    /// The request was attempted and did not succeed.
    Failed(String),
    /// The request was withdrawn before a result arrived.
    Canceled,
}

impl<T> RequestResult<T> {
    pub fn succeeded(payload: T) -> Self {
        Self::Succeeded(payload)
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self::Failed(error_message.into())
    }

    pub fn canceled() -> Self {
        Self::Canceled
    }

    pub fn status(&self) -> RequestResultStatus {
        match self {
            Self::Succeeded(_) => RequestResultStatus::Succeeded,
            Self::Failed(_) => RequestResultStatus::Failed,
            Self::Canceled => RequestResultStatus::Canceled,
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Error text of an unsuccessful result, `None` on success.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(message) => Some(message),
            Self::Canceled => Some(REQUEST_CANCELED_MESSAGE),
        }
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Self::Succeeded(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn into_payload(self) -> Option<T> {
        match self {
            Self::Succeeded(payload) => Some(payload),
            _ => None,
        }
    }

    /// Transform the success payload, keeping failures untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestResult<U> {
        match self {
            Self::Succeeded(payload) => RequestResult::Succeeded(f(payload)),
            Self::Failed(message) => RequestResult::Failed(message),
            Self::Canceled => RequestResult::Canceled,
        }
    }

    /// Collapse into a `Result`, turning both failure kinds into their
    /// error text.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Succeeded(payload) => Ok(payload),
            Self::Failed(message) => Err(message),
            Self::Canceled => Err(REQUEST_CANCELED_MESSAGE.to_string()),
        }
    }
}
