//! Wire shapes of request and response messages.
//!
//! ```text
//! "<name>::request"   {"request_id": 3, "payload": ...}
//! "<name>::response"  {"request_id": 3, "payload": ...}
//!                  or {"request_id": 3, "error": "..."}
//! ```

use crate::error::RequestingError;
use crate::request_id::RequestId;
use crate::request_result::{RequestResult, REQUEST_CANCELED_MESSAGE};
use serde::{Deserialize, Deserializer, Serialize};
use shared_types::Payload;

const REQUEST_MESSAGE_TYPE_SUFFIX: &str = "::request";
const RESPONSE_MESSAGE_TYPE_SUFFIX: &str = "::response";

/// Tag of request messages for the service `name`.
pub fn request_message_type(name: &str) -> String {
    format!("{name}{REQUEST_MESSAGE_TYPE_SUFFIX}")
}

/// Tag of response messages for the service `name`.
pub fn response_message_type(name: &str) -> String {
    format!("{name}{RESPONSE_MESSAGE_TYPE_SUFFIX}")
}

/// Data part of a request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestMessageData {
    pub request_id: RequestId,
    pub payload: Payload,
}

impl RequestMessageData {
    pub fn new(request_id: RequestId, payload: Payload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    pub fn from_value(data: Payload) -> Result<Self, RequestingError> {
        serde_json::from_value(data).map_err(|e| RequestingError::MalformedRequest(e.to_string()))
    }

    pub fn into_value(self) -> Payload {
        serde_json::json!({
            "request_id": self.request_id,
            "payload": self.payload,
        })
    }
}

/// Data part of a response message. Exactly one of `payload` and `error`
/// is set on a well-formed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseMessageData {
    pub request_id: RequestId,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// Keeps an explicit `"payload": null` distinct from a missing key.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Payload>, D::Error>
where
    D: Deserializer<'de>,
{
    Payload::deserialize(deserializer).map(Some)
}

impl ResponseMessageData {
    /// Encode a handler's result. `Canceled` travels as an error.
    pub fn from_request_result(request_id: RequestId, result: RequestResult<Payload>) -> Self {
        let (payload, error) = match result {
            RequestResult::Succeeded(payload) => (Some(payload), None),
            RequestResult::Failed(message) => (None, Some(message)),
            RequestResult::Canceled => (None, Some(REQUEST_CANCELED_MESSAGE.to_string())),
        };
        Self {
            request_id,
            payload,
            error,
        }
    }

    pub fn from_value(data: Payload) -> Result<Self, RequestingError> {
        let parsed: Self = serde_json::from_value(data)
            .map_err(|e| RequestingError::MalformedResponse(e.to_string()))?;
        if parsed.payload.is_some() == parsed.error.is_some() {
            return Err(RequestingError::AmbiguousResponse);
        }
        Ok(parsed)
    }

    pub fn into_value(self) -> Payload {
        let mut data = serde_json::Map::new();
        data.insert("request_id".to_string(), self.request_id.value().into());
        if let Some(payload) = self.payload {
            data.insert("payload".to_string(), payload);
        }
        if let Some(error) = self.error {
            data.insert("error".to_string(), Payload::String(error));
        }
        Payload::Object(data)
    }

    /// Decode into the result seen by the requester.
    pub fn into_request_result(self) -> Result<RequestResult<Payload>, RequestingError> {
        match (self.payload, self.error) {
            (Some(payload), None) => Ok(RequestResult::Succeeded(payload)),
            (None, Some(error)) => Ok(RequestResult::Failed(error)),
            _ => Err(RequestingError::AmbiguousResponse),
        }
    }
}
