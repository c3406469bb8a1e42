//! # `TypedMessage` Envelope
//!
//! The one-way dispatch wrapper used for ALL traffic with the peer.
//!
//! ## Wire Shape
//!
//! ```text
//! { "type": "<tag>", "data": <opaque value> }
//! ```
//!
//! - `type` is a non-empty, process-defined tag that selects the route.
//! - `data` is never interpreted by the envelope or the router.
//! - No other keys are allowed.

use crate::errors::EnvelopeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque payload carried by envelopes, requests and responses.
pub type Payload = Value;

/// Key holding the message tag.
pub const TYPE_KEY: &str = "type";

/// Key holding the message data.
pub const DATA_KEY: &str = "data";

/// A `{type, data}` envelope used for one-way dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct TypedMessage {
    /// Route tag. Never empty.
    #[serde(rename = "type")]
    pub message_type: String,

    /// Opaque data forwarded to the listener untouched.
    pub data: Payload,
}

impl TypedMessage {
    /// Create a new envelope.
    ///
    /// # Panics
    ///
    /// Panics if `message_type` is empty.
    pub fn new(message_type: impl Into<String>, data: Payload) -> Self {
        let message_type = message_type.into();
        assert!(!message_type.is_empty(), "typed message tag must not be empty");
        Self { message_type, data }
    }

    /// Parse a raw message value into an envelope.
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(mut fields) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        if let Some(key) = fields.keys().find(|k| k.as_str() != TYPE_KEY && k.as_str() != DATA_KEY) {
            return Err(EnvelopeError::UnexpectedKey(key.clone()));
        }

        let message_type = match fields.remove(TYPE_KEY) {
            Some(Value::String(tag)) if !tag.is_empty() => tag,
            Some(Value::String(_)) => return Err(EnvelopeError::EmptyType),
            Some(other) => {
                return Err(EnvelopeError::TypeNotString(kind_of(&other).to_string()))
            }
            None => return Err(EnvelopeError::MissingKey(TYPE_KEY)),
        };

        let data = fields
            .remove(DATA_KEY)
            .ok_or(EnvelopeError::MissingKey(DATA_KEY))?;

        Ok(Self { message_type, data })
    }

    /// Convert the envelope into its raw wire value.
    pub fn into_value(self) -> Value {
        let mut fields = Map::with_capacity(2);
        fields.insert(TYPE_KEY.to_string(), Value::String(self.message_type));
        fields.insert(DATA_KEY.to_string(), self.data);
        Value::Object(fields)
    }
}

impl TryFrom<Value> for TypedMessage {
    type Error = EnvelopeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<TypedMessage> for Value {
    fn from(message: TypedMessage) -> Self {
        message.into_value()
    }
}

/// Human-readable name of a JSON value kind, for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
