//! Remote function calls on top of a `Requester`.
//!
//! A remote call is a request whose payload names a function and carries its
//! positional arguments:
//!
//! ```text
//! {"function_name": "SCardConnect", "arguments": [1, "reader", 2]}
//! ```
//!
//! The peer answers with an array of result values.

use crate::async_request::{AsyncRequest, AsyncRequestCallback};
use crate::request_result::RequestResult;
use crate::requester::Requester;
use serde::{Deserialize, Serialize};
use shared_bus::BlockingToken;
use shared_types::{kind_of, Payload};
use std::sync::Arc;
use tracing::{debug, error};

/// Payload of a remote call request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteCallMessage {
    pub function_name: String,
    pub arguments: Vec<Payload>,
}

impl RemoteCallMessage {
    pub fn new(function_name: impl Into<String>, arguments: Vec<Payload>) -> Self {
        Self {
            function_name: function_name.into(),
            arguments,
        }
    }

    pub fn into_payload(self) -> Payload {
        serde_json::json!({
            "function_name": self.function_name,
            "arguments": self.arguments,
        })
    }

    /// Recognize a remote call payload. `None` for anything else.
    pub fn parse_request_payload(payload: &Payload) -> Option<Self> {
        Self::deserialize(payload).ok()
    }

    /// Human-readable form, e.g. `Sum(1, "two")`.
    pub fn debug_representation(&self) -> String {
        let arguments: Vec<String> = self.arguments.iter().map(ToString::to_string).collect();
        format!("{}({})", self.function_name, arguments.join(", "))
    }
}

/// Issues remote calls through a `Requester`.
pub struct RemoteCallAdaptor {
    requester: Arc<dyn Requester>,
}

impl RemoteCallAdaptor {
    pub fn new(requester: Arc<dyn Requester>) -> Self {
        Self { requester }
    }

    /// Call `function_name` and block until the peer answers.
    pub fn sync_call(
        &self,
        token: &BlockingToken,
        function_name: &str,
        arguments: Vec<Payload>,
    ) -> RequestResult<Payload> {
        let message = RemoteCallMessage::new(function_name, arguments);
        debug!(
            requester = %self.requester.name(),
            call = %message.debug_representation(),
            "Remote call"
        );
        self.requester.perform_sync_request(message.into_payload(), token)
    }

    /// Call `function_name`; `callback` receives the result.
    pub fn async_call(
        &self,
        function_name: &str,
        arguments: Vec<Payload>,
        callback: AsyncRequestCallback<Payload>,
    ) -> AsyncRequest<Payload> {
        let message = RemoteCallMessage::new(function_name, arguments);
        debug!(
            requester = %self.requester.name(),
            call = %message.debug_representation(),
            "Async remote call"
        );
        self.requester
            .start_async_request(message.into_payload(), callback)
    }

    /// Split a remote call result into its returned values.
    ///
    /// Unsuccessful results yield their error text.
    ///
    /// # Panics
    ///
    /// Panics if a successful result does not carry an array.
    pub fn extract_result_payload(result: RequestResult<Payload>) -> Result<Vec<Payload>, String> {
        match result.into_result()? {
            Payload::Array(values) => Ok(values),
            other => {
                let kind = kind_of(&other);
                error!(kind = kind, "Remote call response payload is not an array");
                panic!("remote call response payload must be an array, got {kind}");
            }
        }
    }
}
