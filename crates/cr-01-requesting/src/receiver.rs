//! # Request Receiver
//!
//! Responding side of the request/response protocol.
//!
//! Every `"<name>::request"` message is handed to a `RequestHandler`
//! together with a `ResultCallback`. The handler may answer right away or
//! move the callback to another thread and answer later; the answer travels
//! back as `"<name>::response"`.

use crate::messages::{
    request_message_type, response_message_type, RequestMessageData, ResponseMessageData,
};
use crate::request_id::RequestId;
use crate::request_result::RequestResult;
use parking_lot::{Mutex, RwLock};
use shared_bus::{MessageChannel, TypedMessageListener, TypedMessageRouter};
use shared_types::{Payload, TypedMessage};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

/// Error text posted for a request whose callback was dropped unanswered.
pub const RESULT_CALLBACK_DROPPED_MESSAGE: &str =
    "The request handler dropped the result callback";

/// Capability to post results back to the requesting peer.
pub trait RequestReceiver: Send + Sync {
    fn name(&self) -> &str;

    /// Send the result of request `request_id` to the peer.
    fn post_result(&self, request_id: RequestId, result: RequestResult<Payload>);

    /// Stop receiving requests and stop posting results. Idempotent.
    fn detach(&self);
}

/// User code answering incoming requests.
pub trait RequestHandler: Send + Sync {
    /// Handle one request. `result_callback` must eventually be sent exactly
    /// once, from any thread.
    fn handle_request(&self, payload: Payload, result_callback: ResultCallback);
}

impl<F> RequestHandler for F
where
    F: Fn(Payload, ResultCallback) + Send + Sync,
{
    fn handle_request(&self, payload: Payload, result_callback: ResultCallback) {
        self(payload, result_callback)
    }
}

/// One-shot sender of a request's result.
///
/// Safe to use after the receiver is gone; the result is then discarded.
/// Dropping it unsent posts `Failed` so the peer is never left waiting.
pub struct ResultCallback {
    request_id: RequestId,
    receiver: Weak<dyn RequestReceiver>,
    sent: bool,
}

impl ResultCallback {
    pub fn new(request_id: RequestId, receiver: Weak<dyn RequestReceiver>) -> Self {
        Self {
            request_id,
            receiver,
            sent: false,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Post `result` for this request.
    pub fn send(mut self, result: RequestResult<Payload>) {
        self.sent = true;
        self.post(result);
    }

    fn post(&self, result: RequestResult<Payload>) {
        match self.receiver.upgrade() {
            Some(receiver) => receiver.post_result(self.request_id, result),
            None => {
                debug!(request_id = %self.request_id, "Receiver gone, discarding result");
            }
        }
    }
}

impl Drop for ResultCallback {
    fn drop(&mut self) {
        if !self.sent {
            warn!(request_id = %self.request_id, "Result callback dropped without a result");
            self.post(RequestResult::failed(RESULT_CALLBACK_DROPPED_MESSAGE));
        }
    }
}

/// `RequestReceiver` answering requests arriving over a `MessageChannel`.
pub struct ChannelRequestReceiver {
    name: String,
    request_message_type: String,
    response_message_type: String,
    handler: Box<dyn RequestHandler>,
    channel: RwLock<Option<Arc<dyn MessageChannel>>>,
    router: Mutex<Option<Arc<TypedMessageRouter>>>,
    self_ref: Weak<ChannelRequestReceiver>,
}

impl ChannelRequestReceiver {
    /// Create a receiver for service `name` and route its requests.
    ///
    /// # Panics
    ///
    /// Panics if `"<name>::request"` is already routed.
    pub fn new(
        name: impl Into<String>,
        handler: impl RequestHandler + 'static,
        channel: Arc<dyn MessageChannel>,
        router: Arc<TypedMessageRouter>,
    ) -> Arc<Self> {
        let name = name.into();
        let receiver = Arc::new_cyclic(|self_ref| Self {
            request_message_type: request_message_type(&name),
            response_message_type: response_message_type(&name),
            name,
            handler: Box::new(handler),
            channel: RwLock::new(Some(channel)),
            router: Mutex::new(Some(router.clone())),
            self_ref: self_ref.clone(),
        });
        router.add_route(&receiver);

        debug!(receiver = %receiver.name, "Request receiver attached");
        receiver
    }

    pub fn is_attached(&self) -> bool {
        self.channel.read().is_some()
    }
}

impl RequestReceiver for ChannelRequestReceiver {
    fn name(&self) -> &str {
        &self.name
    }

    fn post_result(&self, request_id: RequestId, result: RequestResult<Payload>) {
        let Some(channel) = self.channel.read().clone() else {
            debug!(
                receiver = %self.name,
                request_id = %request_id,
                "Receiver detached, discarding result"
            );
            return;
        };

        let data = ResponseMessageData::from_request_result(request_id, result).into_value();
        let message = TypedMessage::new(self.response_message_type.clone(), data);
        match channel.send(message) {
            Ok(()) => debug!(receiver = %self.name, request_id = %request_id, "Result posted"),
            Err(e) => warn!(
                receiver = %self.name,
                request_id = %request_id,
                error = %e,
                "Failed to post result"
            ),
        }
    }

    fn detach(&self) {
        self.channel.write().take();
        if let Some(router) = self.router.lock().take() {
            router.remove_route(self);
            debug!(receiver = %self.name, "Request receiver detached");
        }
    }
}

impl TypedMessageListener for ChannelRequestReceiver {
    fn listened_message_type(&self) -> &str {
        &self.request_message_type
    }

    fn on_typed_message_received(&self, data: Payload) -> Result<(), String> {
        let request = match RequestMessageData::from_value(data) {
            Ok(request) => request,
            Err(e) => {
                error!(receiver = %self.name, error = %e, "Protocol violation in request");
                panic!("receiver \"{}\" received a malformed request: {e}", self.name);
            }
        };

        debug!(receiver = %self.name, request_id = %request.request_id, "Request received");
        let receiver: Weak<dyn RequestReceiver> = self.self_ref.clone();
        self.handler
            .handle_request(request.payload, ResultCallback::new(request.request_id, receiver));
        Ok(())
    }
}

impl Drop for ChannelRequestReceiver {
    fn drop(&mut self) {
        self.detach();
    }
}
