//! # Requester
//!
//! Initiating side of the request/response protocol.
//!
//! Flow:
//! 1. `start_async_request` stores a pending state and gets its `RequestId`
//! 2. `{request_id, payload}` is sent as `"<name>::request"`
//! 3. The peer answers with `"<name>::response"` on the channel thread
//! 4. The response listener pops the state by id and resolves it
//!
//! Anything still pending when the requester is detached or dropped is
//! resolved with `Failed`.

use crate::async_request::{AsyncRequest, AsyncRequestCallback, AsyncRequestState};
use crate::messages::{
    request_message_type, response_message_type, RequestMessageData, ResponseMessageData,
};
use crate::request_result::RequestResult;
use crate::storage::RequestsStorage;
use parking_lot::{Condvar, Mutex, RwLock};
use shared_bus::{BlockingToken, MessageChannel, TypedMessageListener, TypedMessageRouter};
use shared_types::{Payload, TypedMessage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Error text of requests that could not be sent or were outstanding when
/// the requester was detached.
pub const REQUESTER_DETACHED_MESSAGE: &str = "The requester was detached";

/// Error text of requests outstanding when the requester was dropped.
pub const REQUESTER_DESTROYED_MESSAGE: &str = "The requester was destroyed";

/// Capability to send requests to the peer.
pub trait Requester: Send + Sync {
    /// Logical service name shared with the peer's receiver.
    fn name(&self) -> &str;

    /// Send a request; `callback` runs exactly once with its result.
    ///
    /// Never blocks. If the request cannot be sent, the callback runs with
    /// `Failed` before this returns.
    fn start_async_request(
        &self,
        payload: Payload,
        callback: AsyncRequestCallback<Payload>,
    ) -> AsyncRequest<Payload>;

    /// Disconnect from the channel and stop receiving responses.
    fn detach(&self);

    /// Send a request and block until its result arrives.
    ///
    /// The token proves the caller is not the channel thread, which must
    /// stay free to deliver the response.
    fn perform_sync_request(
        &self,
        payload: Payload,
        _token: &BlockingToken,
    ) -> RequestResult<Payload> {
        let slot = Arc::new((Mutex::new(None::<RequestResult<Payload>>), Condvar::new()));
        let signal = slot.clone();

        let _request = self.start_async_request(
            payload,
            Box::new(move |result| {
                let (result_slot, condvar) = &*signal;
                *result_slot.lock() = Some(result);
                condvar.notify_one();
            }),
        );

        let (result_slot, condvar) = &*slot;
        let mut result = result_slot.lock();
        loop {
            if let Some(result) = result.take() {
                return result;
            }
            condvar.wait(&mut result);
        }
    }
}

/// Counters kept by a `ChannelRequester`.
#[derive(Debug, Default)]
pub struct RequesterStats {
    /// Requests handed to `start_async_request`
    pub requests_started: AtomicU64,
    /// Responses that resolved a pending request
    pub responses_matched: AtomicU64,
    /// Responses for unknown, canceled or already resolved requests
    pub responses_dropped: AtomicU64,
    /// Requests failed because the channel refused them
    pub send_failures: AtomicU64,
    /// Requests failed by detach or drop
    pub failed_at_teardown: AtomicU64,
}

/// `Requester` talking to the peer over a `MessageChannel`.
///
/// Registers itself with the router for `"<name>::response"` messages.
pub struct ChannelRequester {
    name: String,
    request_message_type: String,
    response_message_type: String,
    storage: RequestsStorage<Payload>,
    channel: RwLock<Option<Arc<dyn MessageChannel>>>,
    router: Mutex<Option<Arc<TypedMessageRouter>>>,
    stats: RequesterStats,
}

impl ChannelRequester {
    /// Create a requester for service `name` and route its responses.
    ///
    /// # Panics
    ///
    /// Panics if `"<name>::response"` is already routed.
    pub fn new(
        name: impl Into<String>,
        channel: Arc<dyn MessageChannel>,
        router: Arc<TypedMessageRouter>,
    ) -> Arc<Self> {
        let name = name.into();
        let requester = Arc::new(Self {
            request_message_type: request_message_type(&name),
            response_message_type: response_message_type(&name),
            name,
            storage: RequestsStorage::new(),
            channel: RwLock::new(Some(channel)),
            router: Mutex::new(Some(router.clone())),
            stats: RequesterStats::default(),
        });
        router.add_route(&requester);

        debug!(requester = %requester.name, "Requester attached");
        requester
    }

    pub fn stats(&self) -> &RequesterStats {
        &self.stats
    }

    /// Number of requests still waiting for a result.
    pub fn pending_count(&self) -> usize {
        self.storage.len()
    }

    /// Whether the requester is still connected to its channel.
    pub fn is_attached(&self) -> bool {
        self.channel.read().is_some()
    }

    fn disconnect(&self) {
        self.channel.write().take();
        if let Some(router) = self.router.lock().take() {
            router.remove_route(self);
        }
    }

    fn fail_all_pending(&self, error_message: &str) {
        let states = self.storage.pop_all();
        if states.is_empty() {
            return;
        }

        debug!(
            requester = %self.name,
            count = states.len(),
            reason = error_message,
            "Failing outstanding requests"
        );
        for state in states {
            if state.set_result(RequestResult::failed(error_message)) {
                self.stats.failed_at_teardown.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl Requester for ChannelRequester {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_async_request(
        &self,
        payload: Payload,
        callback: AsyncRequestCallback<Payload>,
    ) -> AsyncRequest<Payload> {
        let state = Arc::new(AsyncRequestState::new(callback));
        let request = AsyncRequest::new(&state);
        let request_id = self.storage.push(state);
        self.stats.requests_started.fetch_add(1, Ordering::Relaxed);

        let message = TypedMessage::new(
            self.request_message_type.clone(),
            RequestMessageData::new(request_id, payload).into_value(),
        );
        let channel = self.channel.read().clone();
        let sent = match channel {
            Some(channel) => channel.send(message),
            None => Err(shared_bus::ChannelError::Detached),
        };

        match sent {
            Ok(()) => {
                debug!(requester = %self.name, request_id = %request_id, "Request sent");
            }
            Err(e) => {
                warn!(
                    requester = %self.name,
                    request_id = %request_id,
                    error = %e,
                    "Failed to send request"
                );
                self.stats.send_failures.fetch_add(1, Ordering::Relaxed);
                // A concurrent detach may already have failed it.
                if let Some(state) = self.storage.pop(request_id) {
                    state.set_result(RequestResult::failed(REQUESTER_DETACHED_MESSAGE));
                }
            }
        }

        request
    }

    fn detach(&self) {
        self.disconnect();
        self.fail_all_pending(REQUESTER_DETACHED_MESSAGE);
        debug!(requester = %self.name, "Requester detached");
    }
}

impl TypedMessageListener for ChannelRequester {
    fn listened_message_type(&self) -> &str {
        &self.response_message_type
    }

    fn on_typed_message_received(&self, data: Payload) -> Result<(), String> {
        let response = ResponseMessageData::from_value(data)
            .and_then(|data| {
                let request_id = data.request_id;
                data.into_request_result().map(|result| (request_id, result))
            });
        let (request_id, result) = match response {
            Ok(response) => response,
            Err(e) => {
                error!(requester = %self.name, error = %e, "Protocol violation in response");
                panic!("requester \"{}\" received a malformed response: {e}", self.name);
            }
        };

        let resolved = self
            .storage
            .pop(request_id)
            .is_some_and(|state| state.set_result(result));

        if resolved {
            self.stats.responses_matched.fetch_add(1, Ordering::Relaxed);
            debug!(requester = %self.name, request_id = %request_id, "Response matched");
        } else {
            self.stats.responses_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(
                requester = %self.name,
                request_id = %request_id,
                "Dropping response for unknown or finished request"
            );
        }
        Ok(())
    }
}

impl Drop for ChannelRequester {
    fn drop(&mut self) {
        self.disconnect();
        self.fail_all_pending(REQUESTER_DESTROYED_MESSAGE);
    }
}
