//! # Message Channel
//!
//! The boundary between this process and its single peer.
//!
//! `InMemoryChannel::pair()` builds two connected endpoints. Whatever is
//! sent through one endpoint's `ChannelSender` arrives at the other
//! endpoint's `ChannelPump`, which feeds a `TypedMessageRouter` on the
//! dedicated channel thread.

use crate::router::TypedMessageRouter;
use crate::token::ChannelThreadGuard;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::TypedMessage;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors from sending over a channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The receiving side is gone.
    #[error("Channel closed")]
    Closed,

    /// The sending component was detached from its channel.
    #[error("Channel detached")]
    Detached,
}

/// Outgoing half of the channel boundary.
pub trait MessageChannel: Send + Sync {
    /// Send one message to the peer.
    fn send(&self, message: TypedMessage) -> Result<(), ChannelError>;
}

/// Unique identifier of one direction of an in-memory channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(Uuid);

impl ChannelId {
    /// Generate a new random channel ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

enum Frame {
    Message(Value),
    Shutdown,
}

/// Sending half of one endpoint. Cheap to clone.
#[derive(Clone)]
pub struct ChannelSender {
    /// Identifier of the direction this sender feeds.
    id: ChannelId,
    tx: mpsc::UnboundedSender<Frame>,
}

impl ChannelSender {
    /// Identifier of the direction this sender feeds.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Whether the receiving pump has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl MessageChannel for ChannelSender {
    fn send(&self, message: TypedMessage) -> Result<(), ChannelError> {
        let message_type = message.message_type.clone();
        self.tx
            .send(Frame::Message(message.into_value()))
            .map_err(|_| ChannelError::Closed)?;

        debug!(channel = %self.id, message_type = %message_type, "Message sent");
        Ok(())
    }
}

/// Receiving half of one endpoint.
///
/// Running the pump turns the current thread into a channel thread: the only
/// thread that calls `TypedMessageRouter::dispatch` for this endpoint.
pub struct ChannelPump {
    id: ChannelId,
    rx: mpsc::UnboundedReceiver<Frame>,
    control: mpsc::WeakUnboundedSender<Frame>,
}

impl ChannelPump {
    /// Identifier of the direction this pump drains.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Deliver messages into `router` until every sender is gone or the
    /// pump is stopped. Blocks the calling thread.
    ///
    /// Returns the number of messages that were routed successfully.
    pub fn run(mut self, router: &TypedMessageRouter) -> u64 {
        let _guard = ChannelThreadGuard::enter();
        let mut delivered = 0u64;

        debug!(channel = %self.id, "Channel pump started");
        while let Some(Frame::Message(message)) = self.rx.blocking_recv() {
            match router.dispatch(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(channel = %self.id, error = %e, "Failed to route incoming message");
                }
            }
        }
        debug!(channel = %self.id, delivered = delivered, "Channel pump stopped");

        delivered
    }

    /// Run the pump on a dedicated, named thread.
    pub fn spawn(self, router: Arc<TypedMessageRouter>) -> std::io::Result<PumpHandle> {
        let id = self.id;
        let control = self.control.clone();
        let join = thread::Builder::new()
            .name(format!("channel-{}", id))
            .spawn(move || self.run(&router))?;

        Ok(PumpHandle { id, control, join })
    }
}

/// Handle to a pump running on its own thread.
pub struct PumpHandle {
    id: ChannelId,
    control: mpsc::WeakUnboundedSender<Frame>,
    join: JoinHandle<u64>,
}

impl PumpHandle {
    /// Identifier of the direction the pump drains.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Ask the pump to stop after the messages already queued.
    pub fn stop(&self) {
        if let Some(tx) = self.control.upgrade() {
            let _ = tx.send(Frame::Shutdown);
        }
    }

    /// Stop the pump and wait for its thread.
    ///
    /// Returns the number of messages routed successfully.
    pub fn join(self) -> thread::Result<u64> {
        self.stop();
        self.join.join()
    }
}

/// One side of an in-memory channel pair.
pub struct ChannelEndpoint {
    /// Sends to the opposite endpoint.
    pub sender: ChannelSender,
    /// Receives what the opposite endpoint sends.
    pub pump: ChannelPump,
}

impl ChannelEndpoint {
    /// Split the endpoint into its halves.
    pub fn into_parts(self) -> (ChannelSender, ChannelPump) {
        (self.sender, self.pump)
    }
}

/// Factory for connected in-memory endpoints.
pub struct InMemoryChannel;

impl InMemoryChannel {
    /// Create two endpoints wired to each other.
    #[must_use]
    pub fn pair() -> (ChannelEndpoint, ChannelEndpoint) {
        let (a_sender, b_pump) = Self::direction();
        let (b_sender, a_pump) = Self::direction();
        (
            ChannelEndpoint {
                sender: a_sender,
                pump: a_pump,
            },
            ChannelEndpoint {
                sender: b_sender,
                pump: b_pump,
            },
        )
    }

    fn direction() -> (ChannelSender, ChannelPump) {
        let id = ChannelId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let control = tx.downgrade();
        (ChannelSender { id, tx }, ChannelPump { id, rx, control })
    }
}
