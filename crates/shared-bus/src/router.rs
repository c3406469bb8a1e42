//! # Typed Message Router
//!
//! Dispatches `{type, data}` envelopes to exactly one listener per tag.
//!
//! The route table holds non-owning (`Weak`) references: a listener that is
//! dropped without removing its route simply stops receiving messages, and
//! the router never keeps a listener alive.

use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{EnvelopeError, Payload, TypedMessage};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::{debug, error};

/// A component that receives every message carrying one specific tag.
pub trait TypedMessageListener: Send + Sync {
    /// The tag this listener is routed under. Must be stable for the
    /// lifetime of the listener.
    fn listened_message_type(&self) -> &str;

    /// Handle the `data` part of a routed message.
    ///
    /// Returns a human-readable reason on failure.
    fn on_typed_message_received(&self, data: Payload) -> Result<(), String>;
}

/// Errors from `TypedMessageRouter::dispatch`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The raw message is not a well-formed envelope.
    #[error("Malformed typed message: {0}")]
    Malformed(#[from] EnvelopeError),

    /// Nothing is routed under this tag.
    #[error("No listener registered for message type \"{0}\"")]
    NoRoute(String),

    /// The listener was found but reported a failure.
    #[error("Listener for message type \"{message_type}\" failed: {reason}")]
    ListenerFailed {
        message_type: String,
        reason: String,
    },
}

/// Route table mapping a message tag to its single listener.
pub struct TypedMessageRouter {
    routes: Mutex<HashMap<String, Weak<dyn TypedMessageListener>>>,
}

impl TypedMessageRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
        }
    }

    /// Route every message tagged `listener.listened_message_type()` to
    /// `listener`.
    ///
    /// # Panics
    ///
    /// Panics if the tag is already routed to a live listener. A route left
    /// behind by a dropped listener is replaced.
    pub fn add_route<L: TypedMessageListener + 'static>(&self, listener: &Arc<L>) {
        let message_type = listener.listened_message_type().to_string();
        let weak: Weak<L> = Arc::downgrade(listener);
        let weak: Weak<dyn TypedMessageListener> = weak;

        let mut routes = self.routes.lock();
        if routes
            .get(&message_type)
            .is_some_and(|existing| existing.strong_count() > 0)
        {
            error!(message_type = %message_type, "Duplicate route registration");
            panic!("a listener is already routed for message type \"{message_type}\"");
        }
        routes.insert(message_type.clone(), weak);
        drop(routes);

        debug!(message_type = %message_type, "Route added");
    }

    /// Remove the route previously added for `listener`.
    ///
    /// # Panics
    ///
    /// Panics if the tag has no route, or if it is routed to a different
    /// listener.
    pub fn remove_route(&self, listener: &dyn TypedMessageListener) {
        let message_type = listener.listened_message_type();
        let expected = listener as *const dyn TypedMessageListener as *const ();

        let mut routes = self.routes.lock();
        match routes.get(message_type) {
            Some(existing) if Weak::as_ptr(existing) as *const () == expected => {
                routes.remove(message_type);
            }
            Some(_) => {
                error!(message_type = %message_type, "Route belongs to another listener");
                panic!("message type \"{message_type}\" is routed to a different listener");
            }
            None => {
                error!(message_type = %message_type, "Removing a route that does not exist");
                panic!("no route registered for message type \"{message_type}\"");
            }
        }
        drop(routes);

        debug!(message_type = %message_type, "Route removed");
    }

    /// Parse `message` and forward its data to the routed listener.
    ///
    /// The table lock is released before the listener runs, so listeners may
    /// add or remove other routes.
    pub fn dispatch(&self, message: Value) -> Result<(), DispatchError> {
        let message = TypedMessage::from_value(message)?;

        let listener = self
            .routes
            .lock()
            .get(&message.message_type)
            .and_then(Weak::upgrade);

        let Some(listener) = listener else {
            return Err(DispatchError::NoRoute(message.message_type));
        };

        listener
            .on_typed_message_received(message.data)
            .map_err(|reason| DispatchError::ListenerFailed {
                message_type: message.message_type,
                reason,
            })
    }

    /// Whether a live listener is routed under `message_type`.
    pub fn has_route(&self, message_type: &str) -> bool {
        self.routes
            .lock()
            .get(message_type)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Number of routes with a live listener.
    pub fn route_count(&self) -> usize {
        self.routes
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl Default for TypedMessageRouter {
    fn default() -> Self {
        Self::new()
    }
}
