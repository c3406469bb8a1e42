//! # Shared Bus - Typed Message Routing
//!
//! The one-way messaging layer between this process and its single peer.
//!
//! ## Flow
//!
//! ```text
//!  peer ──► ChannelPump ──dispatch()──► TypedMessageRouter ──► listener
//!           (channel thread)             "<tag>" → listener
//!
//!  any thread ──► ChannelSender::send() ──► peer
//! ```
//!
//! ## Rules
//!
//! - Exactly one listener per tag; a second registration panics.
//! - Only the channel thread dispatches inbound messages.
//! - Blocking waits need a `BlockingToken`, which a channel thread cannot get.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod channel;
pub mod router;
pub mod token;

// Re-export main types
pub use channel::{
    ChannelEndpoint, ChannelError, ChannelId, ChannelPump, ChannelSender, InMemoryChannel,
    MessageChannel, PumpHandle,
};
pub use router::{DispatchError, TypedMessageListener, TypedMessageRouter};
pub use token::{is_channel_thread, BlockingToken};
