//! # Blocking Token
//!
//! Proof that the holder is not running on a channel thread.
//!
//! A channel thread must stay free to deliver the very responses a blocking
//! caller waits for, so blocking APIs take `&BlockingToken`. The token can
//! only be acquired off the channel thread and is `!Send`, so it cannot be
//! carried onto one.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static ON_CHANNEL_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Capability to block the current thread while waiting for the peer.
#[derive(Debug)]
pub struct BlockingToken {
    _not_send: PhantomData<*const ()>,
}

impl BlockingToken {
    /// Acquire a token for the current thread.
    ///
    /// Returns `None` on a channel thread.
    pub fn acquire() -> Option<Self> {
        if is_channel_thread() {
            None
        } else {
            Some(Self {
                _not_send: PhantomData,
            })
        }
    }
}

/// Whether the current thread is running a `ChannelPump`.
pub fn is_channel_thread() -> bool {
    ON_CHANNEL_THREAD.with(Cell::get)
}

/// Marks the current thread as a channel thread while alive.
pub(crate) struct ChannelThreadGuard {
    previous: bool,
}

impl ChannelThreadGuard {
    pub(crate) fn enter() -> Self {
        let previous = ON_CHANNEL_THREAD.with(|flag| flag.replace(true));
        Self { previous }
    }
}

impl Drop for ChannelThreadGuard {
    fn drop(&mut self) {
        ON_CHANNEL_THREAD.with(|flag| flag.set(self.previous));
    }
}
