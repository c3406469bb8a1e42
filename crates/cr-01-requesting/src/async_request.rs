//! Per-request state and the cancellable handle given to callers.
//!
//! State machine:
//!
//! ```text
//! Pending ──set_result()──► Resolved{Succeeded | Failed | Canceled}
//! ```
//!
//! `Resolved` is terminal. The first `set_result` wins; later calls return
//! `false` and never re-run the callback.

use crate::request_result::RequestResult;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::error;

/// Completion callback of an asynchronous request. Runs exactly once.
pub type AsyncRequestCallback<T> = Box<dyn FnOnce(RequestResult<T>) + Send + 'static>;

struct StateInner<T> {
    result: Option<RequestResult<T>>,
    callback: Option<AsyncRequestCallback<T>>,
}

/// Single-resolution result cell for one outstanding request.
pub struct AsyncRequestState<T> {
    inner: Mutex<StateInner<T>>,
}

impl<T: Clone> AsyncRequestState<T> {
    /// Create a pending state that will hand its result to `callback`.
    pub fn new(callback: impl FnOnce(RequestResult<T>) + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(StateInner {
                result: None,
                callback: Some(Box::new(callback)),
            }),
        }
    }

    /// Resolve the request.
    ///
    /// Returns `false` without side effects if the state was already
    /// resolved. Otherwise stores `result` and runs the callback after the
    /// internal lock is released, so the callback may start new requests.
    pub fn set_result(&self, result: RequestResult<T>) -> bool {
        let callback = {
            let mut inner = self.inner.lock();
            if inner.result.is_some() {
                return false;
            }
            inner.result = Some(result.clone());
            inner.callback.take()
        };

        if let Some(callback) = callback {
            callback(result);
        }
        true
    }

    /// Resolve the request as `Canceled`, unless it is already resolved.
    pub fn set_canceled_result(&self) -> bool {
        self.set_result(RequestResult::Canceled)
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.lock().result.is_some()
    }

    /// The stored result, if resolved.
    pub fn result(&self) -> Option<RequestResult<T>> {
        self.inner.lock().result.clone()
    }
}

impl<T> Drop for AsyncRequestState<T> {
    fn drop(&mut self) {
        if self.inner.get_mut().result.is_none() && !std::thread::panicking() {
            error!("Async request state dropped while still pending");
            debug_assert!(false, "async request state dropped while still pending");
        }
    }
}

/// Caller-side handle to an outstanding request.
///
/// Holds a weak reference: once the requester resolved and released the
/// state, the handle no longer keeps it alive.
pub struct AsyncRequest<T> {
    state: Weak<AsyncRequestState<T>>,
}

impl<T: Clone> AsyncRequest<T> {
    pub fn new(state: &Arc<AsyncRequestState<T>>) -> Self {
        Self {
            state: Arc::downgrade(state),
        }
    }

    /// A handle that refers to no request; `cancel` always fails.
    pub fn detached() -> Self {
        Self { state: Weak::new() }
    }

    /// Cancel the request.
    ///
    /// Returns `false` if it already finished (including an earlier
    /// cancellation) or its state is gone. Never blocks.
    pub fn cancel(&self) -> bool {
        match self.state.upgrade() {
            Some(state) => state.set_canceled_result(),
            None => false,
        }
    }

    /// Whether the request is known to be finished.
    pub fn is_finished(&self) -> bool {
        self.state
            .upgrade()
            .map_or(true, |state| state.is_resolved())
    }
}

impl<T> Clone for AsyncRequest<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}
