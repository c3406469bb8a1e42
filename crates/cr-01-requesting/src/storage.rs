//! Storage of outstanding requests, keyed by `RequestId`.

use crate::async_request::AsyncRequestState;
use crate::request_id::RequestId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct StorageInner<T> {
    next_free_request_id: RequestId,
    states: HashMap<RequestId, Arc<AsyncRequestState<T>>>,
}

/// Thread-safe map from request id to its pending state.
///
/// Ids are allocated from a monotonic counter, so an id is never reused for
/// the lifetime of the storage. Every removal hands the state out at most
/// once.
pub struct RequestsStorage<T> {
    inner: Mutex<StorageInner<T>>,
}

impl<T> RequestsStorage<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StorageInner {
                next_free_request_id: RequestId::FIRST,
                states: HashMap::new(),
            }),
        }
    }

    /// Store `state` under a fresh id and return that id.
    pub fn push(&self, state: Arc<AsyncRequestState<T>>) -> RequestId {
        let mut inner = self.inner.lock();
        let request_id = inner.next_free_request_id;
        inner.next_free_request_id = request_id.next();
        let previous = inner.states.insert(request_id, state);
        debug_assert!(previous.is_none(), "request id {request_id} reused");
        request_id
    }

    /// Remove and return the state stored under `request_id`.
    pub fn pop(&self, request_id: RequestId) -> Option<Arc<AsyncRequestState<T>>> {
        self.inner.lock().states.remove(&request_id)
    }

    /// Remove and return every stored state.
    pub fn pop_all(&self) -> Vec<Arc<AsyncRequestState<T>>> {
        self.inner
            .lock()
            .states
            .drain()
            .map(|(_, state)| state)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().states.is_empty()
    }
}

impl<T> Default for RequestsStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}
