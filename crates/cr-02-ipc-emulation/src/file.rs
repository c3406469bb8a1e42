//! One end of an emulated pipe.

use crate::error::IpcError;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Default)]
struct FileState {
    closed: bool,
    read_buffer: VecDeque<u8>,
}

/// In-memory file with its own read buffer.
///
/// Bytes written to a file land in its peer's buffer. The peer is named by
/// descriptor only; `IpcEmulation` resolves it through the registry.
pub struct InMemoryFile {
    descriptor: i32,
    peer: i32,
    reads_block: bool,
    state: Mutex<FileState>,
    readable: Condvar,
}

impl InMemoryFile {
    pub(crate) fn new(descriptor: i32, peer: i32, reads_block: bool) -> Self {
        debug!(descriptor, peer, reads_block, "In-memory file created");
        Self {
            descriptor,
            peer,
            reads_block,
            state: Mutex::new(FileState::default()),
            readable: Condvar::new(),
        }
    }

    pub fn descriptor(&self) -> i32 {
        self.descriptor
    }

    pub fn peer(&self) -> i32 {
        self.peer
    }

    pub fn reads_block(&self) -> bool {
        self.reads_block
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Bytes waiting to be read.
    pub fn buffered_len(&self) -> usize {
        self.state.lock().read_buffer.len()
    }

    /// Mark closed and wake every waiter. Returns `false` if already closed.
    pub(crate) fn mark_closed(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        self.readable.notify_all();
        drop(state);

        debug!(descriptor = self.descriptor, "In-memory file closed");
        true
    }

    /// Append to this file's read buffer.
    pub(crate) fn push_to_read_buffer(&self, bytes: &[u8]) -> Result<(), IpcError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(IpcError::Closed);
        }
        state.read_buffer.extend(bytes);
        self.readable.notify_all();
        Ok(())
    }

    /// Block until the file is closed or has data, or `timeout` elapses.
    pub(crate) fn wait_until_can_be_read(&self, timeout: Option<Duration>) -> Result<(), IpcError> {
        // A timeout past the end of the clock waits forever.
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(IpcError::Closed);
            }
            if !state.read_buffer.is_empty() {
                return Ok(());
            }
            match deadline {
                Some(deadline) => {
                    if self.readable.wait_until(&mut state, deadline).timed_out() {
                        return if state.closed {
                            Err(IpcError::Closed)
                        } else if state.read_buffer.is_empty() {
                            Err(IpcError::TimedOut)
                        } else {
                            Ok(())
                        };
                    }
                }
                None => self.readable.wait(&mut state),
            }
        }
    }

    /// Lock the state once it has data to read.
    ///
    /// Closed wins over buffered data. With `reads_block` the call waits for
    /// data or closure, otherwise an empty buffer yields `NoData`.
    fn lock_readable(&self) -> Result<MutexGuard<'_, FileState>, IpcError> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(IpcError::Closed);
            }
            if !state.read_buffer.is_empty() {
                return Ok(state);
            }
            if !self.reads_block {
                return Err(IpcError::NoData);
            }
            self.readable.wait(&mut state);
        }
    }

    /// Move up to `buffer.len()` buffered bytes into `buffer`.
    pub(crate) fn read_into(&self, buffer: &mut [u8]) -> Result<usize, IpcError> {
        let mut state = self.lock_readable()?;
        let count = buffer.len().min(state.read_buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_buffer.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    /// Take up to `max_len` buffered bytes. Never allocates more than what is
    /// buffered.
    pub(crate) fn read_up_to(&self, max_len: usize) -> Result<Vec<u8>, IpcError> {
        let mut state = self.lock_readable()?;
        let count = max_len.min(state.read_buffer.len());
        Ok(state.read_buffer.drain(..count).collect())
    }
}

impl Drop for InMemoryFile {
    fn drop(&mut self) {
        debug_assert!(
            self.state.get_mut().closed || std::thread::panicking(),
            "in-memory file {} dropped while open",
            self.descriptor
        );
    }
}
