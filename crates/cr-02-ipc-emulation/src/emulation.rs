//! # IPC Emulation
//!
//! Registry of in-memory pipe ends, addressed by integer descriptors.
//!
//! ```text
//!  write(a, b"hi") ──► file[b].read_buffer ──► read(b)
//!  write(b, b"yo") ──► file[a].read_buffer ──► read(a)
//! ```
//!
//! The registry owns every file; a file only records its peer's descriptor.
//! A peer that was closed and removed is simply a lookup miss.

use crate::config::EmulationConfig;
use crate::error::IpcError;
use crate::file::InMemoryFile;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

struct Registry {
    next_descriptor: i32,
    files: HashMap<i32, Arc<InMemoryFile>>,
}

/// Explicit context holding every emulated file of a process.
pub struct IpcEmulation {
    config: EmulationConfig,
    shut_down: AtomicBool,
    registry: Mutex<Registry>,
}

impl IpcEmulation {
    /// Create a running emulation.
    ///
    /// # Panics
    ///
    /// Panics if `config` does not validate.
    pub fn init(config: EmulationConfig) -> Arc<Self> {
        if let Err(e) = config.validate() {
            error!(error = %e, "Refusing to start IPC emulation");
            panic!("{e}");
        }

        debug!(
            first_descriptor = config.first_descriptor,
            reads_block = config.reads_block,
            "IPC emulation started"
        );
        Arc::new(Self {
            registry: Mutex::new(Registry {
                next_descriptor: config.first_descriptor,
                files: HashMap::new(),
            }),
            config,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &EmulationConfig {
        &self.config
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Close every file and refuse new pairs. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let files: Vec<_> = self.registry.lock().files.drain().map(|(_, f)| f).collect();
        for file in &files {
            file.mark_closed();
        }
        debug!(closed = files.len(), "IPC emulation shut down");
    }

    /// Create two connected files. Returns their descriptors.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor space is exhausted.
    pub fn create_in_memory_file_pair(&self, reads_block: bool) -> Result<(i32, i32), IpcError> {
        let mut registry = self.registry.lock();
        // Checked under the lock so shutdown cannot miss a new pair.
        if self.is_shut_down() {
            return Err(IpcError::ShutDown);
        }

        let first = registry.allocate_descriptor();
        let second = registry.allocate_descriptor();
        registry
            .files
            .insert(first, Arc::new(InMemoryFile::new(first, second, reads_block)));
        registry
            .files
            .insert(second, Arc::new(InMemoryFile::new(second, first, reads_block)));
        drop(registry);

        debug!(first, second, "In-memory file pair created");
        Ok((first, second))
    }

    /// Create a pair using the configured read mode.
    pub fn create_default_pair(&self) -> Result<(i32, i32), IpcError> {
        self.create_in_memory_file_pair(self.config.reads_block)
    }

    /// Send `bytes` to the peer of `descriptor`.
    ///
    /// Zero bytes always succeed on a registered descriptor.
    pub fn write(&self, descriptor: i32, bytes: &[u8]) -> Result<(), IpcError> {
        let (file, peer) = {
            let registry = self.registry.lock();
            let file = registry.find(descriptor)?;
            let peer = registry.files.get(&file.peer()).cloned();
            (file, peer)
        };
        if bytes.is_empty() {
            return Ok(());
        }

        match peer {
            Some(peer) => peer.push_to_read_buffer(bytes),
            None => {
                debug!(descriptor, peer = file.peer(), "Write to a removed peer");
                Err(IpcError::Closed)
            }
        }
    }

    /// Block until `descriptor` has data or is closed, at most `timeout`.
    pub fn wait_until_can_be_read(
        &self,
        descriptor: i32,
        timeout: Option<Duration>,
    ) -> Result<(), IpcError> {
        let file = self.registry.lock().find(descriptor)?;
        file.wait_until_can_be_read(timeout)
    }

    /// Read up to `max_len` bytes from `descriptor`.
    ///
    /// Only what is buffered is returned; `max_len` is never preallocated.
    pub fn read(&self, descriptor: i32, max_len: usize) -> Result<Vec<u8>, IpcError> {
        let file = self.registry.lock().find(descriptor)?;
        if max_len == 0 {
            return Ok(Vec::new());
        }
        file.read_up_to(max_len)
    }

    /// Read into `buffer`, returning how many bytes were copied.
    ///
    /// Blocks on empty files created with `reads_block`. An empty `buffer`
    /// succeeds immediately on any registered descriptor.
    pub fn read_into(&self, descriptor: i32, buffer: &mut [u8]) -> Result<usize, IpcError> {
        let file = self.registry.lock().find(descriptor)?;
        if buffer.is_empty() {
            return Ok(0);
        }
        file.read_into(buffer)
    }

    /// Close `descriptor` and its peer.
    ///
    /// Returns `false` if the descriptor is not registered.
    pub fn close(&self, descriptor: i32) -> bool {
        let (file, peer) = {
            let mut registry = self.registry.lock();
            let Some(file) = registry.files.remove(&descriptor) else {
                return false;
            };
            let peer = registry.files.get(&file.peer()).cloned();
            (file, peer)
        };

        file.mark_closed();
        if let Some(peer) = peer {
            peer.mark_closed();
        }
        true
    }

    /// Number of registered descriptors, closed peers included.
    pub fn open_descriptor_count(&self) -> usize {
        self.registry.lock().files.len()
    }
}

impl Drop for IpcEmulation {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Registry {
    fn allocate_descriptor(&mut self) -> i32 {
        let descriptor = self.next_descriptor;
        match descriptor.checked_add(1) {
            Some(next) => self.next_descriptor = next,
            None => {
                error!(descriptor, "Descriptor space exhausted");
                panic!("in-memory file descriptors exhausted");
            }
        }
        descriptor
    }

    fn find(&self, descriptor: i32) -> Result<Arc<InMemoryFile>, IpcError> {
        self.files
            .get(&descriptor)
            .cloned()
            .ok_or(IpcError::NoSuchFile(descriptor))
    }
}
