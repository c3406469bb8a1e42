//! Error types for the IPC emulation

use thiserror::Error;

/// Outcome of a descriptor operation that did not succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IpcError {
    /// The descriptor was never created or is already closed and removed.
    #[error("No in-memory file with descriptor {0}")]
    NoSuchFile(i32),

    /// A non-blocking read found nothing buffered.
    #[error("No data available")]
    NoData,

    /// The file, or the peer a write targets, is closed.
    #[error("In-memory file is closed")]
    Closed,

    /// A bounded wait elapsed without data or closure.
    #[error("Timed out waiting for data")]
    TimedOut,

    /// The emulation was shut down.
    #[error("IPC emulation is shut down")]
    ShutDown,

    #[error("Invalid IPC emulation config: {0}")]
    InvalidConfig(String),
}
