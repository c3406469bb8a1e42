//! # IPC Emulation
//!
//! Duplex pipe pairs living entirely in memory, for environments without
//! kernel file descriptors.
//!
//! ## Semantics
//!
//! - Bytes written to one end are read, in order, from the other.
//! - Reads are short when less is buffered; blocking is chosen per pair.
//! - Closing one end closes its peer; a closed file reads as closed even
//!   with bytes still buffered.
//! - Zero-length reads and writes succeed on any registered descriptor.
//!
//! There is no global instance: create one with `IpcEmulation::init` and
//! hand it to whoever needs descriptors.

pub mod config;
pub mod emulation;
pub mod error;
pub mod file;
pub mod posix;

pub use config::EmulationConfig;
pub use emulation::IpcEmulation;
pub use error::IpcError;
pub use file::InMemoryFile;
