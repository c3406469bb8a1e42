//! # Courier Test Suite
//!
//! Cross-crate flows that need more than one crate at a time.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs        # Linked endpoints with running channel threads
//!     ├── request_flows.rs   # Requester <-> receiver over a real channel pair
//!     ├── remote_calls.rs    # RemoteCallAdaptor against a function table
//!     └── ipc_flows.rs       # Emulated pipes driven from several threads
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cr-tests
//! cargo test -p cr-tests integration::request_flows::
//! ```

pub mod integration;
