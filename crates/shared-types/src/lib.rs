//! # Shared Types Crate
//!
//! Contains the `TypedMessage` envelope and the opaque `Payload` value that
//! every other crate in the workspace exchanges.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: The envelope shape is defined here only.
//! - **Opaque Data**: `data` and payloads are `serde_json::Value` and are
//!   copied or moved, never inspected, by the transport layers.

pub mod envelope;
pub mod errors;

pub use envelope::{kind_of, Payload, TypedMessage, DATA_KEY, TYPE_KEY};
pub use errors::EnvelopeError;
