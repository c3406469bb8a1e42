//! IPC emulation configuration.

use crate::error::IpcError;
use serde::{Deserialize, Serialize};
use std::env;

/// Settings of an `IpcEmulation` instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulationConfig {
    /// First descriptor handed out. Must be positive.
    pub first_descriptor: i32,
    /// Whether pairs from `create_default_pair` block on empty reads.
    pub reads_block: bool,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            first_descriptor: 1,
            reads_block: true,
        }
    }
}

impl EmulationConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CR_IPC_FIRST_DESCRIPTOR`: First descriptor (default: 1)
    /// - `CR_IPC_READS_BLOCK`: Blocking reads for default pairs (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            first_descriptor: env::var("CR_IPC_FIRST_DESCRIPTOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.first_descriptor),

            reads_block: env::var("CR_IPC_READS_BLOCK")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.reads_block),
        }
    }

    pub fn validate(&self) -> Result<(), IpcError> {
        if self.first_descriptor <= 0 {
            return Err(IpcError::InvalidConfig(format!(
                "first_descriptor must be positive, got {}",
                self.first_descriptor
            )));
        }
        Ok(())
    }

    /// Builder-style method to set the first descriptor
    pub fn with_first_descriptor(mut self, first_descriptor: i32) -> Self {
        self.first_descriptor = first_descriptor;
        self
    }

    /// Builder-style method to set the default read mode
    pub fn with_reads_block(mut self, reads_block: bool) -> Self {
        self.reads_block = reads_block;
        self
    }
}
