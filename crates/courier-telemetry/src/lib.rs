//! # Courier Telemetry
//!
//! Structured logging for every Courier component.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::for_service("smart-card-bridge");
//!     init_logging(&config).expect("Failed to init logging");
//!
//!     // Requesters, receivers and the IPC emulation now log through tracing
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CR_SERVICE_NAME` | `courier` | Service name in logs |
//! | `CR_LOG_LEVEL` | `info` | Log filter, falls back to `RUST_LOG` |
//! | `CR_CONSOLE_OUTPUT` | `true` | Write logs to the console |
//! | `CR_JSON_LOGS` | `false` | JSON instead of pretty output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}
