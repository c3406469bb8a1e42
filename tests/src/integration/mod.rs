//! Integration flows.

pub mod fixtures;

mod ipc_flows;
mod request_flows;
