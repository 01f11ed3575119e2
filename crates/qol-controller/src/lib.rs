//! QoS-over-LLDP controller
//!
//! Joins the telemetry stores with the route engine behind one facade:
//!
//! - ingest discovery frames (parsed or raw) into current and historical state
//! - answer QoS queries in raw or human-scaled form
//! - answer route queries under any weight policy
//! - emit discovery probes carrying the QoS placeholder

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod service;
pub mod snapshot;

#[cfg(test)]
mod scenarios;

pub use api::{apis, find_api, ApiDescriptor, ApiParameter, BASE_PATH};
pub use config::*;
pub use error::*;
pub use service::*;
pub use snapshot::*;
