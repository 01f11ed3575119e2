//! Error types for the controller

use qol_common::SwitchId;
use qol_route::RouteError;
use qol_telemetry::HistoryError;
use qol_tlv::CodecError;
use thiserror::Error;

/// Controller error type
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Configuration file unreadable or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Topology snapshot unreadable or invalid
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Frame bytes did not parse
    #[error("frame error: {0}")]
    Frame(#[from] CodecError),

    /// History limits refused
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Route request failed
    #[error(transparent)]
    Route(#[from] RouteError),

    /// No current sample for the device key
    #[error("unknown device: {0}")]
    UnknownDevice(String),

    /// Switch id uses bits a 6-byte chassis MAC cannot carry
    #[error("switch {0} does not fit a chassis MAC")]
    ChassisOverflow(SwitchId),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    /// Route query that has a definite "cannot reach" answer: unknown
    /// endpoints or no path. Topology outages are not answers.
    pub fn unsatisfied_route(&self) -> Option<&RouteError> {
        match self {
            ControllerError::Route(
                e @ (RouteError::UnknownEndpoints(_) | RouteError::Unreachable { .. }),
            ) => Some(e),
            _ => None,
        }
    }
}

/// Result type for controller operations
pub type ControllerResult<T> = Result<T, ControllerError>;
