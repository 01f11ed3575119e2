//! Route errors

use serde::Serialize;
use thiserror::Error;

/// Terminal failure of one route request
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RouteError {
    /// One or both endpoints could not be resolved; every one is listed
    #[error("unknown endpoints: {}", .0.join(", "))]
    UnknownEndpoints(Vec<String>),

    /// No path between the resolved endpoints
    #[error("{from} to {to} unreachable")]
    Unreachable {
        /// Requested source
        from: String,
        /// Requested destination
        to: String,
    },

    /// Link list or host map could not be read
    #[error("topology unavailable: {0}")]
    TopologyUnavailable(String),

    /// Endpoint or policy text did not parse
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for routing
pub type RouteResult<T> = Result<T, RouteError>;
