//! Error types for identifier parsing

use thiserror::Error;

/// Shared error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QolError {
    /// Switch id is neither colon-hex nor decimal
    #[error("invalid switch id: {0}")]
    InvalidSwitchId(String),

    /// Device key does not follow `s<switch>-eth<port>`
    #[error("invalid device key: {0}")]
    InvalidDeviceKey(String),

    /// Unknown metric name
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
}

/// Result type for identifier parsing
pub type QolResult<T> = Result<T, QolError>;
