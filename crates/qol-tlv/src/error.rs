//! Codec errors

use thiserror::Error;

/// Framing error for LLDPDUs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// TLV header or value runs past the end of the buffer
    #[error("truncated TLV at offset {offset}: need {needed} bytes")]
    Truncated {
        /// Offset of the TLV header
        offset: usize,
        /// Bytes required from that offset
        needed: usize,
    },

    /// TLV value does not fit the 9-bit length field
    #[error("TLV value too long: {0} bytes")]
    ValueTooLong(usize),

    /// Chassis id, port id or TTL missing or out of order
    #[error("missing mandatory TLV: {0}")]
    MissingMandatory(&'static str),
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
