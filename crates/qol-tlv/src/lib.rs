//! LLDP TLV codec with QoS telemetry extensions
//!
//! An LLDPDU is a run of TLVs, each behind a 2-byte header holding a 7-bit
//! type and a 9-bit length. Two vendor extensions ride in the
//! organizationally specific slot (type 127):
//!
//! - the QoS block: 4-byte signature, then bandwidth, delay, jitter and the
//!   raw bit pattern of the loss percentage, all 8-byte big-endian
//! - the latency echo: 4-byte signature, then an 8-byte millisecond timestamp
//!
//! Both are told apart from other vendor TLVs by length and signature.
//! Anything that does not match is left alone, never reported as an error.

#![warn(missing_docs)]

pub mod error;
pub mod latency;
pub mod lldp;
pub mod qos;

pub use error::*;
pub use latency::*;
pub use lldp::*;
pub use qos::*;

/// Big-endian bytes to integer, most significant byte first.
///
/// Accepts any width; only the last eight bytes survive for wider input.
#[inline]
pub fn be_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
}
