//! Latency echo vendor TLV
//!
//! The controller stamps outgoing LLDP with its wall clock; the switch sends
//! the stamp back unchanged. Round-trip control latency is what is left of
//! the elapsed time once the switch's own echo delay is taken out.

use crate::be_to_u64;
use crate::lldp::{LldpFrame, Tlv, TlvType};
use bytes::{BufMut, BytesMut};
use qol_common::Timestamp;

/// OUI and subtype identifying the echo block
pub const LATENCY_SIGNATURE: [u8; 4] = [0x00, 0x26, 0xe1, 0x01];

/// Signature plus one 8-byte timestamp
pub const LATENCY_BLOCK_LEN: usize = 12;

/// Controller timestamp echoed by a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyEcho {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl LatencyEcho {
    /// Create new echo block
    pub fn new(timestamp_ms: u64) -> Self {
        Self { timestamp_ms }
    }

    /// Stamp with the current wall clock
    pub fn now() -> Self {
        Self::new(Timestamp::now().as_millis())
    }

    /// Wrap in an organizationally specific TLV
    pub fn to_tlv(&self) -> Tlv {
        let mut buf = BytesMut::with_capacity(LATENCY_BLOCK_LEN);
        buf.put_slice(&LATENCY_SIGNATURE);
        buf.put_u64(self.timestamp_ms);
        Tlv::new(TlvType::OrganizationSpecific, buf.freeze())
    }

    /// True when `tlv` has the echo block's type, length and signature
    pub fn matches(tlv: &Tlv) -> bool {
        tlv.tlv_type == TlvType::OrganizationSpecific
            && tlv.len() == LATENCY_BLOCK_LEN
            && tlv.value[..4] == LATENCY_SIGNATURE
    }

    /// Decode a TLV value. `None` means "not an echo block".
    pub fn decode(value: &[u8]) -> Option<Self> {
        if value.len() != LATENCY_BLOCK_LEN || value[..4] != LATENCY_SIGNATURE {
            return None;
        }
        Some(Self::new(be_to_u64(&value[4..12])))
    }

    /// First echo block among a frame's optional TLVs
    pub fn find_in(frame: &LldpFrame) -> Option<Self> {
        frame
            .find_optional(Self::matches)
            .and_then(|tlv| Self::decode(&tlv.value))
    }

    /// Round-trip control latency in microseconds.
    ///
    /// `now - (stamp + echo_delay)`, floored at zero for clock skew.
    pub fn control_latency_us(&self, now: Timestamp, echo_delay_ms: u64) -> u64 {
        now.as_millis()
            .saturating_sub(self.timestamp_ms.saturating_add(echo_delay_ms))
            .saturating_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_layout() {
        let tlv = LatencyEcho::new(0x0102).to_tlv();
        assert_eq!(tlv.len(), LATENCY_BLOCK_LEN);
        assert_eq!(&tlv.value[..4], &LATENCY_SIGNATURE);
        assert_eq!(&tlv.value[4..], &0x0102u64.to_be_bytes());
        assert!(LatencyEcho::matches(&tlv));
    }

    #[test]
    fn test_echo_decode() {
        let tlv = LatencyEcho::new(1_700_000_000_123).to_tlv();
        assert_eq!(
            LatencyEcho::decode(&tlv.value),
            Some(LatencyEcho::new(1_700_000_000_123))
        );

        let mut bad = tlv.value.to_vec();
        bad[3] = 0x02;
        assert_eq!(LatencyEcho::decode(&bad), None);
    }

    #[test]
    fn test_control_latency() {
        let echo = LatencyEcho::new(10_000);
        let now = Timestamp::from_millis(10_050);
        assert_eq!(echo.control_latency_us(now, 20), 30_000);
        assert_eq!(echo.control_latency_us(now, 0), 50_000);
        // skewed clock never goes negative
        assert_eq!(echo.control_latency_us(now, 100), 0);
    }

    #[test]
    fn test_find_in_frame() {
        let mut frame = LldpFrame::new([0, 0, 0, 0, 0, 9], 2, 120);
        frame.push_optional(Tlv::new(TlvType::OrganizationSpecific, vec![0u8; 12]));
        frame.push_optional(LatencyEcho::new(42).to_tlv());
        assert_eq!(LatencyEcho::find_in(&frame), Some(LatencyEcho::new(42)));
    }
}
