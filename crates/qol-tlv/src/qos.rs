//! QoS vendor TLV

use crate::lldp::{walk, Tlv, TlvType};
use crate::{be_to_u64, latency::LatencyEcho};
use crate::{CodecResult, LldpFrame};
use bytes::{BufMut, BytesMut};
use qol_common::UNSET;

/// Leading bytes identifying a QoS block
pub const QOS_SIGNATURE: [u8; 4] = [0xab, 0xcd, 0xef, 0x66];

/// Signature plus four 8-byte fields
pub const QOS_BLOCK_LEN: usize = 36;

/// Four link metrics as carried on the wire
///
/// Unset fields hold [`UNSET`]. Loss is stored as the raw bit pattern of an
/// `f64`, so its unset form is `f64::from_bits(UNSET)`, which is a NaN.
#[derive(Debug, Clone, Copy)]
pub struct QosBlock {
    /// Bits per second
    pub bandwidth: u64,
    /// Microseconds
    pub delay: u64,
    /// Microseconds
    pub jitter: u64,
    /// Percent
    pub loss: f64,
}

impl Default for QosBlock {
    fn default() -> Self {
        Self {
            bandwidth: UNSET,
            delay: UNSET,
            jitter: UNSET,
            loss: f64::from_bits(UNSET),
        }
    }
}

impl PartialEq for QosBlock {
    fn eq(&self, other: &Self) -> bool {
        self.bandwidth == other.bandwidth
            && self.delay == other.delay
            && self.jitter == other.jitter
            && self.loss.to_bits() == other.loss.to_bits()
    }
}

impl QosBlock {
    /// Build from optional readings; missing ones become the sentinel
    pub fn new(
        bandwidth: Option<u64>,
        delay: Option<u64>,
        jitter: Option<u64>,
        loss: Option<f64>,
    ) -> Self {
        let unset = Self::default();
        Self {
            bandwidth: bandwidth.unwrap_or(unset.bandwidth),
            delay: delay.unwrap_or(unset.delay),
            jitter: jitter.unwrap_or(unset.jitter),
            loss: loss.unwrap_or(unset.loss),
        }
    }

    /// Value bytes: signature then the four big-endian fields
    pub fn encode_value(&self) -> [u8; QOS_BLOCK_LEN] {
        let mut buf = BytesMut::with_capacity(QOS_BLOCK_LEN);
        buf.put_slice(&QOS_SIGNATURE);
        self.put_metrics(&mut buf);

        let mut out = [0u8; QOS_BLOCK_LEN];
        out.copy_from_slice(&buf);
        out
    }

    fn put_metrics(&self, buf: &mut BytesMut) {
        buf.put_u64(self.bandwidth);
        buf.put_u64(self.delay);
        buf.put_u64(self.jitter);
        buf.put_u64(self.loss.to_bits());
    }

    /// Wrap in an organizationally specific TLV
    pub fn to_tlv(&self) -> Tlv {
        Tlv::new(TlvType::OrganizationSpecific, self.encode_value().to_vec())
    }

    /// True when `tlv` has the QoS block's type, length and signature
    pub fn matches(tlv: &Tlv) -> bool {
        tlv.tlv_type == TlvType::OrganizationSpecific
            && tlv.len() == QOS_BLOCK_LEN
            && tlv.value[..4] == QOS_SIGNATURE
    }

    /// Decode a TLV value. `None` means "not a QoS block".
    pub fn decode(value: &[u8]) -> Option<Self> {
        if value.len() != QOS_BLOCK_LEN || value[..4] != QOS_SIGNATURE {
            return None;
        }
        Some(Self {
            bandwidth: be_to_u64(&value[4..12]),
            delay: be_to_u64(&value[12..20]),
            jitter: be_to_u64(&value[20..28]),
            loss: f64::from_bits(be_to_u64(&value[28..36])),
        })
    }

    /// First QoS block among a frame's optional TLVs
    pub fn find_in(frame: &LldpFrame) -> Option<Self> {
        frame
            .find_optional(Self::matches)
            .and_then(|tlv| Self::decode(&tlv.value))
    }
}

/// Add a QoS TLV to an outgoing frame, ahead of any latency echo TLV.
///
/// End is written by [`LldpFrame::encode`], so the block always lands before
/// the closing TLV.
pub fn insert_qos_tlv(frame: &mut LldpFrame, block: &QosBlock) {
    frame.insert_optional_before(block.to_tlv(), LatencyEcho::matches);
}

/// Overwrite the metrics of the QoS placeholder inside an encoded LLDPDU.
///
/// Returns `false` when the frame carries no QoS block.
pub fn fill_qos_block(frame: &mut [u8], block: &QosBlock) -> CodecResult<bool> {
    let target = walk(frame)?
        .into_iter()
        .find(|(_, tlv)| QosBlock::matches(tlv))
        .map(|(offset, _)| offset);

    let Some(offset) = target else {
        tracing::debug!("no QoS placeholder in frame");
        return Ok(false);
    };

    let mut metrics = BytesMut::with_capacity(QOS_BLOCK_LEN - 4);
    block.put_metrics(&mut metrics);
    frame[offset + 4..offset + QOS_BLOCK_LEN].copy_from_slice(&metrics);
    Ok(true)
}
