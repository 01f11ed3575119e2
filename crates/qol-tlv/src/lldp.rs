//! LLDPDU framing

use crate::{CodecError, CodecResult};
use bytes::{BufMut, Bytes, BytesMut};

/// Largest value a 9-bit length field can describe
pub const MAX_TLV_VALUE_LEN: usize = 0x01FF;

/// LLDP TLV types used by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvType {
    /// End of LLDPDU
    End,
    /// Chassis identifier
    ChassisId,
    /// Port identifier
    PortId,
    /// Time to live
    Ttl,
    /// Vendor extension slot
    OrganizationSpecific,
    /// Anything else
    Other(u8),
}

impl TlvType {
    /// Wire value
    pub fn to_u8(&self) -> u8 {
        match self {
            Self::End => 0,
            Self::ChassisId => 1,
            Self::PortId => 2,
            Self::Ttl => 3,
            Self::OrganizationSpecific => 127,
            Self::Other(v) => *v,
        }
    }

    /// From wire value
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::End,
            1 => Self::ChassisId,
            2 => Self::PortId,
            3 => Self::Ttl,
            127 => Self::OrganizationSpecific,
            _ => Self::Other(v),
        }
    }
}

/// One raw TLV: type plus value bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    /// TLV type
    pub tlv_type: TlvType,
    /// Value bytes, header excluded
    pub value: Bytes,
}

impl Tlv {
    /// Create new TLV
    pub fn new(tlv_type: TlvType, value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Value length as carried in the header
    #[inline]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// True for a zero-length value
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Header word: 7-bit type, 9-bit length
    pub fn header(&self) -> CodecResult<u16> {
        if self.value.len() > MAX_TLV_VALUE_LEN {
            return Err(CodecError::ValueTooLong(self.value.len()));
        }
        Ok(((self.tlv_type.to_u8() as u16 & 0x7F) << 9) | self.value.len() as u16)
    }

    /// Append header and value to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) -> CodecResult<()> {
        buf.put_u16(self.header()?);
        buf.put_slice(&self.value);
        Ok(())
    }
}

/// Walk TLVs in `data`, yielding `(offset_of_value, tlv)` until End or the
/// buffer runs out.
pub(crate) fn walk(data: &[u8]) -> CodecResult<Vec<(usize, Tlv)>> {
    let mut out = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        if pos + 2 > data.len() {
            return Err(CodecError::Truncated { offset: pos, needed: 2 });
        }
        let header = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let tlv_type = TlvType::from_u8((header >> 9) as u8);
        let len = (header & 0x01FF) as usize;
        pos += 2;

        if pos + len > data.len() {
            return Err(CodecError::Truncated { offset: pos, needed: len });
        }
        if tlv_type == TlvType::End {
            break;
        }
        out.push((pos, Tlv::new(tlv_type, Bytes::copy_from_slice(&data[pos..pos + len]))));
        pos += len;
    }

    Ok(out)
}

/// A parsed LLDPDU
///
/// The three mandatory TLVs are kept apart; everything between them and the
/// End TLV lives in `optional`, in wire order. End itself is implicit and
/// always written last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LldpFrame {
    /// Chassis id TLV (subtype byte, then the id)
    pub chassis_id: Tlv,
    /// Port id TLV (subtype byte, then the id)
    pub port_id: Tlv,
    /// TTL TLV
    pub ttl: Tlv,
    /// Optional TLVs in wire order
    pub optional: Vec<Tlv>,
}

impl LldpFrame {
    /// Chassis subtype for a MAC address
    pub const CHASSIS_SUBTYPE_MAC: u8 = 4;
    /// Port subtype for a locally assigned component
    pub const PORT_SUBTYPE_COMPONENT: u8 = 2;

    /// Frame as the controller emits it: MAC chassis id, 2-byte port number
    /// and TTL in seconds.
    pub fn new(chassis_mac: [u8; 6], port: u16, ttl_secs: u16) -> Self {
        let mut chassis = Vec::with_capacity(7);
        chassis.push(Self::CHASSIS_SUBTYPE_MAC);
        chassis.extend_from_slice(&chassis_mac);

        let mut port_id = Vec::with_capacity(3);
        port_id.push(Self::PORT_SUBTYPE_COMPONENT);
        port_id.extend_from_slice(&port.to_be_bytes());

        Self {
            chassis_id: Tlv::new(TlvType::ChassisId, chassis),
            port_id: Tlv::new(TlvType::PortId, port_id),
            ttl: Tlv::new(TlvType::Ttl, ttl_secs.to_be_bytes().to_vec()),
            optional: Vec::new(),
        }
    }

    /// Parse raw LLDPDU bytes (after the 0x88cc ethertype)
    pub fn parse(data: &[u8]) -> CodecResult<Self> {
        let mut tlvs = walk(data)?.into_iter().map(|(_, tlv)| tlv);

        let chassis_id = tlvs
            .next()
            .filter(|t| t.tlv_type == TlvType::ChassisId)
            .ok_or(CodecError::MissingMandatory("chassis id"))?;
        let port_id = tlvs
            .next()
            .filter(|t| t.tlv_type == TlvType::PortId)
            .ok_or(CodecError::MissingMandatory("port id"))?;
        let ttl = tlvs
            .next()
            .filter(|t| t.tlv_type == TlvType::Ttl)
            .ok_or(CodecError::MissingMandatory("ttl"))?;

        Ok(Self {
            chassis_id,
            port_id,
            ttl,
            optional: tlvs.collect(),
        })
    }

    /// Serialize, closing with the End TLV
    pub fn encode(&self) -> CodecResult<Bytes> {
        let body: usize = 3 * 2
            + self.chassis_id.len()
            + self.port_id.len()
            + self.ttl.len()
            + self.optional.iter().map(|t| 2 + t.len()).sum::<usize>();
        let mut buf = BytesMut::with_capacity(body + 2);

        self.chassis_id.encode_into(&mut buf)?;
        self.port_id.encode_into(&mut buf)?;
        self.ttl.encode_into(&mut buf)?;
        for tlv in &self.optional {
            tlv.encode_into(&mut buf)?;
        }
        buf.put_u16(0);

        Ok(buf.freeze())
    }

    /// Append an optional TLV
    pub fn push_optional(&mut self, tlv: Tlv) {
        self.optional.push(tlv);
    }

    /// Insert `tlv` ahead of the first optional TLV matching `before`,
    /// or at the end of the optional run when none matches.
    pub fn insert_optional_before<F>(&mut self, tlv: Tlv, before: F)
    where
        F: Fn(&Tlv) -> bool,
    {
        match self.optional.iter().position(before) {
            Some(idx) => self.optional.insert(idx, tlv),
            None => self.optional.push(tlv),
        }
    }

    /// First optional TLV satisfying `pred`
    pub fn find_optional<F>(&self, pred: F) -> Option<&Tlv>
    where
        F: Fn(&Tlv) -> bool,
    {
        self.optional.iter().find(|t| pred(*t))
    }
}
