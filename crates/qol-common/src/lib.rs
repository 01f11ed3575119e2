//! QoS-over-LLDP Common - shared primitives
//!
//! This crate provides the small value types every other crate keys on:
//! - Switch identifiers (datapath ids) and their colon-hex rendering
//! - Device keys of the form `s<switch>-eth<port>`
//! - Millisecond wall-clock timestamps
//! - Unit scaling for human-readable telemetry
//! - Lock-free counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod units;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reserved value meaning "not populated by the data plane"
pub const UNSET: u64 = 0x7FFF_FFFF_FFFF_FFFF;

/// 64-bit switch datapath id
///
/// Renders as eight colon-separated hex octets (`00:00:00:00:00:00:00:01`).
/// Parses from that form, the six-octet MAC form, or a plain decimal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SwitchId(u64);

impl SwitchId {
    /// Wrap a raw datapath id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    #[inline(always)]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Build from big-endian octets, at most eight
    pub fn from_octets(octets: &[u8]) -> QolResult<Self> {
        if octets.is_empty() || octets.len() > 8 {
            return Err(QolError::InvalidSwitchId(format!("{} octets", octets.len())));
        }
        Ok(Self(octets.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)))
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for SwitchId {
    type Err = QolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.contains(':') {
            return s
                .parse::<u64>()
                .map(Self)
                .map_err(|_| QolError::InvalidSwitchId(s.to_string()));
        }

        let mut octets = Vec::with_capacity(8);
        for part in s.split(':') {
            if part.len() != 2 {
                return Err(QolError::InvalidSwitchId(s.to_string()));
            }
            let b = u8::from_str_radix(part, 16)
                .map_err(|_| QolError::InvalidSwitchId(s.to_string()))?;
            octets.push(b);
        }
        if octets.len() != 6 && octets.len() != 8 {
            return Err(QolError::InvalidSwitchId(s.to_string()));
        }
        Self::from_octets(&octets)
    }
}

impl From<SwitchId> for String {
    fn from(id: SwitchId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SwitchId {
    type Error = QolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Primary key of every per-port record: one port on one switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DeviceKey {
    /// Owning switch
    pub switch: SwitchId,
    /// Port number on that switch
    pub port: u16,
}

impl DeviceKey {
    /// Create new device key
    pub const fn new(switch: SwitchId, port: u16) -> Self {
        Self { switch, port }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}-eth{}", self.switch.value(), self.port)
    }
}

impl FromStr for DeviceKey {
    type Err = QolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QolError::InvalidDeviceKey(s.to_string());
        let rest = s.strip_prefix('s').ok_or_else(invalid)?;
        let (switch, port) = rest.split_once("-eth").ok_or_else(invalid)?;
        let switch = switch.parse::<u64>().map_err(|_| invalid())?;
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(Self::new(SwitchId::new(switch), port))
    }
}

impl From<DeviceKey> for String {
    fn from(key: DeviceKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for DeviceKey {
    type Error = QolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Wall-clock timestamp, milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Current wall-clock time
    #[inline(always)]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self(millis)
    }

    /// Wrap milliseconds since epoch
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since epoch
    #[inline(always)]
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Local time as `yyyy-MM-dd HH:mm:ss`
    pub fn to_visual(&self) -> String {
        use chrono::{Local, TimeZone};
        match Local.timestamp_millis_opt(self.0 as i64).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => String::new(),
        }
    }
}

/// Lock-free counter
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create new counter
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Increment and return previous value
    #[inline(always)]
    pub fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Get current value
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_id_display() {
        let id = SwitchId::new(1);
        assert_eq!(id.to_string(), "00:00:00:00:00:00:00:01");
    }

    #[test]
    fn test_switch_id_parse_forms() {
        let long: SwitchId = "00:00:00:00:00:00:00:01".parse().unwrap();
        let mac: SwitchId = "00:00:00:00:00:01".parse().unwrap();
        let dec: SwitchId = "1".parse().unwrap();
        assert_eq!(long, mac);
        assert_eq!(mac, dec);
        assert_eq!(long.value(), 1);

        assert!("00:00:0g:00:00:01".parse::<SwitchId>().is_err());
        assert!("00:00:01".parse::<SwitchId>().is_err());
    }

    #[test]
    fn test_device_key_roundtrip() {
        let key = DeviceKey::new(SwitchId::new(1), 3);
        assert_eq!(key.to_string(), "s1-eth3");
        assert_eq!("s1-eth3".parse::<DeviceKey>().unwrap(), key);
        assert!("s1eth3".parse::<DeviceKey>().is_err());
        assert!("h1-eth3".parse::<DeviceKey>().is_err());
    }

    #[test]
    fn test_device_key_serde_as_string() {
        let key = DeviceKey::new(SwitchId::new(12), 7);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"s12-eth7\"");
        let back: DeviceKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_timestamp_visual_shape() {
        let ts = Timestamp::from_millis(1_700_000_000_000);
        let visual = ts.to_visual();
        assert_eq!(visual.len(), 19);
        assert_eq!(&visual[4..5], "-");
        assert_eq!(&visual[13..14], ":");
    }

    #[test]
    fn test_atomic_counter() {
        let counter = AtomicCounter::new(0);
        counter.inc();
        counter.inc();
        assert_eq!(counter.get(), 2);
    }
}
