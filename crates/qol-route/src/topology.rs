//! Topology inputs: switch links, host attachment points, endpoints

use crate::{RouteError, RouteResult};
use parking_lot::RwLock;
use qol_common::{DeviceKey, SwitchId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One discovered switch-to-switch link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Link {
    /// Switch the link was recorded from
    pub src_switch: SwitchId,
    /// Port on `src_switch`
    pub src_port: u16,
    /// Far-end switch
    pub dst_switch: SwitchId,
    /// Port on `dst_switch`
    pub dst_port: u16,
    /// Discovery saw traffic both ways
    #[serde(default = "default_bidirectional")]
    pub bidirectional: bool,
}

fn default_bidirectional() -> bool {
    true
}

impl Link {
    /// Create new bidirectional link
    pub fn new(src_switch: SwitchId, src_port: u16, dst_switch: SwitchId, dst_port: u16) -> Self {
        Self {
            src_switch,
            src_port,
            dst_switch,
            dst_port,
            bidirectional: true,
        }
    }

    /// Device key of the source port
    pub fn src_key(&self) -> DeviceKey {
        DeviceKey::new(self.src_switch, self.src_port)
    }

    /// Device key of the destination port
    pub fn dst_key(&self) -> DeviceKey {
        DeviceKey::new(self.dst_switch, self.dst_port)
    }
}

/// Where a host plugs into the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentPoint {
    /// Attachment switch
    pub switch: SwitchId,
    /// Attachment port
    pub port: u16,
}

impl AttachmentPoint {
    /// Device key of the attachment port
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.switch, self.port)
    }
}

/// Host identified by its MAC address as an integer; renders as `h<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct HostId(pub u64);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

impl FromStr for HostId {
    type Err = RouteError;

    /// Accepts `h<n>` or a colon-hex MAC
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RouteError::InvalidRequest(format!("invalid host id: {}", s));
        if let Some(n) = s.strip_prefix('h') {
            return n.parse().map(HostId).map_err(|_| invalid());
        }
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(invalid());
        }
        let mut mac = 0u64;
        for part in parts {
            let b = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
            mac = (mac << 8) | b as u64;
        }
        Ok(HostId(mac))
    }
}

impl From<HostId> for String {
    fn from(id: HostId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for HostId {
    type Error = RouteError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One end of a route request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// A switch, used as-is
    Switch(SwitchId),
    /// A host, resolved through the host map
    Host(HostId),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Switch(id) => write!(f, "s{}", id.value()),
            Endpoint::Host(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for Endpoint {
    type Err = RouteError;

    /// `s<n>`, `h<n>`, or a colon-hex switch id
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(n) = s.strip_prefix('s') {
            return n
                .parse::<u64>()
                .map(|v| Endpoint::Switch(SwitchId::new(v)))
                .map_err(|_| RouteError::InvalidRequest(format!("invalid switch: {}", s)));
        }
        if s.starts_with('h') {
            return s.parse().map(Endpoint::Host);
        }
        s.parse::<SwitchId>()
            .map(Endpoint::Switch)
            .map_err(|_| RouteError::InvalidRequest(format!("invalid endpoint: {}", s)))
    }
}

/// Supplies the current switch link list
pub trait TopologySource: Send + Sync {
    /// Snapshot of every known link
    fn links(&self) -> RouteResult<Vec<Link>>;
}

/// Supplies host attachment points
pub trait HostDirectory: Send + Sync {
    /// Snapshot of the host map
    fn hosts(&self) -> RouteResult<BTreeMap<HostId, AttachmentPoint>>;
}

/// In-memory topology fed by whoever runs discovery
#[derive(Debug, Default)]
pub struct StaticTopology {
    links: RwLock<Vec<Link>>,
    hosts: RwLock<BTreeMap<HostId, AttachmentPoint>>,
}

impl StaticTopology {
    /// Create new empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the link list
    pub fn set_links(&self, links: Vec<Link>) {
        *self.links.write() = links;
    }

    /// Add one link
    pub fn add_link(&self, link: Link) {
        self.links.write().push(link);
    }

    /// Record or move a host
    pub fn set_host(&self, host: HostId, at: AttachmentPoint) {
        self.hosts.write().insert(host, at);
    }

    /// Forget a host
    pub fn remove_host(&self, host: &HostId) -> Option<AttachmentPoint> {
        self.hosts.write().remove(host)
    }
}

impl TopologySource for StaticTopology {
    fn links(&self) -> RouteResult<Vec<Link>> {
        Ok(self.links.read().clone())
    }
}

impl HostDirectory for StaticTopology {
    fn hosts(&self) -> RouteResult<BTreeMap<HostId, AttachmentPoint>> {
        Ok(self.hosts.read().clone())
    }
}
