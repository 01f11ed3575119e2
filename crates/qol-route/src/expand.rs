//! Switch path to device/port path

use crate::{AttachmentPoint, Endpoint, HostId, WeightedGraph};
use qol_common::{DeviceKey, SwitchId};

/// An endpoint after host lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    /// Route starts or ends on the switch itself
    Switch(SwitchId),
    /// Route starts or ends on a host behind `at`
    Host {
        /// Host id
        host: HostId,
        /// Where the host is attached
        at: AttachmentPoint,
    },
}

impl Resolved {
    /// Switch the route graph search starts or ends at
    pub fn switch(&self) -> SwitchId {
        match self {
            Resolved::Switch(id) => *id,
            Resolved::Host { at, .. } => at.switch,
        }
    }

    /// Label as given in the request
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Resolved::Switch(id) => Endpoint::Switch(*id),
            Resolved::Host { host, .. } => Endpoint::Host(*host),
        }
    }
}

/// Device keys of every hop, in travel order: for each consecutive switch
/// pair, the egress port then the ingress port.
pub fn hop_keys(graph: &WeightedGraph, switches: &[SwitchId]) -> Vec<DeviceKey> {
    let mut keys = Vec::with_capacity(switches.len().saturating_sub(1) * 2);
    for pair in switches.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        // the graph holds every link in both directions with ports swapped
        if let Some(edge) = graph.edge(a, b) {
            keys.push(DeviceKey::new(a, edge.local_port));
            keys.push(DeviceKey::new(b, edge.remote_port));
        }
    }
    keys
}

/// Alternating host / switch-port labels for a switch path.
///
/// `[h1, s1-eth1, s1-eth2, s2-eth1, ..., s3-eth1, h3]`; switch endpoints
/// contribute no labels of their own.
pub fn expand(graph: &WeightedGraph, switches: &[SwitchId], src: &Resolved, dst: &Resolved) -> Vec<String> {
    let mut labels = Vec::with_capacity(switches.len() * 2 + 4);

    if let Resolved::Host { host, at } = src {
        labels.push(host.to_string());
        labels.push(at.key().to_string());
    }
    labels.extend(hop_keys(graph, switches).iter().map(|k| k.to_string()));
    if let Resolved::Host { host, at } = dst {
        labels.push(at.key().to_string());
        labels.push(host.to_string());
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Link;

    fn sw(n: u64) -> SwitchId {
        SwitchId::new(n)
    }

    fn linear() -> WeightedGraph {
        // recorded from either end
        WeightedGraph::hop_count(&[Link::new(sw(1), 2, sw(2), 1), Link::new(sw(3), 1, sw(2), 2)])
    }

    #[test]
    fn test_expand_hosts() {
        let src = Resolved::Host {
            host: HostId(1),
            at: AttachmentPoint { switch: sw(1), port: 1 },
        };
        let dst = Resolved::Host {
            host: HostId(3),
            at: AttachmentPoint { switch: sw(3), port: 2 },
        };
        let labels = expand(&linear(), &[sw(1), sw(2), sw(3)], &src, &dst);
        assert_eq!(
            labels,
            vec!["h1", "s1-eth1", "s1-eth2", "s2-eth1", "s2-eth2", "s3-eth1", "s3-eth2", "h3"]
        );
    }

    #[test]
    fn test_expand_switches() {
        let labels = expand(
            &linear(),
            &[sw(3), sw(2)],
            &Resolved::Switch(sw(3)),
            &Resolved::Switch(sw(2)),
        );
        assert_eq!(labels, vec!["s3-eth1", "s2-eth2"]);
    }

    #[test]
    fn test_same_switch_hosts() {
        let src = Resolved::Host {
            host: HostId(1),
            at: AttachmentPoint { switch: sw(1), port: 1 },
        };
        let dst = Resolved::Host {
            host: HostId(2),
            at: AttachmentPoint { switch: sw(1), port: 5 },
        };
        let labels = expand(&linear(), &[sw(1)], &src, &dst);
        assert_eq!(labels, vec!["h1", "s1-eth1", "s1-eth5", "h2"]);
    }
}
