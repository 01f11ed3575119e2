//! Per-request weighted switch graph

use crate::{Link, Policy};
use qol_common::{DeviceKey, SwitchId};
use qol_telemetry::{CurrentStateStore, QosSample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read access to the latest sample per port
pub trait SampleSource: Send + Sync {
    /// Latest sample for `key`
    fn sample(&self, key: &DeviceKey) -> Option<QosSample>;
}

impl SampleSource for CurrentStateStore {
    fn sample(&self, key: &DeviceKey) -> Option<QosSample> {
        self.get(key)
    }
}

/// What to do with a link when either port has no current sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSamplePolicy {
    /// Leave the link out of the graph
    Exclude,
    /// Give the link this fixed weight
    DefaultWeight(f64),
}

impl Default for MissingSamplePolicy {
    fn default() -> Self {
        MissingSamplePolicy::Exclude
    }
}

/// One direction of a link as seen from `from`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Edge weight
    pub weight: f64,
    /// Port on the near switch
    pub local_port: u16,
    /// Port on the far switch
    pub remote_port: u16,
}

/// Undirected switch graph with one edge per switch pair.
///
/// Adjacency is ordered by switch id so every traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct WeightedGraph {
    adjacency: BTreeMap<SwitchId, BTreeMap<SwitchId, Edge>>,
}

impl WeightedGraph {
    /// Build from a link list, weighing each link with `weigh`.
    ///
    /// Links weighed `None` are dropped, as are self-loops. Parallel links
    /// keep the lightest; the first one seen wins a tie.
    pub fn build<F>(links: &[Link], mut weigh: F) -> Self
    where
        F: FnMut(&Link) -> Option<f64>,
    {
        let mut graph = Self::default();
        for link in links {
            if link.src_switch == link.dst_switch {
                continue;
            }
            graph.add_node(link.src_switch);
            graph.add_node(link.dst_switch);

            let Some(weight) = weigh(link) else {
                continue;
            };
            if let Some(existing) = graph.edge(link.src_switch, link.dst_switch) {
                if existing.weight <= weight {
                    continue;
                }
            }
            graph.set_edge(link.src_switch, link.dst_switch, weight, link.src_port, link.dst_port);
            graph.set_edge(link.dst_switch, link.src_switch, weight, link.dst_port, link.src_port);
        }
        graph
    }

    /// Every link weighs 1
    pub fn hop_count(links: &[Link]) -> Self {
        Self::build(links, |_| Some(1.0))
    }

    /// Weigh links from current samples under `policy`
    pub fn for_policy<S>(
        links: &[Link],
        samples: &S,
        policy: Policy,
        missing: MissingSamplePolicy,
    ) -> Self
    where
        S: SampleSource + ?Sized,
    {
        Self::build(links, |link| {
            match (samples.sample(&link.src_key()), samples.sample(&link.dst_key())) {
                (Some(a), Some(b)) => Some(policy.edge_weight(&a, &b)),
                _ => match missing {
                    MissingSamplePolicy::Exclude => {
                        tracing::trace!(src = %link.src_key(), dst = %link.dst_key(), "link without samples excluded");
                        None
                    }
                    MissingSamplePolicy::DefaultWeight(w) => Some(w),
                },
            }
        })
    }

    fn add_node(&mut self, node: SwitchId) {
        self.adjacency.entry(node).or_default();
    }

    fn set_edge(&mut self, from: SwitchId, to: SwitchId, weight: f64, local_port: u16, remote_port: u16) {
        self.adjacency.entry(from).or_default().insert(
            to,
            Edge {
                weight,
                local_port,
                remote_port,
            },
        );
    }

    /// Edge from `from` to `to`
    #[inline]
    pub fn edge(&self, from: SwitchId, to: SwitchId) -> Option<&Edge> {
        self.adjacency.get(&from).and_then(|n| n.get(&to))
    }

    /// Neighbors of `node` in switch-id order
    pub fn neighbors(&self, node: SwitchId) -> impl Iterator<Item = (SwitchId, &Edge)> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|n| n.iter().map(|(id, e)| (*id, e)))
    }

    /// True when `node` appears in any link
    pub fn contains(&self, node: SwitchId) -> bool {
        self.adjacency.contains_key(&node)
    }

    /// Switches in id order
    pub fn nodes(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|n| n.len()).sum::<usize>() / 2
    }
}
