//! Single-source shortest path

use crate::WeightedGraph;
use qol_common::SwitchId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashSet};

/// A switch-level path and its cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPath {
    /// Switches from source to destination
    pub switches: Vec<SwitchId>,
    /// Path cost under the request's policy
    pub cost: f64,
}

impl WeightedPath {
    /// Number of links traversed
    pub fn hops(&self) -> usize {
        self.switches.len().saturating_sub(1)
    }
}

/// Nodes and edges a search must avoid
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    /// Switches that may not be entered
    pub nodes: HashSet<SwitchId>,
    /// Undirected edges that may not be crossed, stored low id first
    pub edges: HashSet<(SwitchId, SwitchId)>,
}

impl Exclusions {
    /// Forbid the edge between `a` and `b` in both directions
    pub fn ban_edge(&mut self, a: SwitchId, b: SwitchId) {
        self.edges.insert(if a <= b { (a, b) } else { (b, a) });
    }

    fn edge_banned(&self, a: SwitchId, b: SwitchId) -> bool {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.edges.contains(&key)
    }
}

#[derive(Debug, Clone, Copy)]
struct DijkstraState {
    cost: f64,
    node: SwitchId,
}

impl Eq for DijkstraState {}

impl PartialEq for DijkstraState {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for DijkstraState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap; lower switch id first on equal cost
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for DijkstraState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cost of walking `switches` in `graph`, or `None` if an edge is missing
pub fn path_cost<C>(graph: &WeightedGraph, switches: &[SwitchId], combine: &C) -> Option<f64>
where
    C: Fn(f64, f64) -> f64,
{
    switches.windows(2).try_fold(0.0, |acc, pair| {
        graph.edge(pair[0], pair[1]).map(|e| combine(acc, e.weight))
    })
}

/// Dijkstra from `from` to `to`.
///
/// `combine` extends a path cost by one edge weight and must never decrease
/// it. Equal-cost ties settle on the smaller switch id.
pub fn shortest_path<C>(
    graph: &WeightedGraph,
    from: SwitchId,
    to: SwitchId,
    combine: &C,
    exclusions: &Exclusions,
) -> Option<WeightedPath>
where
    C: Fn(f64, f64) -> f64,
{
    if exclusions.nodes.contains(&from) {
        return None;
    }
    if from == to {
        return Some(WeightedPath {
            switches: vec![from],
            cost: 0.0,
        });
    }

    let mut distances: BTreeMap<SwitchId, f64> = BTreeMap::new();
    let mut previous: BTreeMap<SwitchId, SwitchId> = BTreeMap::new();
    let mut heap = BinaryHeap::new();

    distances.insert(from, 0.0);
    heap.push(DijkstraState { cost: 0.0, node: from });

    while let Some(DijkstraState { cost, node }) = heap.pop() {
        if node == to {
            let mut path = vec![to];
            let mut current = to;
            while let Some(prev) = previous.get(&current) {
                path.push(*prev);
                current = *prev;
            }
            path.reverse();
            return Some(WeightedPath { switches: path, cost });
        }

        if cost > *distances.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }

        for (neighbor, edge) in graph.neighbors(node) {
            if exclusions.nodes.contains(&neighbor) || exclusions.edge_banned(node, neighbor) {
                continue;
            }
            let new_cost = combine(cost, edge.weight);
            if new_cost < *distances.get(&neighbor).unwrap_or(&f64::INFINITY) {
                distances.insert(neighbor, new_cost);
                previous.insert(neighbor, node);
                heap.push(DijkstraState {
                    cost: new_cost,
                    node: neighbor,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Link;

    fn sw(n: u64) -> SwitchId {
        SwitchId::new(n)
    }

    fn add(a: f64, b: f64) -> f64 {
        a + b
    }

    fn triangle() -> WeightedGraph {
        // 1-2 = 50, 1-3 = 80, 2-3 = 100
        let links = vec![
            Link::new(sw(1), 1, sw(2), 1),
            Link::new(sw(1), 2, sw(3), 1),
            Link::new(sw(2), 2, sw(3), 2),
        ];
        let weights = [50.0, 80.0, 100.0];
        let mut i = 0;
        WeightedGraph::build(&links, |_| {
            i += 1;
            Some(weights[i - 1])
        })
    }

    #[test]
    fn test_dijkstra() {
        let graph = triangle();
        let path = shortest_path(&graph, sw(1), sw(3), &add, &Exclusions::default()).unwrap();
        assert_eq!(path.switches, vec![sw(1), sw(3)]);
        assert_eq!(path.cost, 80.0);

        let path = shortest_path(&graph, sw(2), sw(3), &add, &Exclusions::default()).unwrap();
        assert_eq!(path.switches, vec![sw(2), sw(3)]);
    }

    #[test]
    fn test_exclusions() {
        let graph = triangle();
        let mut ex = Exclusions::default();
        ex.ban_edge(sw(3), sw(1));
        let path = shortest_path(&graph, sw(1), sw(3), &add, &ex).unwrap();
        assert_eq!(path.switches, vec![sw(1), sw(2), sw(3)]);
        assert_eq!(path.cost, 150.0);

        ex.nodes.insert(sw(2));
        assert!(shortest_path(&graph, sw(1), sw(3), &add, &ex).is_none());
    }

    #[test]
    fn test_bottleneck_combine() {
        let graph = triangle();
        let max = |a: f64, b: f64| a.max(b);
        let path = shortest_path(&graph, sw(1), sw(3), &max, &Exclusions::default()).unwrap();
        assert_eq!(path.cost, 80.0);
        assert_eq!(path_cost(&graph, &[sw(1), sw(2), sw(3)], &max), Some(100.0));
    }

    #[test]
    fn test_tie_prefers_lower_id() {
        // 1-2-4 and 1-3-4 both cost 2
        let links = vec![
            Link::new(sw(1), 1, sw(3), 1),
            Link::new(sw(1), 2, sw(2), 1),
            Link::new(sw(3), 2, sw(4), 1),
            Link::new(sw(2), 2, sw(4), 2),
        ];
        let graph = WeightedGraph::hop_count(&links);
        let path = shortest_path(&graph, sw(1), sw(4), &add, &Exclusions::default()).unwrap();
        assert_eq!(path.switches, vec![sw(1), sw(2), sw(4)]);
    }

    #[test]
    fn test_unreachable_and_trivial() {
        let graph = WeightedGraph::hop_count(&[Link::new(sw(1), 1, sw(2), 1)]);
        assert!(shortest_path(&graph, sw(1), sw(7), &add, &Exclusions::default()).is_none());

        let same = shortest_path(&graph, sw(7), sw(7), &add, &Exclusions::default()).unwrap();
        assert_eq!(same.switches, vec![sw(7)]);
        assert_eq!(same.hops(), 0);
    }
}
