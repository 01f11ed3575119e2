//! Yen's k shortest loopless paths

use crate::dijkstra::{path_cost, shortest_path, Exclusions, WeightedPath};
use crate::WeightedGraph;
use qol_common::SwitchId;

/// Up to `k` loopless paths from `from` to `to`, cheapest first.
///
/// Fewer come back when the graph has fewer. Equal-cost candidates keep the
/// order they were discovered in.
pub fn k_shortest_paths<C>(
    graph: &WeightedGraph,
    from: SwitchId,
    to: SwitchId,
    k: usize,
    combine: &C,
) -> Vec<WeightedPath>
where
    C: Fn(f64, f64) -> f64,
{
    if k == 0 {
        return Vec::new();
    }
    let Some(first) = shortest_path(graph, from, to, combine, &Exclusions::default()) else {
        return Vec::new();
    };

    let mut accepted = vec![first];
    let mut candidates: Vec<WeightedPath> = Vec::new();

    while accepted.len() < k {
        let last = accepted[accepted.len() - 1].switches.clone();

        for spur_idx in 0..last.len().saturating_sub(1) {
            let spur = last[spur_idx];
            let root = &last[..=spur_idx];

            let mut exclusions = Exclusions::default();
            for path in &accepted {
                if path.switches.len() > spur_idx + 1 && path.switches[..=spur_idx] == *root {
                    exclusions.ban_edge(path.switches[spur_idx], path.switches[spur_idx + 1]);
                }
            }
            exclusions.nodes.extend(root[..spur_idx].iter().copied());

            let Some(spur_path) = shortest_path(graph, spur, to, combine, &exclusions) else {
                continue;
            };

            let mut switches = root[..spur_idx].to_vec();
            switches.extend_from_slice(&spur_path.switches);

            let known = accepted.iter().chain(candidates.iter()).any(|p| p.switches == switches);
            if known {
                continue;
            }
            if let Some(cost) = path_cost(graph, &switches, combine) {
                candidates.push(WeightedPath { switches, cost });
            }
        }

        // cheapest candidate, earliest on ties
        let best = candidates
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (idx, p)| match best {
                Some((_, cost)) if cost <= p.cost => best,
                _ => Some((idx, p.cost)),
            });
        match best {
            Some((idx, _)) => accepted.push(candidates.remove(idx)),
            None => break,
        }
    }

    accepted
}
