//! Route requests end to end
//!
//! Every request runs resolve, build, search, expand (and optionally
//! aggregate) against a single snapshot of the link list and host map. Any
//! stage failing fails the whole request.

use crate::dijkstra::{shortest_path, Exclusions, WeightedPath};
use crate::expand::{expand, hop_keys, Resolved};
use crate::ksp::k_shortest_paths;
use crate::{
    AttachmentPoint, Endpoint, HostDirectory, HostId, Link, MissingSamplePolicy, Policy, RouteError,
    RouteResult, SampleSource, TopologySource, WeightedGraph,
};
use qol_common::{AtomicCounter, DeviceKey, SwitchId};
use qol_telemetry::QosSample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Largest k honoured unless configured otherwise
pub const DEFAULT_MAX_K: usize = 16;

/// One answered route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Policy the route was optimized for; `None` for hop count
    pub policy: Option<Policy>,
    /// Switch-level path
    pub switches: Vec<SwitchId>,
    /// Host and switch-port labels in travel order
    pub devices: Vec<String>,
    /// Path cost under the policy
    pub cost: f64,
}

/// Current sample for one port on a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopQos {
    /// Port
    pub device: DeviceKey,
    /// Its latest sample, if any
    pub sample: Option<QosSample>,
}

/// Whole-path summary over the ports that have samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathAggregate {
    /// Narrowest bandwidth, bits/s
    pub bandwidth: Option<u64>,
    /// Summed delay, us
    pub delay: u64,
    /// Summed jitter, us
    pub jitter: u64,
    /// Product of loss percentages
    pub loss: f64,
    /// Summed control latency, us
    pub latency: u64,
    /// Ports that contributed
    pub sampled_ports: usize,
    /// Ports without a sample
    pub missing_ports: usize,
}

impl PathAggregate {
    /// Fold per-hop samples: sum for additive metrics, product for loss,
    /// min for bandwidth
    pub fn from_hops(hops: &[HopQos]) -> Self {
        let mut agg = Self {
            bandwidth: None,
            delay: 0,
            jitter: 0,
            loss: 1.0,
            latency: 0,
            sampled_ports: 0,
            missing_ports: 0,
        };
        for hop in hops {
            let Some(s) = &hop.sample else {
                agg.missing_ports += 1;
                continue;
            };
            agg.sampled_ports += 1;
            agg.bandwidth = Some(agg.bandwidth.map_or(s.bandwidth, |b| b.min(s.bandwidth)));
            agg.delay = agg.delay.saturating_add(s.delay);
            agg.jitter = agg.jitter.saturating_add(s.jitter);
            agg.loss *= s.loss;
            agg.latency = agg.latency.saturating_add(s.latency);
        }
        if agg.sampled_ports == 0 {
            agg.loss = 0.0;
        }
        agg
    }
}

/// A route plus the QoS of every port along it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteWithQos {
    /// The route
    #[serde(flatten)]
    pub route: Route,
    /// Per-port samples in travel order
    pub hops: Vec<HopQos>,
}

/// A route plus its whole-path aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteWithAggregate {
    /// The route
    #[serde(flatten)]
    pub route: Route,
    /// Aggregate over the route's ports
    pub aggregate: PathAggregate,
}

/// Hop-count route between one pair in an all-pairs listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRoute {
    /// Source label
    pub from: String,
    /// Destination label
    pub to: String,
    /// Device labels
    pub devices: Vec<String>,
}

/// Request counters
#[derive(Debug, Default)]
pub struct RouteStats {
    requests: AtomicCounter,
    failures: AtomicCounter,
}

/// Point-in-time copy of [`RouteStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStatsSnapshot {
    /// Requests served
    pub requests: u64,
    /// Requests that ended in an error
    pub failures: u64,
}

struct Planned {
    route: Route,
    graph: WeightedGraph,
    from: Resolved,
    to: Resolved,
}

struct Snapshot {
    links: Vec<Link>,
    hosts: BTreeMap<HostId, AttachmentPoint>,
}

/// Answers route queries over the live topology and current samples
pub struct RouteEngine {
    topology: Arc<dyn TopologySource>,
    hosts: Arc<dyn HostDirectory>,
    samples: Arc<dyn SampleSource>,
    missing: MissingSamplePolicy,
    max_k: usize,
    stats: RouteStats,
}

impl RouteEngine {
    /// Create new engine
    pub fn new(
        topology: Arc<dyn TopologySource>,
        hosts: Arc<dyn HostDirectory>,
        samples: Arc<dyn SampleSource>,
    ) -> Self {
        Self {
            topology,
            hosts,
            samples,
            missing: MissingSamplePolicy::default(),
            max_k: DEFAULT_MAX_K,
            stats: RouteStats::default(),
        }
    }

    /// Set the missing-sample fallback
    pub fn with_missing_samples(mut self, missing: MissingSamplePolicy) -> Self {
        self.missing = missing;
        self
    }

    /// Cap k for k-route queries
    pub fn with_max_k(mut self, max_k: usize) -> Self {
        self.max_k = max_k;
        self
    }

    /// Missing-sample fallback in force
    pub fn missing_samples(&self) -> MissingSamplePolicy {
        self.missing
    }

    /// Counters so far
    pub fn stats(&self) -> RouteStatsSnapshot {
        RouteStatsSnapshot {
            requests: self.stats.requests.get(),
            failures: self.stats.failures.get(),
        }
    }

    fn snapshot(&self) -> RouteResult<Snapshot> {
        Ok(Snapshot {
            links: self.topology.links()?,
            hosts: self.hosts.hosts()?,
        })
    }

    fn track<T>(&self, result: RouteResult<T>) -> RouteResult<T> {
        self.stats.requests.inc();
        if let Err(e) = &result {
            self.stats.failures.inc();
            tracing::warn!(error = %e, "route request failed");
        }
        result
    }

    /// Best route under `policy`
    pub fn route(&self, policy: Policy, src: &Endpoint, dst: &Endpoint) -> RouteResult<Route> {
        let result = self.route_inner(policy, src, dst).map(|planned| planned.route);
        self.track(result)
    }

    fn route_inner(
        &self,
        policy: Policy,
        src: &Endpoint,
        dst: &Endpoint,
    ) -> RouteResult<Planned> {
        let snap = self.snapshot()?;
        let (from, to) = resolve_pair(&snap.hosts, src, dst)?;
        let graph = WeightedGraph::for_policy(&snap.links, self.samples.as_ref(), policy, self.missing);
        let combine = |a, b| policy.combine(a, b);

        let path = shortest_path(&graph, from.switch(), to.switch(), &combine, &Exclusions::default())
            .ok_or_else(|| unreachable(src, dst))?;
        let route = build_route(Some(policy), &graph, path, &from, &to);
        Ok(Planned {
            route,
            graph,
            from,
            to,
        })
    }

    /// Up to `k` best routes, cheapest first.
    ///
    /// `k` is clamped to the configured maximum. Fewer routes than asked is
    /// not an error; none at all is `Unreachable`.
    pub fn k_routes(
        &self,
        policy: Policy,
        src: &Endpoint,
        dst: &Endpoint,
        k: usize,
    ) -> RouteResult<Vec<Route>> {
        let result = self.k_routes_inner(policy, src, dst, k);
        self.track(result)
    }

    fn k_routes_inner(
        &self,
        policy: Policy,
        src: &Endpoint,
        dst: &Endpoint,
        k: usize,
    ) -> RouteResult<Vec<Route>> {
        let snap = self.snapshot()?;
        let (from, to) = resolve_pair(&snap.hosts, src, dst)?;
        let k = k.min(self.max_k);
        if k == 0 {
            return Ok(Vec::new());
        }

        let graph = WeightedGraph::for_policy(&snap.links, self.samples.as_ref(), policy, self.missing);
        let combine = |a, b| policy.combine(a, b);
        let paths = k_shortest_paths(&graph, from.switch(), to.switch(), k, &combine);
        if paths.is_empty() {
            return Err(unreachable(src, dst));
        }

        Ok(paths
            .into_iter()
            .map(|p| build_route(Some(policy), &graph, p, &from, &to))
            .collect())
    }

    /// Fewest-hops route, ignoring samples
    pub fn shortest_route(&self, src: &Endpoint, dst: &Endpoint) -> RouteResult<Route> {
        let result = (|| -> RouteResult<Route> {
            let snap = self.snapshot()?;
            let (from, to) = resolve_pair(&snap.hosts, src, dst)?;
            let graph = WeightedGraph::hop_count(&snap.links);
            let path = shortest_path(&graph, from.switch(), to.switch(), &add, &Exclusions::default())
                .ok_or_else(|| unreachable(src, dst))?;
            Ok(build_route(None, &graph, path, &from, &to))
        })();
        self.track(result)
    }

    /// Fewest-hops routes between every ordered pair of distinct hosts, then
    /// every ordered pair of distinct switches. Unreachable pairs are left
    /// out.
    pub fn all_routes(&self) -> RouteResult<Vec<PairRoute>> {
        let result = (|| -> RouteResult<Vec<PairRoute>> {
            let snap = self.snapshot()?;
            let graph = WeightedGraph::hop_count(&snap.links);
            let mut out = Vec::new();

            let hosts: Vec<Resolved> = snap
                .hosts
                .iter()
                .map(|(host, at)| Resolved::Host { host: *host, at: *at })
                .collect();
            let switches: Vec<Resolved> = graph.nodes().map(Resolved::Switch).collect();

            for group in [&hosts, &switches] {
                for from in group.iter() {
                    for to in group.iter().filter(|to| *to != from) {
                        let path = shortest_path(&graph, from.switch(), to.switch(), &add, &Exclusions::default());
                        if let Some(path) = path {
                            out.push(PairRoute {
                                from: from.endpoint().to_string(),
                                to: to.endpoint().to_string(),
                                devices: expand(&graph, &path.switches, from, to),
                            });
                        }
                    }
                }
            }
            Ok(out)
        })();
        self.track(result)
    }

    /// Best route with the current sample of every port on it
    pub fn route_with_qos(
        &self,
        policy: Policy,
        src: &Endpoint,
        dst: &Endpoint,
    ) -> RouteResult<RouteWithQos> {
        let result = self.route_inner(policy, src, dst).map(|planned| RouteWithQos {
            hops: self.hop_qos(&planned),
            route: planned.route,
        });
        self.track(result)
    }

    /// Best route with a whole-path aggregate
    pub fn route_with_aggregate(
        &self,
        policy: Policy,
        src: &Endpoint,
        dst: &Endpoint,
    ) -> RouteResult<RouteWithAggregate> {
        let result = self.route_inner(policy, src, dst).map(|planned| RouteWithAggregate {
            aggregate: PathAggregate::from_hops(&self.hop_qos(&planned)),
            route: planned.route,
        });
        self.track(result)
    }

    fn hop_qos(&self, planned: &Planned) -> Vec<HopQos> {
        let mut keys = Vec::new();
        if let Resolved::Host { at, .. } = planned.from {
            keys.push(at.key());
        }
        keys.extend(hop_keys(&planned.graph, &planned.route.switches));
        if let Resolved::Host { at, .. } = planned.to {
            keys.push(at.key());
        }

        keys.into_iter()
            .map(|device| HopQos {
                device,
                sample: self.samples.sample(&device),
            })
            .collect()
    }
}

fn add(a: f64, b: f64) -> f64 {
    a + b
}

fn unreachable(src: &Endpoint, dst: &Endpoint) -> RouteError {
    RouteError::Unreachable {
        from: src.to_string(),
        to: dst.to_string(),
    }
}

fn resolve_one(
    hosts: &BTreeMap<HostId, AttachmentPoint>,
    endpoint: &Endpoint,
) -> Result<Resolved, String> {
    match endpoint {
        Endpoint::Switch(id) => Ok(Resolved::Switch(*id)),
        Endpoint::Host(host) => hosts
            .get(host)
            .map(|at| Resolved::Host { host: *host, at: *at })
            .ok_or_else(|| format!("{} does not exist", host)),
    }
}

fn resolve_pair(
    hosts: &BTreeMap<HostId, AttachmentPoint>,
    src: &Endpoint,
    dst: &Endpoint,
) -> RouteResult<(Resolved, Resolved)> {
    match (resolve_one(hosts, src), resolve_one(hosts, dst)) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (a, b) => Err(RouteError::UnknownEndpoints(
            [a.err(), b.err()].into_iter().flatten().collect(),
        )),
    }
}

fn build_route(
    policy: Option<Policy>,
    graph: &WeightedGraph,
    path: WeightedPath,
    from: &Resolved,
    to: &Resolved,
) -> Route {
    Route {
        policy,
        devices: expand(graph, &path.switches, from, to),
        switches: path.switches,
        cost: path.cost,
    }
}
