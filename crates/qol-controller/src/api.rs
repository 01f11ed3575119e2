//! Query catalogue
//!
//! Every query the controller answers, described once for listing by
//! front ends.

use serde::Serialize;

/// Base path the queries hang off
pub const BASE_PATH: &str = "/wm/qosoverlldp";

/// One path parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiParameter {
    /// Placeholder as written in the path template
    pub name: &'static str,
    /// Accepted values; empty means free-form
    pub options: &'static [&'static str],
}

/// One query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiDescriptor {
    /// Stable number for display ordering
    pub id: u32,
    /// Query name, also the `qolctl` sub-command
    pub name: &'static str,
    /// Path template below [`BASE_PATH`]
    pub path: &'static str,
    /// Path parameters in order
    pub parameters: &'static [ApiParameter],
    /// Response format
    pub format: &'static str,
    /// What the query returns
    pub description: &'static str,
}

const POLICIES: &[&str] = &["bandwidth", "delay", "jitter", "loss", "latency", "total"];
const VIEWS: &[&str] = &["raw", "visual"];
const METRICS: &[&str] = &[
    "bandwidth",
    "delay",
    "jitter",
    "loss",
    "latency",
    "time",
    "visualbandwidth",
    "visualdelay",
    "visualjitter",
    "visuallatency",
    "visualtime",
];

const fn param(name: &'static str) -> ApiParameter {
    ApiParameter { name, options: &[] }
}

const fn choice(name: &'static str, options: &'static [&'static str]) -> ApiParameter {
    ApiParameter { name, options }
}

static APIS: &[ApiDescriptor] = &[
    ApiDescriptor {
        id: 1,
        name: "qos",
        path: "devicecurrentqos/{view}/{device}",
        parameters: &[choice("{view}", VIEWS), param("{device}")],
        format: "json",
        description: "Current QoS of one port, or of every port when the device is `all`.",
    },
    ApiDescriptor {
        id: 2,
        name: "history",
        path: "devicehistoryqos/{device}/{metric}",
        parameters: &[param("{device}"), choice("{metric}", METRICS)],
        format: "json",
        description: "Most recent values of one metric for one port, bounded by the display size.",
    },
    ApiDescriptor {
        id: 3,
        name: "shortest",
        path: "shortestroute/{src}/{dst}",
        parameters: &[param("{src}"), param("{dst}")],
        format: "json",
        description: "Fewest-hops route. Endpoints are `h<n>` hosts or `s<n>` switches.",
    },
    ApiDescriptor {
        id: 4,
        name: "all-routes",
        path: "shortestroute/all",
        parameters: &[],
        format: "json",
        description: "Fewest-hops routes between every pair of hosts, then every pair of switches.",
    },
    ApiDescriptor {
        id: 5,
        name: "route",
        path: "optimalroute/{policy}/{src}/{dst}",
        parameters: &[choice("{policy}", POLICIES), param("{src}"), param("{dst}")],
        format: "json",
        description: "Best route under the chosen QoS policy.",
    },
    ApiDescriptor {
        id: 6,
        name: "route-qos",
        path: "optimalroutewithqos/{policy}/{src}/{dst}",
        parameters: &[choice("{policy}", POLICIES), param("{src}"), param("{dst}")],
        format: "json",
        description: "Best route with the current QoS of every port along it.",
    },
    ApiDescriptor {
        id: 7,
        name: "route-aggregate",
        path: "optimalroutewithaggregatevalue/{policy}/{src}/{dst}",
        parameters: &[choice("{policy}", POLICIES), param("{src}"), param("{dst}")],
        format: "json",
        description: "Best route with QoS aggregated over the whole path.",
    },
    ApiDescriptor {
        id: 8,
        name: "k-routes",
        path: "kshortestpaths/{policy}/{src}/{dst}/{k}",
        parameters: &[
            choice("{policy}", POLICIES),
            param("{src}"),
            param("{dst}"),
            param("{k}"),
        ],
        format: "json",
        description: "Up to k loopless routes under the chosen policy, cheapest first.",
    },
    ApiDescriptor {
        id: 9,
        name: "history-capacity",
        path: "devicehistoryqoslistdbsize/{capacity}",
        parameters: &[param("{capacity}")],
        format: "json",
        description: "Set how many values are kept per port and metric. Must be at least the display size.",
    },
    ApiDescriptor {
        id: 10,
        name: "history-display-size",
        path: "devicehistoryqoslistdisplaysize/{display-size}",
        parameters: &[param("{display-size}")],
        format: "json",
        description: "Set how many history values are returned. At least 1 and at most the capacity.",
    },
    ApiDescriptor {
        id: 11,
        name: "ports",
        path: "switchidportidlistmap",
        parameters: &[],
        format: "json",
        description: "Ports with a current sample, grouped by switch.",
    },
    ApiDescriptor {
        id: 12,
        name: "apis",
        path: "api/all",
        parameters: &[],
        format: "json",
        description: "This list.",
    },
];

/// Every query, in id order
pub fn apis() -> &'static [ApiDescriptor] {
    APIS
}

/// Query by name
pub fn find_api(name: &str) -> Option<&'static ApiDescriptor> {
    APIS.iter().find(|api| api.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qol_route::Policy;
    use qol_telemetry::Metric;
    use std::collections::HashSet;

    #[test]
    fn test_ids_and_names_unique() {
        let ids: HashSet<u32> = apis().iter().map(|a| a.id).collect();
        let names: HashSet<&str> = apis().iter().map(|a| a.name).collect();
        assert_eq!(ids.len(), apis().len());
        assert_eq!(names.len(), apis().len());
        assert!(apis().windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_options_parse() {
        for p in POLICIES {
            assert!(p.parse::<Policy>().is_ok(), "{}", p);
        }
        for m in METRICS {
            assert!(m.parse::<Metric>().is_ok(), "{}", m);
        }
        assert_eq!(POLICIES.len(), Policy::ALL.len());
        assert_eq!(METRICS.len(), Metric::ALL.len());
    }

    #[test]
    fn test_placeholders_in_template() {
        for api in apis() {
            for p in api.parameters {
                assert!(api.path.contains(p.name), "{} missing {}", api.name, p.name);
            }
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(find_api("k-routes").map(|a| a.id), Some(8));
        assert!(find_api("staticentrypusher").is_none());
    }
}
