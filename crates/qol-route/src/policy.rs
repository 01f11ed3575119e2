//! Optimization policies and their weight rules

use crate::RouteError;
use qol_telemetry::QosSample;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numerator used to invert bandwidth into a cost
pub const BANDWIDTH_REFERENCE: u64 = 100_000_000;

/// What a route request optimizes for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Widest bottleneck
    Bandwidth,
    /// Least summed delay
    Delay,
    /// Least summed jitter
    Jitter,
    /// Least compounded loss
    Loss,
    /// Least summed control latency
    Latency,
    /// Composite score over all five metrics
    Total,
}

impl Policy {
    /// Every policy
    pub const ALL: [Policy; 6] = [
        Policy::Bandwidth,
        Policy::Delay,
        Policy::Jitter,
        Policy::Loss,
        Policy::Latency,
        Policy::Total,
    ];

    /// Name used in queries
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Bandwidth => "bandwidth",
            Policy::Delay => "delay",
            Policy::Jitter => "jitter",
            Policy::Loss => "loss",
            Policy::Latency => "latency",
            Policy::Total => "total",
        }
    }

    /// Cost contributed by one port
    pub fn port_weight(&self, s: &QosSample) -> f64 {
        match self {
            Policy::Bandwidth => {
                let inverted = BANDWIDTH_REFERENCE
                    .checked_div(s.bandwidth)
                    .unwrap_or(BANDWIDTH_REFERENCE);
                inverted.max(1) as f64
            }
            Policy::Delay => s.delay as f64,
            Policy::Jitter => s.jitter as f64,
            Policy::Loss => s.loss,
            Policy::Latency => s.latency as f64,
            Policy::Total => composite_score(s),
        }
    }

    /// Weight of a link from its two endpoint samples.
    ///
    /// Symmetric in its arguments for every policy.
    pub fn edge_weight(&self, a: &QosSample, b: &QosSample) -> f64 {
        let (wa, wb) = (self.port_weight(a), self.port_weight(b));
        match self {
            Policy::Bandwidth => wa.max(wb),
            Policy::Loss => wa * wb,
            Policy::Delay | Policy::Jitter | Policy::Latency | Policy::Total => wa + wb,
        }
    }

    /// Extend a path cost by one edge.
    ///
    /// Bandwidth paths cost their bottleneck; the rest add up.
    #[inline]
    pub fn combine(&self, path: f64, edge: f64) -> f64 {
        match self {
            Policy::Bandwidth => path.max(edge),
            _ => path + edge,
        }
    }
}

/// `|bw/250 + 20 - delay/5 + 10 - jitter/2.5 + 10 - loss/10 + (latency - 90) * 2|`
fn composite_score(s: &QosSample) -> f64 {
    let bandwidth = s.bandwidth as f64;
    let delay = s.delay as f64;
    let jitter = s.jitter as f64;
    let latency = s.latency as f64;
    (bandwidth / 250.0 + 20.0 - delay / 5.0 + 10.0 - jitter / 2.5 + 10.0 - s.loss / 10.0
        + (latency - 90.0) * 2.0)
        .abs()
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Policy::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RouteError::InvalidRequest(format!("unknown policy: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use qol_common::{SwitchId, Timestamp};

    fn sample(bandwidth: u64, delay: u64, jitter: u64, loss: f64, latency: u64) -> QosSample {
        QosSample {
            switch: SwitchId::new(1),
            port: 1,
            captured_at: Timestamp::from_millis(0),
            bandwidth,
            delay,
            jitter,
            loss,
            latency,
        }
    }

    #[test]
    fn test_bandwidth_port_weight() {
        let p = Policy::Bandwidth;
        assert_eq!(p.port_weight(&sample(10_000_000, 0, 0, 0.0, 0)), 10.0);
        assert_eq!(p.port_weight(&sample(100_000_000, 0, 0, 0.0, 0)), 1.0);
        // floored at 1
        assert_eq!(p.port_weight(&sample(1_000_000_000, 0, 0, 0.0, 0)), 1.0);
        // integer division
        assert_eq!(p.port_weight(&sample(30_000_000, 0, 0, 0.0, 0)), 3.0);
        // no bandwidth is the worst finite cost
        assert_eq!(p.port_weight(&sample(0, 0, 0, 0.0, 0)), 100_000_000.0);
    }

    #[test]
    fn test_edge_rules() {
        let a = sample(10_000_000, 100, 10, 2.0, 50);
        let b = sample(100_000_000, 300, 30, 0.5, 70);

        assert_eq!(Policy::Bandwidth.edge_weight(&a, &b), 10.0);
        assert_eq!(Policy::Delay.edge_weight(&a, &b), 400.0);
        assert_eq!(Policy::Jitter.edge_weight(&a, &b), 40.0);
        assert_eq!(Policy::Loss.edge_weight(&a, &b), 1.0);
        assert_eq!(Policy::Latency.edge_weight(&a, &b), 120.0);
    }

    #[test]
    fn test_composite_score() {
        // 1000/250 + 20 - 50/5 + 10 - 25/2.5 + 10 - 10/10 + (100-90)*2 = 43
        let s = sample(1000, 50, 25, 10.0, 100);
        assert!((Policy::Total.port_weight(&s) - 43.0).abs() < 1e-9);
        // absolute value
        let s = sample(0, 1000, 0, 0.0, 0);
        assert!((Policy::Total.port_weight(&s) - 340.0).abs() < 1e-9);
    }

    #[test]
    fn test_combine() {
        assert_eq!(Policy::Bandwidth.combine(10.0, 3.0), 10.0);
        assert_eq!(Policy::Bandwidth.combine(1.0, 3.0), 3.0);
        assert_eq!(Policy::Delay.combine(10.0, 3.0), 13.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Bandwidth".parse::<Policy>().unwrap(), Policy::Bandwidth);
        assert_eq!("total".parse::<Policy>().unwrap(), Policy::Total);
        assert!("cheapest".parse::<Policy>().is_err());
    }

    proptest! {
        #[test]
        fn test_edge_weight_symmetric(
            bw_a in 0u64..10_000_000_000, bw_b in 0u64..10_000_000_000,
            d_a in 0u64..1_000_000, d_b in 0u64..1_000_000,
            l_a in 0.0f64..100.0, l_b in 0.0f64..100.0,
        ) {
            let a = sample(bw_a, d_a, d_a / 2, l_a, d_b);
            let b = sample(bw_b, d_b, d_b / 2, l_b, d_a);
            for policy in Policy::ALL {
                prop_assert_eq!(policy.edge_weight(&a, &b), policy.edge_weight(&b, &a));
            }
        }
    }
}
