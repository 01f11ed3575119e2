//! End-to-end behaviour across codec, stores and routing

use crate::{ControllerConfig, QolController, QosView};
use proptest::prelude::*;
use qol_common::{DeviceKey, SwitchId, Timestamp, UNSET};
use qol_route::{AttachmentPoint, Endpoint, HostId, Link, Policy, StaticTopology};
use qol_telemetry::{HistoryValue, Metric};
use qol_tlv::{fill_qos_block, QosBlock};
use std::sync::Arc;

fn sw(n: u64) -> SwitchId {
    SwitchId::new(n)
}

fn setup() -> (QolController, Arc<StaticTopology>) {
    let topo = Arc::new(StaticTopology::new());
    let controller = QolController::new(ControllerConfig::default(), topo.clone(), topo.clone()).unwrap();
    (controller, topo)
}

/// Send a probe out of `switch`/`port`, let the switch fill it, receive it
fn exchange(c: &QolController, switch: u64, port: u16, block: QosBlock) -> bool {
    let mut bytes = c.probe_frame(sw(switch), port).unwrap().to_vec();
    assert!(fill_qos_block(&mut bytes, &block).unwrap());
    c.handle_frame_bytes(&bytes, 0, Timestamp::now()).unwrap().is_some()
}

fn metrics(bandwidth: u64, delay: u64) -> QosBlock {
    QosBlock::new(Some(bandwidth), Some(delay), Some(100), Some(0.1))
}

#[test]
fn test_scenario_ingest_and_render() {
    let (c, _) = setup();
    let block = QosBlock::new(Some(100_000_000), Some(2000), Some(200), Some(0.5));
    assert!(exchange(&c, 1, 3, block));

    let key: DeviceKey = "s1-eth3".parse().unwrap();
    let sample = c.sample(&key).unwrap();
    assert_eq!(sample.bandwidth, 100_000_000);
    assert_eq!(sample.delay, 2000);
    assert_eq!(sample.jitter, 200);
    assert_eq!(sample.loss, 0.5);

    let visual = c.current_qos(QosView::Visual, Some(&key)).unwrap();
    assert_eq!(visual["s1-eth3"].bandwidth, "100.000Mbit");
    assert_eq!(
        c.history(&key, Metric::VisualBandwidth),
        vec![HistoryValue::Text("100.000Mbit".into())]
    );
}

#[test]
fn test_scenario_port_removal() {
    let (c, _) = setup();
    assert!(exchange(&c, 1, 3, metrics(1_000_000, 10)));
    assert!(exchange(&c, 1, 4, metrics(1_000_000, 10)));

    let key: DeviceKey = "s1-eth3".parse().unwrap();
    assert!(c.port_removed(&key));
    assert!(c.sample(&key).is_none());
    for metric in Metric::ALL {
        assert!(c.history(&key, metric).is_empty());
    }
    // neighbour untouched
    assert!(c.sample(&"s1-eth4".parse().unwrap()).is_some());
}

#[test]
fn test_scenario_linear_bandwidth_route() {
    let (c, topo) = setup();
    topo.set_links(vec![Link::new(sw(1), 2, sw(2), 1), Link::new(sw(2), 2, sw(3), 1)]);
    topo.set_host(HostId(1), AttachmentPoint { switch: sw(1), port: 1 });
    topo.set_host(HostId(3), AttachmentPoint { switch: sw(3), port: 2 });
    for (s, bw) in [(1, 10_000_000), (2, 100_000_000), (3, 1_000_000_000)] {
        for port in 1..=2 {
            assert!(exchange(&c, s, port, metrics(bw, 1000)));
        }
    }

    let route = c
        .route(Policy::Bandwidth, &Endpoint::Host(HostId(1)), &Endpoint::Host(HostId(3)))
        .unwrap();
    assert_eq!(
        route.devices,
        vec!["h1", "s1-eth1", "s1-eth2", "s2-eth1", "s2-eth2", "s3-eth1", "s3-eth2", "h3"]
    );

    let agg = c
        .route_with_aggregate(Policy::Bandwidth, &Endpoint::Host(HostId(1)), &Endpoint::Host(HostId(3)))
        .unwrap()
        .aggregate;
    assert_eq!(agg.bandwidth, Some(10_000_000));
    assert_eq!(agg.sampled_ports, 6);
}

#[test]
fn test_scenario_bandwidth_prefers_wide_detour() {
    let (c, topo) = setup();
    // direct 1-3 is narrow, 1-2-3 is wide
    topo.set_links(vec![
        Link::new(sw(1), 3, sw(3), 3),
        Link::new(sw(1), 2, sw(2), 1),
        Link::new(sw(2), 2, sw(3), 1),
    ]);
    topo.set_host(HostId(1), AttachmentPoint { switch: sw(1), port: 1 });
    topo.set_host(HostId(3), AttachmentPoint { switch: sw(3), port: 2 });
    for (s, p, bw) in [
        (1, 3, 10_000_000),
        (3, 3, 10_000_000),
        (1, 2, 1_000_000_000),
        (2, 1, 1_000_000_000),
        (2, 2, 1_000_000_000),
        (3, 1, 1_000_000_000),
    ] {
        assert!(exchange(&c, s, p, metrics(bw, 10)));
    }

    let (h1, h3) = (Endpoint::Host(HostId(1)), Endpoint::Host(HostId(3)));
    let route = c.route(Policy::Bandwidth, &h1, &h3).unwrap();
    assert_eq!(route.switches, vec![sw(1), sw(2), sw(3)]);
    // delay sums favour the single hop
    let route = c.route(Policy::Delay, &h1, &h3).unwrap();
    assert_eq!(route.switches, vec![sw(1), sw(3)]);
}

#[test]
fn test_scenario_k_routes_shortfall() {
    let (c, topo) = setup();
    topo.set_links(vec![
        Link::new(sw(1), 2, sw(2), 1),
        Link::new(sw(1), 3, sw(3), 1),
        Link::new(sw(2), 2, sw(4), 1),
        Link::new(sw(3), 2, sw(4), 2),
    ]);
    topo.set_host(HostId(1), AttachmentPoint { switch: sw(1), port: 1 });
    topo.set_host(HostId(4), AttachmentPoint { switch: sw(4), port: 3 });
    for (s, p) in [(1, 2), (1, 3), (2, 1), (2, 2), (3, 1), (3, 2), (4, 1), (4, 2)] {
        assert!(exchange(&c, s, p, metrics(100_000_000, 100 * s)));
    }

    let routes = c
        .k_routes(Policy::Delay, &Endpoint::Host(HostId(1)), &Endpoint::Host(HostId(4)), 3)
        .unwrap();
    assert_eq!(routes.len(), 2);
    assert!(routes[0].cost <= routes[1].cost);
    for route in &routes {
        assert_eq!(route.devices.first().map(String::as_str), Some("h1"));
        assert_eq!(route.devices.last().map(String::as_str), Some("h4"));
    }
}

#[test]
fn test_sentinel_never_stored() {
    let (c, _) = setup();
    for block in [
        QosBlock::new(Some(UNSET), Some(1), Some(1), Some(0.0)),
        QosBlock::new(Some(1), Some(UNSET), Some(1), Some(0.0)),
        QosBlock::new(Some(1), Some(1), Some(UNSET), Some(0.0)),
    ] {
        assert!(!exchange(&c, 1, 1, block));
    }
    assert_eq!(c.stats().devices, 0);
    assert!(c.history(&"s1-eth1".parse().unwrap(), Metric::Bandwidth).is_empty());
}

#[test]
fn test_concurrent_ingest_and_routing() {
    let (c, topo) = setup();
    topo.set_links(vec![Link::new(sw(1), 1, sw(2), 1)]);
    std::thread::scope(|s| {
        for t in 0..4u64 {
            let c = &c;
            s.spawn(move || {
                for i in 0..50u64 {
                    exchange(c, 1 + t % 2, 1, metrics(1_000_000 + i, 10 + t));
                    let _ = c.route(Policy::Total, &Endpoint::Switch(sw(1)), &Endpoint::Switch(sw(2)));
                }
            });
        }
    });

    assert_eq!(c.stats().devices, 2);
    assert_eq!(c.stats().telemetry.accepted, 200);
    let tail = c.history(&"s1-eth1".parse().unwrap(), Metric::Bandwidth);
    assert_eq!(tail.len(), 10);
}

proptest! {
    #[test]
    fn test_last_write_wins(values in proptest::collection::vec(1u64..UNSET, 1..20)) {
        let (c, _) = setup();
        for v in &values {
            prop_assert!(exchange(&c, 7, 2, metrics(*v, 1)));
        }
        let sample = c.sample(&DeviceKey::new(sw(7), 2)).unwrap();
        prop_assert_eq!(sample.bandwidth, *values.last().unwrap());
    }
}
