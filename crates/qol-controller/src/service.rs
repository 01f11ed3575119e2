//! Controller facade
//!
//! Owns the telemetry pipeline and the route engine and answers every
//! query the front ends expose.

use crate::{ControllerConfig, ControllerError, ControllerResult};
use bytes::Bytes;
use qol_common::{DeviceKey, SwitchId, Timestamp};
use qol_route::{
    Endpoint, HostDirectory, PairRoute, Policy, Route, RouteEngine, RouteStatsSnapshot,
    RouteWithAggregate, RouteWithQos, TopologySource,
};
use qol_telemetry::{
    CurrentStateStore, ExtractorStatsSnapshot, HistoryStore, HistoryValue, Metric, QosSample,
    SampleView, TelemetryExtractor, TelemetryPipeline,
};
use qol_tlv::{insert_qos_tlv, LatencyEcho, LldpFrame, QosBlock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// TTL carried by emitted discovery frames, seconds
pub const PROBE_TTL_SECS: u16 = 120;

/// Which rendering of a sample to return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QosView {
    /// Exact values with unit suffix
    #[default]
    Raw,
    /// Human-scaled values
    Visual,
}

impl QosView {
    fn render(&self, sample: &QosSample) -> SampleView {
        match self {
            QosView::Raw => sample.raw_view(),
            QosView::Visual => sample.visual_view(),
        }
    }
}

impl fmt::Display for QosView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QosView::Raw => f.write_str("raw"),
            QosView::Visual => f.write_str("visual"),
        }
    }
}

impl FromStr for QosView {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(QosView::Raw),
            "visual" => Ok(QosView::Visual),
            other => Err(ControllerError::Config(format!("unknown view: {}", other))),
        }
    }
}

/// Counters across the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStats {
    /// Ingestion counters
    pub telemetry: ExtractorStatsSnapshot,
    /// Route request counters
    pub routing: RouteStatsSnapshot,
    /// Ports with a current sample
    pub devices: usize,
}

/// QoS-over-LLDP controller
pub struct QolController {
    config: ControllerConfig,
    pipeline: TelemetryPipeline,
    engine: RouteEngine,
}

impl QolController {
    /// Create new controller over external topology and host sources
    pub fn new(
        config: ControllerConfig,
        topology: Arc<dyn TopologySource>,
        hosts: Arc<dyn HostDirectory>,
    ) -> ControllerResult<Self> {
        config.validate()?;

        let current = Arc::new(CurrentStateStore::new());
        let history = Arc::new(HistoryStore::with_limits(config.history_limits()?));
        let pipeline = TelemetryPipeline::new(
            TelemetryExtractor::new(config.telemetry.loss_check),
            current.clone(),
            history,
        );
        let engine = RouteEngine::new(topology, hosts, current)
            .with_missing_samples(config.routing.missing_sample)
            .with_max_k(config.routing.max_k);

        tracing::info!(
            capacity = config.history.capacity,
            display_size = config.history.display_size,
            max_k = config.routing.max_k,
            "controller ready"
        );

        Ok(Self {
            config,
            pipeline,
            engine,
        })
    }

    /// Configuration the controller was built with
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ==================== Ingestion ====================

    /// Ingest a parsed frame received now
    pub fn handle_frame(&self, frame: &LldpFrame, echo_delay_ms: u64) -> Option<QosSample> {
        self.pipeline.on_frame(frame, echo_delay_ms)
    }

    /// Ingest a parsed frame with an explicit receive time
    pub fn handle_frame_at(
        &self,
        frame: &LldpFrame,
        echo_delay_ms: u64,
        received_at: Timestamp,
    ) -> Option<QosSample> {
        self.pipeline.on_frame_at(frame, echo_delay_ms, received_at)
    }

    /// Parse and ingest raw LLDPDU bytes.
    ///
    /// Bytes that are not an LLDPDU are an error; a well-formed frame that
    /// carries no acceptable QoS block is `Ok(None)`.
    pub fn handle_frame_bytes(
        &self,
        data: &[u8],
        echo_delay_ms: u64,
        received_at: Timestamp,
    ) -> ControllerResult<Option<QosSample>> {
        let frame = LldpFrame::parse(data)?;
        Ok(self.handle_frame_at(&frame, echo_delay_ms, received_at))
    }

    /// Port deleted or brought down
    pub fn port_removed(&self, key: &DeviceKey) -> bool {
        self.pipeline.port_removed(key)
    }

    /// Discovery frame for `switch` port `port`: placeholder QoS block for
    /// the switch to fill, then a latency echo stamped now.
    ///
    /// The chassis id is the low 6 bytes of the switch id, so ids using the
    /// top 16 bits are refused.
    pub fn probe_frame(&self, switch: SwitchId, port: u16) -> ControllerResult<Bytes> {
        if switch.value() >> 48 != 0 {
            return Err(ControllerError::ChassisOverflow(switch));
        }
        let raw = switch.value().to_be_bytes();
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&raw[2..]);

        let mut frame = LldpFrame::new(mac, port, PROBE_TTL_SECS);
        frame.push_optional(LatencyEcho::now().to_tlv());
        insert_qos_tlv(&mut frame, &QosBlock::default());
        Ok(frame.encode()?)
    }

    // ==================== Telemetry queries ====================

    /// Latest sample for one port
    pub fn sample(&self, key: &DeviceKey) -> Option<QosSample> {
        self.pipeline.current().get(key)
    }

    /// Rendered samples keyed by device key; every port when `device` is
    /// `None`
    pub fn current_qos(
        &self,
        view: QosView,
        device: Option<&DeviceKey>,
    ) -> ControllerResult<BTreeMap<String, SampleView>> {
        match device {
            Some(key) => {
                let sample = self
                    .sample(key)
                    .ok_or_else(|| ControllerError::UnknownDevice(key.to_string()))?;
                Ok(BTreeMap::from([(key.to_string(), view.render(&sample))]))
            }
            None => Ok(self
                .pipeline
                .current()
                .all_entries()
                .iter()
                .map(|(key, sample)| (key.to_string(), view.render(sample)))
                .collect()),
        }
    }

    /// Most recent values of one metric, bounded by the display size
    pub fn history(&self, key: &DeviceKey, metric: Metric) -> Vec<HistoryValue> {
        self.pipeline.history().read_display(key, metric)
    }

    /// Change history capacity
    pub fn set_history_capacity(&self, capacity: usize) -> ControllerResult<()> {
        Ok(self.pipeline.history().set_capacity(capacity)?)
    }

    /// Change history display size
    pub fn set_history_display_size(&self, display_size: usize) -> ControllerResult<()> {
        Ok(self.pipeline.history().set_display_size(display_size)?)
    }

    /// Ports with a current sample, per switch
    pub fn ports_by_switch(&self) -> BTreeMap<SwitchId, Vec<u16>> {
        self.pipeline.current().ports_by_switch()
    }

    // ==================== Route queries ====================

    /// Best route under `policy`
    pub fn route(&self, policy: Policy, src: &Endpoint, dst: &Endpoint) -> ControllerResult<Route> {
        Ok(self.engine.route(policy, src, dst)?)
    }

    /// Best route with per-port QoS
    pub fn route_with_qos(
        &self,
        policy: Policy,
        src: &Endpoint,
        dst: &Endpoint,
    ) -> ControllerResult<RouteWithQos> {
        Ok(self.engine.route_with_qos(policy, src, dst)?)
    }

    /// Best route with whole-path aggregate
    pub fn route_with_aggregate(
        &self,
        policy: Policy,
        src: &Endpoint,
        dst: &Endpoint,
    ) -> ControllerResult<RouteWithAggregate> {
        Ok(self.engine.route_with_aggregate(policy, src, dst)?)
    }

    /// Up to `k` routes, cheapest first
    pub fn k_routes(
        &self,
        policy: Policy,
        src: &Endpoint,
        dst: &Endpoint,
        k: usize,
    ) -> ControllerResult<Vec<Route>> {
        Ok(self.engine.k_routes(policy, src, dst, k)?)
    }

    /// Fewest-hops route
    pub fn shortest_route(&self, src: &Endpoint, dst: &Endpoint) -> ControllerResult<Route> {
        Ok(self.engine.shortest_route(src, dst)?)
    }

    /// Fewest-hops routes between every host pair then every switch pair
    pub fn all_routes(&self) -> ControllerResult<Vec<PairRoute>> {
        Ok(self.engine.all_routes()?)
    }

    /// Counters so far
    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            telemetry: self.pipeline.stats(),
            routing: self.engine.stats(),
            devices: self.pipeline.current().len(),
        }
    }
}
