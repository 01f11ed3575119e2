//! QoS telemetry ingestion
//!
//! Frames go through the [`TelemetryExtractor`]; accepted samples are written
//! through to the [`CurrentStateStore`] and appended to the [`HistoryStore`].
//! Rejected frames are counted and dropped, never surfaced as errors.

#![warn(missing_docs)]

pub mod current;
pub mod extractor;
pub mod history;
pub mod sample;

pub use current::*;
pub use extractor::*;
pub use history::*;
pub use sample::*;

use qol_common::{DeviceKey, Timestamp};
use qol_tlv::LldpFrame;
use std::sync::Arc;

/// Extractor plus both stores, wired the way frames flow
#[derive(Debug, Clone)]
pub struct TelemetryPipeline {
    extractor: Arc<TelemetryExtractor>,
    current: Arc<CurrentStateStore>,
    history: Arc<HistoryStore>,
}

impl TelemetryPipeline {
    /// Create new pipeline over shared stores
    pub fn new(
        extractor: TelemetryExtractor,
        current: Arc<CurrentStateStore>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            current,
            history,
        }
    }

    /// Ingest one frame received now
    pub fn on_frame(&self, frame: &LldpFrame, echo_delay_ms: u64) -> Option<QosSample> {
        self.on_frame_at(frame, echo_delay_ms, Timestamp::now())
    }

    /// Ingest one frame with an explicit capture time
    pub fn on_frame_at(
        &self,
        frame: &LldpFrame,
        echo_delay_ms: u64,
        now: Timestamp,
    ) -> Option<QosSample> {
        let sample = self.extractor.extract(frame, echo_delay_ms, now).ok()?;
        self.current.upsert(sample.key(), sample);
        self.history.append_sample(&sample);
        Some(sample)
    }

    /// Port deleted or brought down: purge it from both stores
    pub fn port_removed(&self, key: &DeviceKey) -> bool {
        let had_current = self.current.remove(key).is_some();
        let had_history = self.history.remove(key);
        if had_current || had_history {
            tracing::info!(%key, "port removed, telemetry purged");
        }
        had_current || had_history
    }

    /// Current-state store
    pub fn current(&self) -> &Arc<CurrentStateStore> {
        &self.current
    }

    /// History store
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Extractor counters
    pub fn stats(&self) -> ExtractorStatsSnapshot {
        self.extractor.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qol_common::SwitchId;
    use qol_tlv::{insert_qos_tlv, QosBlock};

    fn pipeline() -> TelemetryPipeline {
        TelemetryPipeline::new(
            TelemetryExtractor::default(),
            Arc::new(CurrentStateStore::new()),
            Arc::new(HistoryStore::new()),
        )
    }

    fn frame(block: QosBlock) -> LldpFrame {
        let mut frame = LldpFrame::new([0, 0, 0, 0, 0, 1], 3, 120);
        insert_qos_tlv(&mut frame, &block);
        frame
    }

    #[test]
    fn test_accepted_frame_reaches_both_stores() {
        let p = pipeline();
        let block = QosBlock::new(Some(100_000_000), Some(2000), Some(200), Some(0.5));
        let sample = p.on_frame(&frame(block), 0).unwrap();

        let key = DeviceKey::new(SwitchId::new(1), 3);
        assert_eq!(p.current().get(&key), Some(sample));
        assert_eq!(
            p.history().read_display(&key, Metric::VisualBandwidth),
            vec![HistoryValue::Text("100.000Mbit".into())]
        );
    }

    #[test]
    fn test_unset_never_stored() {
        let p = pipeline();
        let block = QosBlock::new(Some(1), Some(qol_common::UNSET), Some(1), Some(0.0));
        assert!(p.on_frame(&frame(block), 0).is_none());
        assert!(p.current().is_empty());
        assert!(!p.history().contains(&DeviceKey::new(SwitchId::new(1), 3)));
    }

    #[test]
    fn test_port_removed() {
        let p = pipeline();
        let block = QosBlock::new(Some(1), Some(1), Some(1), Some(0.0));
        p.on_frame(&frame(block), 0).unwrap();

        let key = DeviceKey::new(SwitchId::new(1), 3);
        assert!(p.port_removed(&key));
        assert!(p.current().get(&key).is_none());
        assert!(!p.history().contains(&key));
        assert!(!p.port_removed(&key));
    }
}
