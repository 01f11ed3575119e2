//! Bounded per-device metric history
//!
//! Each device key owns one FIFO per [`Metric`]. Appending past the capacity
//! evicts from the head. Readers only ever see the tail, cut to the display
//! size.

use crate::QosSample;
use dashmap::DashMap;
use parking_lot::RwLock;
use qol_common::units::{visual_bandwidth, visual_time};
use qol_common::{DeviceKey, QolError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default ring capacity
pub const DEFAULT_CAPACITY: usize = 40;

/// Default number of values surfaced to readers
pub const DEFAULT_DISPLAY_SIZE: usize = 10;

/// History errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Capacity / display-size ordering violated; nothing was changed
    #[error("invalid history configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for history configuration
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Tracked series per device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Bits per second
    Bandwidth,
    /// Microseconds
    Delay,
    /// Microseconds
    Jitter,
    /// Percent
    Loss,
    /// Control latency, microseconds
    Latency,
    /// Capture time, ms since epoch
    Time,
    /// Capture time, `yyyy-MM-dd HH:mm:ss`
    VisualTime,
    /// Human-scaled bandwidth
    VisualBandwidth,
    /// Human-scaled delay
    VisualDelay,
    /// Human-scaled jitter
    VisualJitter,
    /// Human-scaled latency
    VisualLatency,
}

impl Metric {
    /// Every metric, in storage order
    pub const ALL: [Metric; 11] = [
        Metric::Bandwidth,
        Metric::Delay,
        Metric::Jitter,
        Metric::Loss,
        Metric::Latency,
        Metric::Time,
        Metric::VisualTime,
        Metric::VisualBandwidth,
        Metric::VisualDelay,
        Metric::VisualJitter,
        Metric::VisualLatency,
    ];

    /// Name used in queries
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Bandwidth => "bandwidth",
            Metric::Delay => "delay",
            Metric::Jitter => "jitter",
            Metric::Loss => "loss",
            Metric::Latency => "latency",
            Metric::Time => "time",
            Metric::VisualTime => "visualtime",
            Metric::VisualBandwidth => "visualbandwidth",
            Metric::VisualDelay => "visualdelay",
            Metric::VisualJitter => "visualjitter",
            Metric::VisualLatency => "visuallatency",
        }
    }

    #[inline(always)]
    fn index(self) -> usize {
        self as usize
    }

    /// This metric's value for one sample
    pub fn value_of(&self, sample: &QosSample) -> HistoryValue {
        match self {
            Metric::Bandwidth => HistoryValue::Int(sample.bandwidth),
            Metric::Delay => HistoryValue::Int(sample.delay),
            Metric::Jitter => HistoryValue::Int(sample.jitter),
            Metric::Loss => HistoryValue::Float(sample.loss),
            Metric::Latency => HistoryValue::Int(sample.latency),
            Metric::Time => HistoryValue::Int(sample.captured_at.as_millis()),
            Metric::VisualTime => HistoryValue::Text(sample.visual_time()),
            Metric::VisualBandwidth => HistoryValue::Text(visual_bandwidth(sample.bandwidth)),
            Metric::VisualDelay => HistoryValue::Text(visual_time(sample.delay)),
            Metric::VisualJitter => HistoryValue::Text(visual_time(sample.jitter)),
            Metric::VisualLatency => HistoryValue::Text(visual_time(sample.latency)),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = QolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| QolError::UnknownMetric(s.to_string()))
    }
}

/// One stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryValue {
    /// Integer reading
    Int(u64),
    /// Loss percentage
    Float(f64),
    /// Rendered text
    Text(String),
}

/// Ring capacity and visible tail length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLimits {
    /// Values kept per series
    pub capacity: usize,
    /// Values surfaced to readers
    pub display_size: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            display_size: DEFAULT_DISPLAY_SIZE,
        }
    }
}

impl HistoryLimits {
    /// Validated limits: `1 <= display_size <= capacity`
    pub fn new(capacity: usize, display_size: usize) -> HistoryResult<Self> {
        if display_size < 1 {
            return Err(HistoryError::InvalidConfiguration(
                "display size must be at least 1".into(),
            ));
        }
        if display_size > capacity {
            return Err(HistoryError::InvalidConfiguration(format!(
                "display size {} exceeds capacity {}",
                display_size, capacity
            )));
        }
        Ok(Self {
            capacity,
            display_size,
        })
    }
}

#[derive(Debug, Default)]
struct DeviceHistory {
    series: [VecDeque<HistoryValue>; Metric::ALL.len()],
}

impl DeviceHistory {
    fn push(&mut self, metric: Metric, value: HistoryValue, capacity: usize) {
        let series = &mut self.series[metric.index()];
        series.push_back(value);
        while series.len() > capacity {
            series.pop_front();
        }
    }
}

/// Concurrent bounded history keyed by device
#[derive(Debug, Default)]
pub struct HistoryStore {
    devices: DashMap<DeviceKey, DeviceHistory>,
    limits: RwLock<HistoryLimits>,
}

impl HistoryStore {
    /// Create new store with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new store with the given limits
    pub fn with_limits(limits: HistoryLimits) -> Self {
        Self {
            devices: DashMap::new(),
            limits: RwLock::new(limits),
        }
    }

    /// Current limits
    pub fn limits(&self) -> HistoryLimits {
        *self.limits.read()
    }

    /// Push one value to the tail of a series, evicting from the head past
    /// capacity
    pub fn append(&self, key: DeviceKey, metric: Metric, value: HistoryValue) {
        let capacity = self.limits.read().capacity;
        self.devices
            .entry(key)
            .or_default()
            .push(metric, value, capacity);
    }

    /// Append every metric of `sample` as one batch.
    ///
    /// The device entry stays locked for the whole batch, so a reader never
    /// sees some metrics of a sample without the others.
    pub fn append_sample(&self, sample: &QosSample) {
        let capacity = self.limits.read().capacity;
        let mut device = self.devices.entry(sample.key()).or_default();
        for metric in Metric::ALL {
            device.push(metric, metric.value_of(sample), capacity);
        }
        tracing::trace!(key = %sample.key(), "history appended");
    }

    /// Up to `n` most recent values, oldest first, never more than the
    /// display size
    pub fn read_tail(&self, key: &DeviceKey, metric: Metric, n: usize) -> Vec<HistoryValue> {
        let display = self.limits.read().display_size;
        let Some(device) = self.devices.get(key) else {
            return Vec::new();
        };
        let series = &device.series[metric.index()];
        let take = n.min(display).min(series.len());
        series.iter().skip(series.len() - take).cloned().collect()
    }

    /// The display-size tail of a series
    pub fn read_display(&self, key: &DeviceKey, metric: Metric) -> Vec<HistoryValue> {
        self.read_tail(key, metric, usize::MAX)
    }

    /// Number of values stored for a series
    pub fn stored_len(&self, key: &DeviceKey, metric: Metric) -> usize {
        self.devices
            .get(key)
            .map(|d| d.series[metric.index()].len())
            .unwrap_or(0)
    }

    /// Drop every series of `key`; returns whether the device was known
    pub fn remove(&self, key: &DeviceKey) -> bool {
        self.devices.remove(key).is_some()
    }

    /// True when the device has any history
    pub fn contains(&self, key: &DeviceKey) -> bool {
        self.devices.contains_key(key)
    }

    /// Change the capacity. Rejects a value below the display size.
    ///
    /// Longer series are cut down on their next append, not here.
    pub fn set_capacity(&self, capacity: usize) -> HistoryResult<()> {
        let mut limits = self.limits.write();
        if capacity < limits.display_size {
            tracing::warn!(capacity, display_size = limits.display_size, "capacity rejected");
            return Err(HistoryError::InvalidConfiguration(format!(
                "capacity {} below display size {}",
                capacity, limits.display_size
            )));
        }
        limits.capacity = capacity;
        tracing::info!(capacity, "history capacity changed");
        Ok(())
    }

    /// Change the display size. Rejects 0 and anything above capacity.
    pub fn set_display_size(&self, display_size: usize) -> HistoryResult<()> {
        let mut limits = self.limits.write();
        match HistoryLimits::new(limits.capacity, display_size) {
            Ok(updated) => {
                *limits = updated;
                tracing::info!(display_size, "history display size changed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(display_size, capacity = limits.capacity, "display size rejected");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use qol_common::{SwitchId, Timestamp};

    fn key() -> DeviceKey {
        DeviceKey::new(SwitchId::new(1), 3)
    }

    fn sample(bandwidth: u64) -> QosSample {
        QosSample {
            switch: SwitchId::new(1),
            port: 3,
            captured_at: Timestamp::from_millis(1_700_000_000_000),
            bandwidth,
            delay: 2000,
            jitter: 200,
            loss: 0.5,
            latency: 100,
        }
    }

    fn ints(values: &[HistoryValue]) -> Vec<u64> {
        values
            .iter()
            .filter_map(|v| match v {
                HistoryValue::Int(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_metric_names() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }
        assert_eq!("VisualBandwidth".parse::<Metric>().unwrap(), Metric::VisualBandwidth);
        assert!("throughput".parse::<Metric>().is_err());
    }

    #[test]
    fn test_fifo_eviction() {
        let store = HistoryStore::with_limits(HistoryLimits::new(5, 5).unwrap());
        for i in 0..8 {
            store.append(key(), Metric::Bandwidth, HistoryValue::Int(i));
        }
        assert_eq!(store.stored_len(&key(), Metric::Bandwidth), 5);
        assert_eq!(
            ints(&store.read_tail(&key(), Metric::Bandwidth, 5)),
            vec![3, 4, 5, 6, 7]
        );
    }

    #[test]
    fn test_read_tail_bounded_by_display_size() {
        let store = HistoryStore::new();
        for i in 0..30 {
            store.append(key(), Metric::Delay, HistoryValue::Int(i));
        }
        assert_eq!(ints(&store.read_tail(&key(), Metric::Delay, 100)), (20..30).collect::<Vec<_>>());
        assert_eq!(ints(&store.read_tail(&key(), Metric::Delay, 3)), vec![27, 28, 29]);
        assert_eq!(store.read_display(&key(), Metric::Delay).len(), 10);
        assert!(store.read_tail(&key(), Metric::Jitter, 5).is_empty());
    }

    #[test]
    fn test_append_sample_batch() {
        let store = HistoryStore::new();
        store.append_sample(&sample(100_000_000));

        for metric in Metric::ALL {
            assert_eq!(store.stored_len(&key(), metric), 1, "{}", metric);
        }
        assert_eq!(
            store.read_display(&key(), Metric::VisualBandwidth),
            vec![HistoryValue::Text("100.000Mbit".into())]
        );
        assert_eq!(
            store.read_display(&key(), Metric::Loss),
            vec![HistoryValue::Float(0.5)]
        );
    }

    #[test]
    fn test_remove_device() {
        let store = HistoryStore::new();
        store.append_sample(&sample(1));
        assert!(store.remove(&key()));
        assert!(!store.contains(&key()));
        for metric in Metric::ALL {
            assert!(store.read_display(&key(), metric).is_empty());
        }
        assert!(!store.remove(&key()));
    }

    #[test]
    fn test_limit_validation() {
        let store = HistoryStore::new();

        assert!(store.set_capacity(9).is_err());
        assert!(store.set_display_size(0).is_err());
        assert!(store.set_display_size(41).is_err());
        assert_eq!(store.limits(), HistoryLimits::default());

        store.set_capacity(10).unwrap();
        store.set_display_size(10).unwrap();
        store.set_display_size(1).unwrap();
        assert_eq!(store.limits(), HistoryLimits { capacity: 10, display_size: 1 });
    }

    #[test]
    fn test_shrink_applies_on_next_append() {
        let store = HistoryStore::new();
        for i in 0..20 {
            store.append(key(), Metric::Bandwidth, HistoryValue::Int(i));
        }
        store.set_capacity(10).unwrap();
        assert_eq!(store.stored_len(&key(), Metric::Bandwidth), 20);

        store.append(key(), Metric::Bandwidth, HistoryValue::Int(20));
        assert_eq!(store.stored_len(&key(), Metric::Bandwidth), 10);
        assert_eq!(
            ints(&store.read_tail(&key(), Metric::Bandwidth, 10)),
            (11..=20).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_history_value_json() {
        let values = vec![
            HistoryValue::Int(5),
            HistoryValue::Float(0.5),
            HistoryValue::Text("2.000ms".into()),
        ];
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"[5,0.5,"2.000ms"]"#);
    }

    proptest! {
        #[test]
        fn test_fifo_bound(capacity in 1usize..64, extra in 0usize..64) {
            let store = HistoryStore::with_limits(HistoryLimits::new(capacity, capacity).unwrap());
            let total = capacity + extra;
            for i in 0..total {
                store.append(key(), Metric::Latency, HistoryValue::Int(i as u64));
            }
            let tail = ints(&store.read_tail(&key(), Metric::Latency, capacity));
            let expected: Vec<u64> = (extra as u64..total as u64).collect();
            prop_assert_eq!(store.stored_len(&key(), Metric::Latency), capacity);
            prop_assert_eq!(tail, expected);
        }

        #[test]
        fn test_display_containment(display in 1usize..20, stored in 0usize..40, k in 0usize..50) {
            let store = HistoryStore::with_limits(HistoryLimits::new(40, display).unwrap());
            for i in 0..stored {
                store.append(key(), Metric::Jitter, HistoryValue::Int(i as u64));
            }
            let tail = ints(&store.read_tail(&key(), Metric::Jitter, k));
            let expect_len = k.min(display).min(stored);
            prop_assert_eq!(tail.len(), expect_len);
            let expected: Vec<u64> = ((stored - expect_len) as u64..stored as u64).collect();
            prop_assert_eq!(tail, expected);
        }
    }
}
