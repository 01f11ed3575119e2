//! Latest sample per device key

use crate::QosSample;
use dashmap::DashMap;
use qol_common::{DeviceKey, SwitchId};
use std::collections::BTreeMap;

/// Concurrent map from device key to its most recent sample.
///
/// Writes replace the whole entry under the shard lock, so readers see
/// either the previous sample or the new one, never a mix. Per key the
/// last write to arrive wins, regardless of capture time.
#[derive(Debug, Default)]
pub struct CurrentStateStore {
    samples: DashMap<DeviceKey, QosSample>,
}

impl CurrentStateStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `key`, returning the previous one
    pub fn upsert(&self, key: DeviceKey, sample: QosSample) -> Option<QosSample> {
        self.samples.insert(key, sample)
    }

    /// Latest sample for `key`
    #[inline]
    pub fn get(&self, key: &DeviceKey) -> Option<QosSample> {
        self.samples.get(key).map(|s| *s)
    }

    /// Drop the entry for `key`
    pub fn remove(&self, key: &DeviceKey) -> Option<QosSample> {
        self.samples.remove(key).map(|(_, s)| s)
    }

    /// Point-in-time copy of every entry, ordered by key
    pub fn all_entries(&self) -> BTreeMap<DeviceKey, QosSample> {
        self.samples
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// Ports with a current sample, grouped by switch
    pub fn ports_by_switch(&self) -> BTreeMap<SwitchId, Vec<u16>> {
        let mut out: BTreeMap<SwitchId, Vec<u16>> = BTreeMap::new();
        for key in self.samples.iter().map(|e| *e.key()) {
            out.entry(key.switch).or_default().push(key.port);
        }
        for ports in out.values_mut() {
            ports.sort_unstable();
        }
        out
    }

    /// Number of device keys
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
