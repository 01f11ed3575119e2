//! Offline network snapshot
//!
//! Links, host attachments and captured frames in one JSON document, so the
//! controller can be driven without a live data plane.

use crate::{ControllerError, ControllerResult, QolController};
use qol_common::{SwitchId, Timestamp};
use qol_route::{AttachmentPoint, HostId, Link, StaticTopology};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One captured LLDPDU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FrameRecord {
    /// Switch the frame was received from
    pub switch: SwitchId,
    /// That switch's known echo delay, ms
    #[serde(default)]
    pub echo_delay_ms: u64,
    /// Receive time, ms since epoch; now when absent
    #[serde(default)]
    pub received_at_ms: Option<u64>,
    /// LLDPDU bytes as hex
    pub hex: String,
}

/// Network state as captured
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Switch-to-switch links
    pub links: Vec<Link>,
    /// Host attachment points
    pub hosts: BTreeMap<HostId, AttachmentPoint>,
    /// Frames in receive order
    pub frames: Vec<FrameRecord>,
}

/// What loading a snapshot did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Frames read
    pub frames: usize,
    /// Frames that produced a sample
    pub accepted: usize,
}

impl Snapshot {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> ControllerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse JSON text
    pub fn from_json_str(content: &str) -> ControllerResult<Self> {
        serde_json::from_str(content).map_err(|e| ControllerError::Snapshot(e.to_string()))
    }

    /// Publish links and hosts, then ingest every frame in order
    pub fn install(
        &self,
        topology: &StaticTopology,
        controller: &QolController,
    ) -> ControllerResult<IngestSummary> {
        topology.set_links(self.links.clone());
        for (host, at) in &self.hosts {
            topology.set_host(*host, *at);
        }

        let mut summary = IngestSummary::default();
        for (idx, record) in self.frames.iter().enumerate() {
            let bytes = hex::decode(record.hex.trim())
                .map_err(|e| ControllerError::Snapshot(format!("frame {}: {}", idx, e)))?;
            let received_at = record
                .received_at_ms
                .map(Timestamp::from_millis)
                .unwrap_or_else(Timestamp::now);

            summary.frames += 1;
            match controller.handle_frame_bytes(&bytes, record.echo_delay_ms, received_at)? {
                Some(sample) => {
                    summary.accepted += 1;
                    if sample.switch != record.switch {
                        tracing::debug!(
                            tagged = %record.switch,
                            chassis = %sample.switch,
                            "frame tagged with a different switch than its chassis id"
                        );
                    }
                }
                None => tracing::debug!(frame = idx, switch = %record.switch, "frame carried no sample"),
            }
        }

        tracing::info!(
            links = self.links.len(),
            hosts = self.hosts.len(),
            frames = summary.frames,
            accepted = summary.accepted,
            "snapshot installed"
        );
        Ok(summary)
    }
}
