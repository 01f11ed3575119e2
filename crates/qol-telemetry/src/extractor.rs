//! LLDP frame to QoS sample

use crate::QosSample;
use qol_common::{AtomicCounter, SwitchId, Timestamp, UNSET};
use qol_tlv::{be_to_u64, LatencyEcho, LldpFrame, QosBlock};
use serde::{Deserialize, Serialize};

/// How the loss field is validated before acceptance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossCheck {
    /// Loss must be finite and within [0, 100]
    #[default]
    Range,
    /// Any loss value passes
    None,
}

/// Why a frame produced no sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Chassis or port id too short to carry an identity
    BadIdentity,
    /// No TLV matched the QoS block
    NoQosBlock,
    /// Bandwidth, delay or jitter still holds the sentinel
    Unset,
    /// Loss outside [0, 100] or not a number
    LossOutOfRange,
}

impl Rejection {
    /// Short label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::BadIdentity => "bad_identity",
            Rejection::NoQosBlock => "no_qos_block",
            Rejection::Unset => "unset",
            Rejection::LossOutOfRange => "loss_out_of_range",
        }
    }
}

/// Ingestion counters
#[derive(Debug, Default)]
pub struct ExtractorStats {
    frames: AtomicCounter,
    accepted: AtomicCounter,
    bad_identity: AtomicCounter,
    no_qos_block: AtomicCounter,
    unset: AtomicCounter,
    loss_out_of_range: AtomicCounter,
}

/// Point-in-time copy of [`ExtractorStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorStatsSnapshot {
    /// Frames offered
    pub frames: u64,
    /// Samples accepted
    pub accepted: u64,
    /// Frames with an unusable chassis / port id
    pub bad_identity: u64,
    /// Frames without a QoS block
    pub no_qos_block: u64,
    /// Samples dropped by the sentinel rule
    pub unset: u64,
    /// Samples dropped by the loss rule
    pub loss_out_of_range: u64,
}

impl ExtractorStats {
    fn record(&self, outcome: Result<(), Rejection>) {
        self.frames.inc();
        match outcome {
            Ok(()) => self.accepted.inc(),
            Err(Rejection::BadIdentity) => self.bad_identity.inc(),
            Err(Rejection::NoQosBlock) => self.no_qos_block.inc(),
            Err(Rejection::Unset) => self.unset.inc(),
            Err(Rejection::LossOutOfRange) => self.loss_out_of_range.inc(),
        };
    }

    /// Snapshot the counters
    pub fn snapshot(&self) -> ExtractorStatsSnapshot {
        ExtractorStatsSnapshot {
            frames: self.frames.get(),
            accepted: self.accepted.get(),
            bad_identity: self.bad_identity.get(),
            no_qos_block: self.no_qos_block.get(),
            unset: self.unset.get(),
            loss_out_of_range: self.loss_out_of_range.get(),
        }
    }
}

/// Sender switch id from the chassis id value.
///
/// The first byte is the chassis subtype; the rest is the 6-byte MAC, which
/// becomes the low 48 bits of the datapath id (two leading zero octets).
pub fn switch_id_from_chassis(value: &[u8]) -> Option<SwitchId> {
    if value.len() < 2 {
        return None;
    }
    SwitchId::from_octets(&value[1..]).ok()
}

/// Sender port from the port id value: bytes 1 and 2, big-endian.
pub fn port_from_port_id(value: &[u8]) -> Option<u16> {
    if value.len() < 3 {
        return None;
    }
    Some(be_to_u64(&value[1..3]) as u16)
}

/// Turns received LLDP frames into validated samples
#[derive(Debug, Default)]
pub struct TelemetryExtractor {
    loss_check: LossCheck,
    stats: ExtractorStats,
}

impl TelemetryExtractor {
    /// Create new extractor
    pub fn new(loss_check: LossCheck) -> Self {
        Self {
            loss_check,
            stats: ExtractorStats::default(),
        }
    }

    /// Loss validation in force
    pub fn loss_check(&self) -> LossCheck {
        self.loss_check
    }

    /// Counters so far
    pub fn stats(&self) -> ExtractorStatsSnapshot {
        self.stats.snapshot()
    }

    /// Decode and validate one frame.
    ///
    /// `echo_delay_ms` is the receiving switch's known echo delay; `now` is
    /// the capture time and the reference for control latency. A frame
    /// without a latency echo yields latency 0.
    pub fn extract(
        &self,
        frame: &LldpFrame,
        echo_delay_ms: u64,
        now: Timestamp,
    ) -> Result<QosSample, Rejection> {
        let outcome = self.decode(frame, echo_delay_ms, now);
        self.stats.record(outcome.as_ref().map(|_| ()).map_err(|r| *r));

        if let Err(reason) = &outcome {
            tracing::debug!(reason = reason.as_str(), "frame dropped");
        }
        outcome
    }

    fn decode(
        &self,
        frame: &LldpFrame,
        echo_delay_ms: u64,
        now: Timestamp,
    ) -> Result<QosSample, Rejection> {
        let switch = switch_id_from_chassis(&frame.chassis_id.value).ok_or(Rejection::BadIdentity)?;
        let port = port_from_port_id(&frame.port_id.value).ok_or(Rejection::BadIdentity)?;

        let block = QosBlock::find_in(frame).ok_or(Rejection::NoQosBlock)?;
        if block.bandwidth >= UNSET || block.delay >= UNSET || block.jitter >= UNSET {
            return Err(Rejection::Unset);
        }
        if self.loss_check == LossCheck::Range
            && !(block.loss.is_finite() && (0.0..=100.0).contains(&block.loss))
        {
            return Err(Rejection::LossOutOfRange);
        }

        let latency = LatencyEcho::find_in(frame)
            .map(|echo| echo.control_latency_us(now, echo_delay_ms))
            .unwrap_or(0);

        Ok(QosSample {
            switch,
            port,
            captured_at: now,
            bandwidth: block.bandwidth,
            delay: block.delay,
            jitter: block.jitter,
            loss: block.loss,
            latency,
        })
    }
}
