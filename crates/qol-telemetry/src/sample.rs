//! QoS samples and their textual views

use qol_common::units::{visual_bandwidth, visual_time};
use qol_common::{DeviceKey, SwitchId, Timestamp};
use serde::{Deserialize, Serialize};

/// One accepted reading for one switch port
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QosSample {
    /// Switch the port belongs to
    pub switch: SwitchId,
    /// Port number
    pub port: u16,
    /// Capture time
    pub captured_at: Timestamp,
    /// Bits per second
    pub bandwidth: u64,
    /// Microseconds
    pub delay: u64,
    /// Microseconds
    pub jitter: u64,
    /// Percent, 0 to 100
    pub loss: f64,
    /// Round-trip control latency, microseconds
    pub latency: u64,
}

/// String rendering of a sample, keyed the way callers display it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleView {
    /// Colon-hex switch id
    pub switchid: String,
    /// Port number
    pub portid: String,
    /// Capture time
    pub time: String,
    /// Bandwidth with unit
    pub bandwidth: String,
    /// Delay with unit
    pub delay: String,
    /// Jitter with unit
    pub jitter: String,
    /// Loss percentage
    pub loss: String,
    /// Control latency with unit
    pub latency: String,
}

impl QosSample {
    /// Device key of the sampled port
    #[inline]
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.switch, self.port)
    }

    /// Capture time as `yyyy-MM-dd HH:mm:ss`
    pub fn visual_time(&self) -> String {
        self.captured_at.to_visual()
    }

    /// Raw values with unit suffixes (`100000000bit`, `2000us`, `0.5%`)
    pub fn raw_view(&self) -> SampleView {
        SampleView {
            switchid: self.switch.to_string(),
            portid: self.port.to_string(),
            time: self.captured_at.as_millis().to_string(),
            bandwidth: format!("{}bit", self.bandwidth),
            delay: format!("{}us", self.delay),
            jitter: format!("{}us", self.jitter),
            loss: format!("{}%", self.loss),
            latency: format!("{}us", self.latency),
        }
    }

    /// Human-scaled values (`100.000Mbit`, `2.000ms`)
    pub fn visual_view(&self) -> SampleView {
        SampleView {
            switchid: self.switch.to_string(),
            portid: self.port.to_string(),
            time: self.visual_time(),
            bandwidth: visual_bandwidth(self.bandwidth),
            delay: visual_time(self.delay),
            jitter: visual_time(self.jitter),
            loss: format!("{}%", self.loss),
            latency: visual_time(self.latency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QosSample {
        QosSample {
            switch: SwitchId::new(1),
            port: 3,
            captured_at: Timestamp::from_millis(1_700_000_000_000),
            bandwidth: 100_000_000,
            delay: 2000,
            jitter: 200,
            loss: 0.5,
            latency: 1500,
        }
    }

    #[test]
    fn test_key() {
        assert_eq!(sample().key().to_string(), "s1-eth3");
    }

    #[test]
    fn test_raw_view() {
        let view = sample().raw_view();
        assert_eq!(view.switchid, "00:00:00:00:00:00:00:01");
        assert_eq!(view.portid, "3");
        assert_eq!(view.bandwidth, "100000000bit");
        assert_eq!(view.delay, "2000us");
        assert_eq!(view.jitter, "200us");
        assert_eq!(view.loss, "0.5%");
        assert_eq!(view.latency, "1500us");
    }

    #[test]
    fn test_visual_view() {
        let view = sample().visual_view();
        assert_eq!(view.bandwidth, "100.000Mbit");
        assert_eq!(view.delay, "2.000ms");
        assert_eq!(view.jitter, "200.000us");
        assert_eq!(view.latency, "1.500ms");
        assert_eq!(view.time.len(), 19);
    }
}
