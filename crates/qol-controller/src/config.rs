//! Controller Configuration

use crate::{ControllerError, ControllerResult};
use qol_route::{MissingSamplePolicy, DEFAULT_MAX_K};
use qol_telemetry::{HistoryLimits, LossCheck, DEFAULT_CAPACITY, DEFAULT_DISPLAY_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// History store sizing
    pub history: HistoryConfig,
    /// Route engine settings
    pub routing: RoutingConfig,
    /// Ingestion settings
    pub telemetry: TelemetryConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            history: HistoryConfig::default(),
            routing: RoutingConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// History store sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Values kept per device and metric
    pub capacity: usize,
    /// Values returned by history reads
    pub display_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            display_size: DEFAULT_DISPLAY_SIZE,
        }
    }
}

/// Route engine settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Links whose ports lack a sample
    pub missing_sample: MissingSamplePolicy,
    /// Largest k honoured by k-route queries
    pub max_k: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            missing_sample: MissingSamplePolicy::default(),
            max_k: DEFAULT_MAX_K,
        }
    }
}

/// Ingestion settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Loss acceptance rule
    pub loss_check: LossCheck,
}

impl ControllerConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> ControllerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> ControllerResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ControllerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> ControllerResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ControllerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check history sizing and the missing-sample weight
    pub fn validate(&self) -> ControllerResult<()> {
        self.history_limits()?;
        if let MissingSamplePolicy::DefaultWeight(w) = self.routing.missing_sample {
            if !w.is_finite() || w < 0.0 {
                return Err(ControllerError::Config(format!(
                    "default weight must be finite and non-negative, got {}",
                    w
                )));
            }
        }
        Ok(())
    }

    /// History limits as the store takes them
    pub fn history_limits(&self) -> ControllerResult<HistoryLimits> {
        HistoryLimits::new(self.history.capacity, self.history.display_size)
            .map_err(|e| ControllerError::Config(e.to_string()))
    }
}
