//! Engine configuration.
//!
//! All fields have defaults matching the reference behaviour, so a host can
//! load a partial JSON document and get the rest filled in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::START_POSITION;
use crate::error::{GeoproxResult, ValidationError};
use crate::geo::Coordinate;
use crate::position::SimulationPath;

/// Simulation playback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Delay between waypoints, in milliseconds.
    pub step_interval_ms: u64,
    /// Waypoints played back in order.
    pub path: SimulationPath,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: 2000,
            path: SimulationPath::reference(),
        }
    }
}

impl SimulationConfig {
    /// Step interval as a `Duration`, at least one millisecond.
    #[must_use]
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms.max(1))
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Max queued commands before callers see `QueueFull`.
    pub command_queue_capacity: usize,
    /// Per-subscriber snapshot buffer capacity.
    pub snapshot_stream_capacity: usize,
    /// Tracked position before the first sample arrives.
    pub start_position: Coordinate,
    pub simulation: SimulationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_queue_capacity: 1024,
            snapshot_stream_capacity: 64,
            start_position: START_POSITION,
            simulation: SimulationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed JSON or invalid values.
    pub fn from_json_str(json: &str) -> GeoproxResult<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        cfg.start_position.validate()?;
        Ok(cfg)
    }
}
