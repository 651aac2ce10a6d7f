//! # geoprox - Geofence Proximity Engine
//!
//! geoprox decides when a tracked position has entered one of a set of
//! user-defined circular geofences ("triggers"), and turns those entries into
//! proximity alerts that a notification layer can render.
//!
//! ## Core Concepts
//!
//! - **Trigger**: a circular geofence (center + radius) with a frequency policy and an optional daily timeframe
//! - **ProximityAlert**: a fired but unacknowledged geofence entry, at most one per trigger
//! - **Evaluator**: a pure pass over (position, time, triggers, alerts) producing distance updates and fire instructions
//! - **ProximityEngine**: a single worker thread that serializes UI mutations, live positions and simulation ticks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use geoprox::{EngineConfig, Frequency, ProximityEngine, TriggerSpec};
//!
//! # fn main() -> geoprox::GeoproxResult<()> {
//! let engine = ProximityEngine::new(EngineConfig::default())?;
//!
//! let fuel = engine.add_trigger(
//!     TriggerSpec::builder()
//!         .title("Buy fuel")
//!         .coordinates(9.0820, 7.4800)
//!         .radius(300.0)
//!         .frequency(Frequency::Always)
//!         .build()?,
//! )?;
//!
//! let fired = engine.feed_position(9.0820, 7.4800)?;
//! assert_eq!(fired[0].trigger_id, fuel.id);
//! engine.clear_alert(fired[0].id)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod alert;
pub mod error;
pub mod geo;
pub mod position;
pub mod time;
pub mod trigger;

// Stores and evaluation
pub mod evaluator;
pub mod storage;

// Runtime
pub mod catalog;
pub mod config;
pub mod engine;

// Re-export primary types at crate root for convenience
pub use alert::{AlertId, ProximityAlert};
pub use error::{ExecutionError, GeoproxError, GeoproxResult, ValidationError};
pub use geo::{distance_meters, format_distance, Coordinate, EARTH_RADIUS_M};
pub use position::{PositionSample, PositionSource, SimulationPath};
pub use time::{Clock, ClockTime, FixedClock, SystemClock, Timeframe};
pub use trigger::{Frequency, Trigger, TriggerId, TriggerPatch, TriggerSpec, TriggerSpecBuilder};

pub use evaluator::{apply_outcome, evaluate, EvaluationOutcome};
pub use storage::{AlertRegistry, InMemoryAlertRegistry, InMemoryStores, InMemoryTriggerStore, StorageError, TriggerStore};

pub use catalog::{TestLocation, TEST_LOCATIONS};
pub use config::{EngineConfig, SimulationConfig};
pub use engine::{EngineSnapshot, ProximityEngine, SimulationState, SnapshotStream};
