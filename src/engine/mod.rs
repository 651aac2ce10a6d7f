//! Proximity engine runtime.
//!
//! [`ProximityEngine`] is a cheap handle over a single evaluation worker
//! thread. UI mutations, live positions and simulation ticks are all posted to
//! one bounded command queue and applied strictly one at a time; mutating
//! calls wait for the worker's acknowledgement so their effect is visible on
//! return.

mod scheduler;
mod stream;
mod worker;

pub use scheduler::SimulationState;
pub use stream::{EngineSnapshot, SnapshotStream};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender, TrySendError};

use crate::alert::{AlertId, ProximityAlert};
use crate::catalog::demo_trigger_specs;
use crate::config::EngineConfig;
use crate::error::{ExecutionError, GeoproxError, GeoproxResult};
use crate::geo::Coordinate;
use crate::position::PositionSample;
use crate::time::{Clock, SystemClock};
use crate::trigger::{Trigger, TriggerId, TriggerPatch, TriggerSpec};

use worker::{Command, Worker};

fn disconnected(path: &str) -> GeoproxError {
    GeoproxError::Execution(ExecutionError::Disconnected {
        path: path.to_string(),
    })
}

/// Handle to a running proximity engine.
///
/// Dropping the handle stops any simulation run and joins the worker.
#[derive(Debug)]
pub struct ProximityEngine {
    cfg: EngineConfig,
    commands: Sender<Command>,
    queue_capacity: usize,
    dropped_snapshots: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl ProximityEngine {
    /// Starts an engine that evaluates timeframes against host local time.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid start position and an
    /// internal error if the worker thread cannot be spawned.
    pub fn new(cfg: EngineConfig) -> GeoproxResult<Self> {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    /// Starts an engine with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`ProximityEngine::new`].
    pub fn with_clock(cfg: EngineConfig, clock: Arc<dyn Clock>) -> GeoproxResult<Self> {
        cfg.start_position.validate()?;

        let queue_capacity = cfg.command_queue_capacity.max(1);
        let (commands, command_rx) = bounded::<Command>(queue_capacity);
        let dropped_snapshots = Arc::new(AtomicU64::new(0));

        let worker = Worker::new(&cfg, clock, commands.clone(), Arc::clone(&dropped_snapshots));
        let join = thread::Builder::new()
            .name("geoprox-eval".to_string())
            .spawn(move || worker.run(command_rx))
            .map_err(|e| GeoproxError::internal(format!("failed to spawn evaluation worker: {e}")))?;

        Ok(Self {
            cfg,
            commands,
            queue_capacity,
            dropped_snapshots,
            join: Some(join),
        })
    }

    /// The configuration this engine was started with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Command) -> GeoproxResult<T> {
        let (reply, reply_rx) = bounded::<T>(1);
        self.commands
            .send(build(reply))
            .map_err(|_| disconnected("engine_commands"))?;
        reply_rx.recv().map_err(|_| disconnected("engine_reply"))
    }

    /// Stores a new trigger. It is first evaluated on the next position update.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the spec is invalid.
    pub fn add_trigger(&self, spec: TriggerSpec) -> GeoproxResult<Trigger> {
        spec.validate()?;
        self.request(|reply| Command::AddTrigger { spec, reply })?
    }

    /// Removes a trigger. Returns `None` if it did not exist.
    ///
    /// An active alert for the trigger is left in place until cleared.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn remove_trigger(&self, id: TriggerId) -> GeoproxResult<Option<Trigger>> {
        self.request(|reply| Command::RemoveTrigger { id, reply })
    }

    /// Flips `enabled` and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::TriggerNotFound` for an unknown id.
    pub fn toggle_trigger(&self, id: TriggerId) -> GeoproxResult<bool> {
        self.request(|reply| Command::ToggleTrigger { id, reply })?
    }

    /// Merges `patch` into the trigger and returns the updated trigger.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::TriggerNotFound` for an unknown id and a
    /// validation error if the merged trigger would be invalid.
    pub fn update_trigger(&self, id: TriggerId, patch: TriggerPatch) -> GeoproxResult<Trigger> {
        self.request(|reply| Command::UpdateTrigger { id, patch, reply })?
    }

    /// Acknowledges an alert. Returns `None` if it was not active.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn clear_alert(&self, id: AlertId) -> GeoproxResult<Option<ProximityAlert>> {
        self.request(|reply| Command::ClearAlert { id, reply })
    }

    /// Runs one evaluation pass at a live position and returns the alerts it fired.
    ///
    /// Also serves as a one-off manual position override.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidCoordinate` for non-finite input and
    /// `ExecutionError::QueueFull` if the evaluation queue is saturated.
    pub fn feed_position(&self, latitude: f64, longitude: f64) -> GeoproxResult<Vec<ProximityAlert>> {
        Coordinate::new(latitude, longitude).validate()?;
        let sample = PositionSample::live(latitude, longitude);

        let (reply, reply_rx) = bounded(1);
        match self.commands.try_send(Command::FeedPosition { sample, reply }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                return Err(GeoproxError::Execution(ExecutionError::QueueFull {
                    capacity: self.queue_capacity,
                }));
            }
            Err(TrySendError::Disconnected(_)) => return Err(disconnected("engine_commands")),
        }
        reply_rx.recv().map_err(|_| disconnected("engine_reply"))
    }

    /// Starts simulation playback from the first waypoint.
    ///
    /// A no-op while a run is already in progress.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the ticker thread cannot be spawned.
    pub fn start_simulation(&self) -> GeoproxResult<SimulationState> {
        self.request(|reply| Command::StartSimulation { reply })?
    }

    /// Stops playback. Safe from any state; no waypoint is applied after this returns.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn stop_simulation(&self) -> GeoproxResult<SimulationState> {
        self.request(|reply| Command::StopSimulation { reply })
    }

    /// Reads a consistent view of the whole engine state.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn snapshot(&self) -> GeoproxResult<EngineSnapshot> {
        self.request(|reply| Command::Snapshot { reply })
    }

    /// All triggers in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn triggers(&self) -> GeoproxResult<Vec<Trigger>> {
        Ok(self.snapshot()?.triggers)
    }

    /// All active alerts.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn alerts(&self) -> GeoproxResult<Vec<ProximityAlert>> {
        Ok(self.snapshot()?.alerts)
    }

    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn current_position(&self) -> GeoproxResult<Coordinate> {
        Ok(self.snapshot()?.current_position)
    }

    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn simulation_state(&self) -> GeoproxResult<SimulationState> {
        Ok(self.snapshot()?.simulation)
    }

    /// Subscribes to snapshots. The current state is delivered first, then one
    /// snapshot after every state change.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn subscribe(&self) -> GeoproxResult<SnapshotStream> {
        let (tx, rx) = bounded::<EngineSnapshot>(self.cfg.snapshot_stream_capacity.max(1));
        self.commands
            .send(Command::Subscribe { tx })
            .map_err(|_| disconnected("engine_commands"))?;
        Ok(SnapshotStream::new(rx))
    }

    /// Installs the two demo reminders around Abuja.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` if the worker has stopped.
    pub fn seed_demo_triggers(&self) -> GeoproxResult<Vec<Trigger>> {
        demo_trigger_specs()?
            .into_iter()
            .map(|spec| self.add_trigger(spec))
            .collect()
    }

    /// Snapshots dropped because a subscriber was not keeping up.
    #[must_use]
    pub fn dropped_snapshots(&self) -> u64 {
        self.dropped_snapshots.load(Ordering::Relaxed)
    }
}

impl Drop for ProximityEngine {
    fn drop(&mut self) {
        // The worker holds a sender for the ticker, so the queue never closes
        // on its own; shutdown has to be explicit.
        let _ = self.commands.send(Command::Shutdown);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::warn!("evaluation worker panicked");
            }
        }
    }
}
