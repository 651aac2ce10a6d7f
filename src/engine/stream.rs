use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use serde::{Deserialize, Serialize};

use crate::alert::ProximityAlert;
use crate::error::{ExecutionError, GeoproxError, GeoproxResult};
use crate::geo::Coordinate;
use crate::trigger::Trigger;

use super::scheduler::SimulationState;

/// Observable engine state, published after every state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// All triggers in insertion order, with their latest distance.
    pub triggers: Vec<Trigger>,
    /// Active (unacknowledged) alerts in firing order.
    pub alerts: Vec<ProximityAlert>,
    /// Last evaluated position, or the configured start position.
    pub current_position: Coordinate,
    /// Simulation playback state.
    pub simulation: SimulationState,
    /// Number of evaluation passes run so far.
    pub passes: u64,
}

/// A subscription to engine snapshots.
///
/// The worker never blocks on a subscriber: when the buffer is full the
/// snapshot is dropped and counted. Dropping the stream unsubscribes.
#[derive(Debug)]
pub struct SnapshotStream {
    rx: Receiver<EngineSnapshot>,
}

fn disconnected() -> GeoproxError {
    GeoproxError::Execution(ExecutionError::Disconnected {
        path: "snapshot_stream".to_string(),
    })
}

impl SnapshotStream {
    pub(crate) const fn new(rx: Receiver<EngineSnapshot>) -> Self {
        Self { rx }
    }

    /// Receive the next snapshot (blocking).
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` once the engine has shut down.
    pub fn recv(&self) -> GeoproxResult<EngineSnapshot> {
        self.rx.recv().map_err(|_| disconnected())
    }

    /// Receive the next snapshot with a timeout.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Timeout` if nothing arrives in time and
    /// `ExecutionError::Disconnected` once the engine has shut down.
    pub fn recv_timeout(&self, timeout: Duration) -> GeoproxResult<EngineSnapshot> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => GeoproxError::Execution(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => disconnected(),
        })
    }

    /// Returns a buffered snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Disconnected` once the engine has shut down
    /// and the buffer is drained.
    pub fn try_recv(&self) -> GeoproxResult<Option<EngineSnapshot>> {
        match self.rx.try_recv() {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(disconnected()),
        }
    }

    /// Drains the buffer and returns the most recent snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<EngineSnapshot> {
        self.rx.try_iter().last()
    }
}
