//! Simulation playback scheduler.
//!
//! The scheduler lives on the evaluation worker. Each started run spawns a
//! ticker thread that only posts `SimulationTick { run }` onto the command
//! queue; it never touches engine state. Ticks carrying any run number other
//! than the active one are ignored, so once a stop has been processed no
//! further waypoint is applied even if ticks are still queued.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::{GeoproxError, GeoproxResult};
use crate::geo::Coordinate;
use crate::position::SimulationPath;

use super::worker::Command;

/// Playback state: `Idle -> Running -> Idle`. There is no paused state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SimulationState {
    #[default]
    Idle,
    Running {
        /// Index of the waypoint the next tick will apply.
        next_waypoint: usize,
        /// Number of waypoints in the path.
        total: usize,
    },
}

impl SimulationState {
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// One waypoint released by a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Step {
    pub index: usize,
    pub coordinate: Coordinate,
    /// True if this was the last waypoint and playback has stopped.
    pub finished: bool,
}

#[derive(Debug)]
struct Ticker {
    cancel: Sender<()>,
    join: JoinHandle<()>,
}

impl Ticker {
    fn spawn(run: u64, interval: Duration, commands: Sender<Command>) -> std::io::Result<Self> {
        let (cancel, cancel_rx) = bounded::<()>(1);
        let join = thread::Builder::new()
            .name(format!("geoprox-sim-{run}"))
            .spawn(move || {
                let ticks = tick(interval);
                loop {
                    select! {
                        recv(cancel_rx) -> _ => break,
                        recv(ticks) -> _ => match commands.try_send(Command::SimulationTick { run }) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                tracing::debug!(run, "evaluation queue full, simulation tick skipped");
                            }
                            Err(TrySendError::Disconnected(_)) => break,
                        },
                    }
                }
            })?;
        Ok(Self { cancel, join })
    }

    /// Disconnects the cancel channel and waits for the thread to exit.
    fn cancel(self) {
        drop(self.cancel);
        if self.join.join().is_err() {
            tracing::warn!("simulation ticker panicked");
        }
    }
}

#[derive(Debug)]
struct ActiveRun {
    run: u64,
    next: usize,
    ticker: Ticker,
}

#[derive(Debug)]
pub(crate) struct Scheduler {
    path: SimulationPath,
    interval: Duration,
    runs: u64,
    active: Option<ActiveRun>,
}

impl Scheduler {
    pub(crate) fn new(cfg: &SimulationConfig) -> Self {
        Self {
            path: cfg.path.clone(),
            interval: cfg.step_interval(),
            runs: 0,
            active: None,
        }
    }

    pub(crate) fn state(&self) -> SimulationState {
        self.active.as_ref().map_or(SimulationState::Idle, |active| SimulationState::Running {
            next_waypoint: active.next,
            total: self.path.len(),
        })
    }

    /// Starts a new run from waypoint 0. Returns false if a run is already active.
    pub(crate) fn start(&mut self, commands: &Sender<Command>) -> GeoproxResult<bool> {
        if self.active.is_some() {
            return Ok(false);
        }

        let run = self.runs + 1;
        let ticker = Ticker::spawn(run, self.interval, commands.clone())
            .map_err(|e| GeoproxError::internal(format!("failed to spawn simulation ticker: {e}")))?;
        self.runs = run;
        self.active = Some(ActiveRun { run, next: 0, ticker });

        tracing::info!(
            run,
            waypoints = self.path.len(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "simulation started"
        );
        Ok(true)
    }

    /// Cancels the active run. Returns false if nothing was running.
    pub(crate) fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                active.ticker.cancel();
                tracing::info!(run = active.run, next_waypoint = active.next, "simulation stopped");
                true
            }
            None => false,
        }
    }

    /// Releases the next waypoint for `run`, or `None` for a stale tick.
    pub(crate) fn on_tick(&mut self, run: u64) -> Option<Step> {
        let active = self.active.as_mut().filter(|active| active.run == run)?;
        let index = active.next;
        let Some(coordinate) = self.path.get(index) else {
            self.stop();
            return None;
        };
        active.next += 1;

        let finished = active.next >= self.path.len();
        if finished {
            self.stop();
        }
        Some(Step {
            index,
            coordinate,
            finished,
        })
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
