//! Evaluation worker.
//!
//! The worker thread exclusively owns both stores. Every inbound operation is
//! a [`Command`] processed strictly in arrival order, so an evaluation pass is
//! never interleaved with a UI mutation or another pass.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::alert::{AlertId, ProximityAlert};
use crate::config::EngineConfig;
use crate::error::{GeoproxError, GeoproxResult};
use crate::evaluator::{apply_outcome, evaluate};
use crate::geo::Coordinate;
use crate::position::PositionSample;
use crate::storage::{AlertRegistry, InMemoryStores, TriggerStore};
use crate::time::Clock;
use crate::trigger::{Trigger, TriggerId, TriggerPatch, TriggerSpec};

use super::scheduler::{Scheduler, SimulationState};
use super::stream::EngineSnapshot;

#[derive(Debug)]
pub(crate) enum Command {
    AddTrigger {
        spec: TriggerSpec,
        reply: Sender<GeoproxResult<Trigger>>,
    },
    RemoveTrigger {
        id: TriggerId,
        reply: Sender<Option<Trigger>>,
    },
    ToggleTrigger {
        id: TriggerId,
        reply: Sender<GeoproxResult<bool>>,
    },
    UpdateTrigger {
        id: TriggerId,
        patch: TriggerPatch,
        reply: Sender<GeoproxResult<Trigger>>,
    },
    ClearAlert {
        id: AlertId,
        reply: Sender<Option<ProximityAlert>>,
    },
    FeedPosition {
        sample: PositionSample,
        reply: Sender<Vec<ProximityAlert>>,
    },
    StartSimulation {
        reply: Sender<GeoproxResult<SimulationState>>,
    },
    StopSimulation {
        reply: Sender<SimulationState>,
    },
    SimulationTick {
        run: u64,
    },
    Snapshot {
        reply: Sender<EngineSnapshot>,
    },
    Subscribe {
        tx: Sender<EngineSnapshot>,
    },
    Shutdown,
}

pub(crate) struct Worker {
    stores: InMemoryStores,
    clock: Arc<dyn Clock>,
    position: Coordinate,
    scheduler: Scheduler,
    commands: Sender<Command>,
    subscribers: Vec<Sender<EngineSnapshot>>,
    dropped_snapshots: Arc<AtomicU64>,
    next_sequence: u64,
    passes: u64,
}

impl Worker {
    pub(crate) fn new(
        cfg: &EngineConfig,
        clock: Arc<dyn Clock>,
        commands: Sender<Command>,
        dropped_snapshots: Arc<AtomicU64>,
    ) -> Self {
        Self {
            stores: InMemoryStores::new(),
            clock,
            position: cfg.start_position,
            scheduler: Scheduler::new(&cfg.simulation),
            commands,
            subscribers: Vec::new(),
            dropped_snapshots,
            next_sequence: 0,
            passes: 0,
        }
    }

    pub(crate) fn run(mut self, commands: Receiver<Command>) {
        tracing::info!(position = %self.position, "evaluation worker started");
        while let Ok(command) = commands.recv() {
            if self.handle(command).is_break() {
                break;
            }
        }
        self.scheduler.stop();
        tracing::info!(passes = self.passes, "evaluation worker stopped");
    }

    fn handle(&mut self, command: Command) -> ControlFlow<()> {
        let changed = match command {
            Command::AddTrigger { spec, reply } => {
                let result = self.stores.triggers.add(spec).map_err(GeoproxError::from);
                if let Ok(trigger) = &result {
                    tracing::debug!(trigger_id = %trigger.id, title = %trigger.title, "trigger added");
                }
                let changed = result.is_ok();
                let _ = reply.send(result);
                changed
            }
            Command::RemoveTrigger { id, reply } => {
                let removed = self.stores.triggers.remove(id);
                let changed = removed.is_some();
                if changed {
                    tracing::debug!(trigger_id = %id, "trigger removed");
                }
                let _ = reply.send(removed);
                changed
            }
            Command::ToggleTrigger { id, reply } => {
                let result = self.stores.triggers.toggle_enabled(id).map_err(GeoproxError::from);
                let changed = result.is_ok();
                let _ = reply.send(result);
                changed
            }
            Command::UpdateTrigger { id, patch, reply } => {
                let result = self.stores.triggers.update(id, patch).map_err(GeoproxError::from);
                let changed = result.is_ok();
                let _ = reply.send(result);
                changed
            }
            Command::ClearAlert { id, reply } => {
                let cleared = self.stores.alerts.clear(id);
                let changed = cleared.is_some();
                if let Some(alert) = &cleared {
                    tracing::debug!(alert_id = %id, trigger_id = %alert.trigger_id, "alert cleared");
                }
                let _ = reply.send(cleared);
                changed
            }
            Command::FeedPosition { sample, reply } => {
                let fired = self.evaluate_at(sample);
                let _ = reply.send(fired);
                true
            }
            Command::StartSimulation { reply } => {
                let result = self.scheduler.start(&self.commands);
                let changed = matches!(result, Ok(true));
                let _ = reply.send(result.map(|_| self.scheduler.state()));
                changed
            }
            Command::StopSimulation { reply } => {
                let changed = self.scheduler.stop();
                let _ = reply.send(self.scheduler.state());
                changed
            }
            Command::SimulationTick { run } => match self.scheduler.on_tick(run) {
                Some(step) => {
                    self.evaluate_at(PositionSample::simulated(step.coordinate, step.index));
                    if step.finished {
                        tracing::info!(run, waypoints = step.index + 1, "simulation complete");
                    }
                    true
                }
                None => {
                    tracing::trace!(run, "stale simulation tick ignored");
                    false
                }
            },
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                false
            }
            Command::Subscribe { tx } => {
                if self.deliver(&tx, self.snapshot()) {
                    self.subscribers.push(tx);
                }
                false
            }
            Command::Shutdown => return ControlFlow::Break(()),
        };

        if changed {
            self.publish();
        }
        ControlFlow::Continue(())
    }

    fn evaluate_at(&mut self, sample: PositionSample) -> Vec<ProximityAlert> {
        let now = self.clock.now();
        let triggers = self.stores.triggers.all();
        let outcome = evaluate(sample.coordinate, &now, &triggers, &self.stores.alerts, self.next_sequence);
        self.next_sequence += outcome.fires.len() as u64;
        self.position = sample.coordinate;
        self.passes += 1;

        tracing::debug!(
            position = %sample.coordinate,
            source = ?sample.source,
            candidates = outcome.distances.len(),
            fires = outcome.fire_count(),
            "evaluation pass"
        );
        apply_outcome(outcome, &mut self.stores.triggers, &mut self.stores.alerts)
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            triggers: self.stores.triggers.all(),
            alerts: self.stores.alerts.all(),
            current_position: self.position,
            simulation: self.scheduler.state(),
            passes: self.passes,
        }
    }

    /// Returns false if the subscriber has gone away.
    fn deliver(&self, tx: &Sender<EngineSnapshot>, snapshot: EngineSnapshot) -> bool {
        match tx.try_send(snapshot) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_snapshots.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("subscriber buffer full, snapshot dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        let subscribers = std::mem::take(&mut self.subscribers);
        self.subscribers = subscribers
            .into_iter()
            .filter(|tx| self.deliver(tx, snapshot.clone()))
            .collect();
    }
}
