//! Proximity evaluation.
//!
//! [`evaluate`] is a pure function of (position, instant, triggers, active
//! alerts). It does not touch the stores; it returns an [`EvaluationOutcome`]
//! describing the distance updates and the alerts to emit, and
//! [`apply_outcome`] applies that outcome to the store pair. Alert creation and
//! the `Once` consumption mark are applied together or not at all.
//!
//! Per enabled trigger:
//! 1. outside its timeframe: skipped, no distance update
//! 2. distance recorded
//! 3. inside (`d <= radius`), not consumed, no active alert: fire

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::ProximityAlert;
use crate::geo::Coordinate;
use crate::storage::{AlertRegistry, StorageError, TriggerStore};
use crate::time::ClockTime;
use crate::trigger::{Frequency, Trigger, TriggerId};

/// New display distance for one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceUpdate {
    pub trigger_id: TriggerId,
    pub meters: f64,
}

/// Emit `alert`, and if `mark_triggered` is set, consume the trigger with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireInstruction {
    pub alert: ProximityAlert,
    pub mark_triggered: bool,
}

/// Everything one evaluation pass wants to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub distances: Vec<DistanceUpdate>,
    pub fires: Vec<FireInstruction>,
    /// Triggers excluded because they are disabled.
    pub skipped_disabled: usize,
    /// Triggers excluded because the local time is outside their timeframe.
    pub skipped_timeframe: usize,
}

impl EvaluationOutcome {
    /// Number of alerts this outcome would emit.
    #[must_use]
    pub fn fire_count(&self) -> usize {
        self.fires.len()
    }
}

/// Why a trigger in range did not fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suppressed {
    Consumed,
    AlreadyAlerting,
}

fn suppression(trigger: &Trigger, alerts: &dyn AlertRegistry) -> Option<Suppressed> {
    if trigger.is_consumed() {
        return Some(Suppressed::Consumed);
    }
    if alerts.active_for(trigger.id).is_some() {
        return Some(Suppressed::AlreadyAlerting);
    }
    None
}

fn is_usable_radius(radius: f64) -> bool {
    radius > 0.0 && radius.is_finite()
}

/// Geofence membership, boundary inclusive.
///
/// A non-positive or non-finite radius is never inside; such triggers should
/// have been rejected at creation.
#[must_use]
pub fn is_inside(distance: f64, radius: f64) -> bool {
    is_usable_radius(radius) && distance <= radius
}

/// Runs one evaluation pass.
///
/// `first_sequence` numbers the alerts emitted by this pass consecutively and
/// is folded into each alert id. It must keep increasing across passes: the
/// caller advances it by [`EvaluationOutcome::fire_count`] after every pass.
/// Reusing a sequence for a refire at the same instant reproduces the id of
/// the earlier alert.
#[must_use]
pub fn evaluate(
    position: Coordinate,
    now: &DateTime<FixedOffset>,
    triggers: &[Trigger],
    alerts: &dyn AlertRegistry,
    first_sequence: u64,
) -> EvaluationOutcome {
    let mut outcome = EvaluationOutcome::default();
    let local_time = ClockTime::of(now);
    let fired_at = now.with_timezone(&Utc);
    let mut sequence = first_sequence;

    for trigger in triggers {
        if !trigger.enabled {
            outcome.skipped_disabled += 1;
            continue;
        }

        if let Some(timeframe) = &trigger.timeframe {
            if !timeframe.contains(&local_time) {
                tracing::trace!(trigger_id = %trigger.id, local_time = %local_time, "outside timeframe");
                outcome.skipped_timeframe += 1;
                continue;
            }
        }

        let distance = position.distance_to(&trigger.coordinates);
        outcome.distances.push(DistanceUpdate {
            trigger_id: trigger.id,
            meters: distance,
        });

        if !is_inside(distance, trigger.radius) {
            if !is_usable_radius(trigger.radius) {
                tracing::warn!(trigger_id = %trigger.id, radius = trigger.radius, "non-positive radius, never inside");
            }
            continue;
        }

        if let Some(reason) = suppression(trigger, alerts) {
            tracing::trace!(trigger_id = %trigger.id, ?reason, "in range but suppressed");
            continue;
        }

        outcome.fires.push(FireInstruction {
            alert: ProximityAlert::new(trigger.id, distance, fired_at, sequence),
            mark_triggered: trigger.frequency == Frequency::Once,
        });
        sequence += 1;
    }

    outcome
}

/// Applies an outcome to the store pair, returning the alerts actually registered.
///
/// Each fire instruction is all-or-nothing: if the `Once` mark cannot be
/// recorded, the freshly registered alert is withdrawn again.
pub fn apply_outcome(
    outcome: EvaluationOutcome,
    triggers: &mut dyn TriggerStore,
    alerts: &mut dyn AlertRegistry,
) -> Vec<ProximityAlert> {
    for update in &outcome.distances {
        if let Err(err) = triggers.set_distance(update.trigger_id, update.meters) {
            tracing::warn!(trigger_id = %update.trigger_id, error = %err, "distance update dropped");
        }
    }

    let mut fired = Vec::with_capacity(outcome.fires.len());
    for FireInstruction { alert, mark_triggered } in outcome.fires {
        match apply_fire(&alert, mark_triggered, triggers, alerts) {
            Ok(()) => {
                tracing::info!(
                    trigger_id = %alert.trigger_id,
                    alert_id = %alert.id,
                    distance_m = alert.distance_at_fire,
                    "proximity alert fired"
                );
                fired.push(alert);
            }
            Err(err) => {
                tracing::warn!(trigger_id = %alert.trigger_id, error = %err, "fire instruction rejected");
            }
        }
    }
    fired
}

fn apply_fire(
    alert: &ProximityAlert,
    mark_triggered: bool,
    triggers: &mut dyn TriggerStore,
    alerts: &mut dyn AlertRegistry,
) -> Result<(), StorageError> {
    if triggers.get(alert.trigger_id).is_none() {
        return Err(StorageError::TriggerNotFound(alert.trigger_id));
    }
    alerts.register(alert.clone())?;
    if mark_triggered {
        if let Err(err) = triggers.mark_triggered(alert.trigger_id) {
            alerts.clear(alert.id);
            return Err(err);
        }
    }
    Ok(())
}
