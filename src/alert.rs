//! Proximity alerts.
//!
//! An alert is a fired-but-unacknowledged geofence event. Alerts are created
//! only by the evaluator and destroyed only by an explicit clear.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::trigger::TriggerId;

/// Namespace for name-based alert ids.
const ALERT_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c2e_8b0d_4f5a_9e7c_1d2b_3a4c_5e6f);

/// Identifier of one firing of a trigger.
///
/// Derived from the trigger id, the fire time and a firing sequence number, so
/// repeated alerts for the same trigger are always distinguishable even when
/// they share a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Derives the id for a firing of `trigger_id` at `fired_at`.
    #[must_use]
    pub fn derive(trigger_id: TriggerId, fired_at: DateTime<Utc>, sequence: u64) -> Self {
        let mut name = Vec::with_capacity(32);
        name.extend_from_slice(trigger_id.as_uuid().as_bytes());
        name.extend_from_slice(&fired_at.timestamp_micros().to_be_bytes());
        name.extend_from_slice(&sequence.to_be_bytes());
        Self(Uuid::new_v5(&ALERT_NAMESPACE, &name))
    }

    /// Creates an alert ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An active, unacknowledged geofence event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityAlert {
    pub id: AlertId,
    /// The trigger that fired. The trigger store owns the trigger itself.
    pub trigger_id: TriggerId,
    /// Distance to the geofence center at the moment of firing, in meters.
    pub distance_at_fire: f64,
    pub fired_at: DateTime<Utc>,
}

impl ProximityAlert {
    #[must_use]
    pub fn new(trigger_id: TriggerId, distance_at_fire: f64, fired_at: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            id: AlertId::derive(trigger_id, fired_at, sequence),
            trigger_id,
            distance_at_fire,
            fired_at,
        }
    }
}
