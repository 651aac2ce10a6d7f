//! Abstract storage traits for geoprox.
//!
//! Both stores are owned by a single evaluation worker, so mutation goes
//! through `&mut self` and no interior locking is required. Implementations
//! must be `Send` so the worker can own them.

use thiserror::Error;

use crate::alert::{AlertId, ProximityAlert};
use crate::error::{ExecutionError, GeoproxError, ValidationError};
use crate::trigger::{Trigger, TriggerId, TriggerPatch, TriggerSpec};

/// Errors that can occur during storage operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    /// Input rejected before it reached the store.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    /// Trigger not found.
    #[error("Trigger not found: {0}")]
    TriggerNotFound(TriggerId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The trigger already has an active alert.
    #[error("Trigger {0} already has an active alert")]
    DuplicateAlert(TriggerId),
}

impl From<StorageError> for GeoproxError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Invalid(e) => Self::Validation(e),
            StorageError::TriggerNotFound(id) => Self::Execution(ExecutionError::TriggerNotFound { id }),
            StorageError::DuplicateAlert(trigger_id) => {
                Self::Execution(ExecutionError::DuplicateAlert { trigger_id })
            }
            StorageError::DuplicateKey(key) => Self::internal(format!("duplicate key: {key}")),
        }
    }
}

/// Exclusive owner of the trigger collection.
///
/// Unknown ids are reported as `TriggerNotFound` by every operation except
/// `remove`, which is idempotent.
pub trait TriggerStore: Send {
    /// Validate `spec`, assign a fresh id and creation time, and store it.
    fn add(&mut self, spec: TriggerSpec) -> Result<Trigger, StorageError>;

    /// Insert an already-materialized trigger. Returns error if the ID exists.
    fn insert(&mut self, trigger: Trigger) -> Result<(), StorageError>;

    /// Get a trigger by ID.
    fn get(&self, id: TriggerId) -> Option<&Trigger>;

    /// Remove a trigger, returning it if it was present.
    fn remove(&mut self, id: TriggerId) -> Option<Trigger>;

    /// Flip `enabled`, returning the new value.
    fn toggle_enabled(&mut self, id: TriggerId) -> Result<bool, StorageError>;

    /// Merge a partial update. Cannot clear `triggered`.
    fn update(&mut self, id: TriggerId, patch: TriggerPatch) -> Result<Trigger, StorageError>;

    /// Record that a `Once` trigger has fired.
    fn mark_triggered(&mut self, id: TriggerId) -> Result<(), StorageError>;

    /// Record the latest computed distance for display.
    fn set_distance(&mut self, id: TriggerId, meters: f64) -> Result<(), StorageError>;

    /// All triggers in insertion order.
    fn all(&self) -> Vec<Trigger>;

    /// Number of stored triggers.
    fn len(&self) -> usize;

    /// True if no triggers are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owner of the currently active (unacknowledged) alerts.
///
/// Holds at most one alert per trigger.
pub trait AlertRegistry: Send {
    /// The active alert for a trigger, if any.
    fn active_for(&self, trigger_id: TriggerId) -> Option<&ProximityAlert>;

    /// Insert an alert. Fails with `DuplicateAlert` if the trigger already has one.
    fn register(&mut self, alert: ProximityAlert) -> Result<(), StorageError>;

    /// Remove an alert by id, returning it if it was present.
    fn clear(&mut self, alert_id: AlertId) -> Option<ProximityAlert>;

    /// All active alerts in firing order.
    fn all(&self) -> Vec<ProximityAlert>;

    /// Number of active alerts.
    fn len(&self) -> usize;

    /// True if no alert is active.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
