//! Error types for geoprox.
//!
//! All errors in geoprox are strongly typed using thiserror.
//! Every error is local and recoverable: the engine degrades to
//! "operation ignored" or "trigger never fires" instead of panicking.

use thiserror::Error;

use crate::trigger::TriggerId;

/// Validation errors that occur during input validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Radius {radius} must be a positive number of meters")]
    NonPositiveRadius {
        radius: f64,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate {
        latitude: f64,
        longitude: f64,
    },

    #[error("Invalid clock time '{value}', expected zero-padded HH:MM")]
    InvalidClockTime {
        value: String,
    },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },

    #[error("Simulation path must contain at least one waypoint")]
    EmptySimulationPath,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Execution errors that occur while the engine applies an operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Trigger not found: {id}")]
    TriggerNotFound {
        id: TriggerId,
    },

    #[error("Trigger {trigger_id} already has an active alert")]
    DuplicateAlert {
        trigger_id: TriggerId,
    },

    #[error("Evaluation queue is full (capacity {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Top-level error type for geoprox.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeoproxError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl GeoproxError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if the operation referenced an unknown trigger.
    ///
    /// Unknown alert ids are not errors: clearing one is a no-op.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::TriggerNotFound { .. }))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Execution(e) => matches!(e, ExecutionError::QueueFull { .. } | ExecutionError::Timeout { .. }),
            Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for geoprox operations.
pub type GeoproxResult<T> = Result<T, GeoproxError>;
