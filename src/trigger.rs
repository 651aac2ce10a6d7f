//! Location triggers (reminders).
//!
//! A trigger is a circular geofence (center + radius) plus the policy that
//! decides when entering it produces an alert. Triggers are created from a
//! validated [`TriggerSpec`], mutated only through the trigger store, and never
//! destroyed implicitly.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo::{format_distance, Coordinate};
use crate::time::Timeframe;

/// Conservative upper bound for free-form text fields.
pub const MAX_TEXT_LEN: usize = 1024;

/// Globally unique, immutable trigger identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(Uuid);

impl TriggerId {
    /// Creates a new random trigger ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a trigger ID from an existing UUID.
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

impl Default for TriggerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TriggerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// How often a trigger may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Fire at most one time over the trigger's lifetime.
    #[default]
    Once,
    /// Fire on every qualifying pass once the previous alert is cleared.
    Always,
}

/// A user-defined location reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Unique identifier, assigned at creation.
    pub id: TriggerId,
    /// Display text.
    pub title: String,
    /// Place name shown next to the title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Street address of the place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Display glyph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Geofence center.
    pub coordinates: Coordinate,
    /// Geofence radius in meters.
    pub radius: f64,
    /// Disabled triggers are excluded from evaluation entirely.
    pub enabled: bool,
    pub frequency: Frequency,
    /// Daily local-time window outside which the trigger is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    /// Set once a `Once` trigger has fired.
    pub triggered: bool,
    /// Most recently computed distance to the tracked position, in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_distance: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Trigger {
    /// Materializes a validated spec with a fresh id and creation time.
    #[must_use]
    pub fn from_spec(spec: TriggerSpec) -> Self {
        Self {
            id: TriggerId::new(),
            title: spec.title,
            location: spec.location,
            address: spec.address,
            icon: spec.icon,
            coordinates: spec.coordinates,
            radius: spec.radius,
            enabled: spec.enabled,
            frequency: spec.frequency,
            timeframe: spec.timeframe,
            triggered: false,
            last_known_distance: None,
            created_at: Utc::now(),
        }
    }

    /// True if a `Once` trigger has already been consumed.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        matches!(self.frequency, Frequency::Once) && self.triggered
    }

    /// Display form of the last known distance, `--` before the first pass.
    #[must_use]
    pub fn distance_label(&self) -> String {
        self.last_known_distance
            .map_or_else(|| "--".to_string(), format_distance)
    }

    /// Applies a partial update.
    ///
    /// The `triggered` flag is not reachable from here: a consumed `Once`
    /// trigger stays consumed.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any provided field is invalid; the trigger
    /// is left untouched in that case.
    pub fn apply_patch(&mut self, patch: TriggerPatch) -> Result<(), ValidationError> {
        patch.validate()?;

        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(location) = patch.location {
            self.location = Some(location);
        }
        if let Some(address) = patch.address {
            self.address = Some(address);
        }
        if let Some(icon) = patch.icon {
            self.icon = Some(icon);
        }
        if let Some(coordinates) = patch.coordinates {
            self.coordinates = coordinates;
        }
        if let Some(radius) = patch.radius {
            self.radius = radius;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(frequency) = patch.frequency {
            self.frequency = frequency;
        }
        if let Some(timeframe) = patch.timeframe {
            self.timeframe = timeframe;
        }
        Ok(())
    }
}

fn validate_radius(radius: f64) -> Result<(), ValidationError> {
    // NaN fails this comparison too.
    if radius > 0.0 && radius.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveRadius { radius })
    }
}

fn validate_text(field: &'static str, value: &str, required: bool) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if required && trimmed.is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    if trimmed.len() > MAX_TEXT_LEN {
        return Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            max_length: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

/// Validated input for creating a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub coordinates: Coordinate,
    pub radius: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
}

fn default_enabled() -> bool {
    true
}

impl TriggerSpec {
    /// Creates a new spec builder.
    #[must_use]
    pub fn builder() -> TriggerSpecBuilder {
        TriggerSpecBuilder::new()
    }

    /// Checks the creation constraints.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a non-positive radius, non-finite
    /// coordinates, an empty title, or oversized text.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("title", &self.title, true)?;
        for (field, value) in [("location", &self.location), ("address", &self.address), ("icon", &self.icon)] {
            if let Some(v) = value {
                validate_text(field, v, false)?;
            }
        }
        self.coordinates.validate()?;
        validate_radius(self.radius)
    }
}

/// Builder for [`TriggerSpec`].
///
/// Ensures all required fields are set before building.
#[derive(Debug, Default)]
pub struct TriggerSpecBuilder {
    title: Option<String>,
    location: Option<String>,
    address: Option<String>,
    icon: Option<String>,
    coordinates: Option<Coordinate>,
    radius: Option<f64>,
    enabled: Option<bool>,
    frequency: Option<Frequency>,
    timeframe: Option<Timeframe>,
}

impl TriggerSpecBuilder {
    /// Creates a new trigger builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the geofence center.
    #[must_use]
    pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinate::new(latitude, longitude));
        self
    }

    /// Sets the geofence radius in meters.
    #[must_use]
    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    /// Sets whether the trigger starts enabled (default: true).
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Sets the frequency policy (default: `Once`).
    #[must_use]
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    #[must_use]
    pub fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }

    /// Builds the spec.
    /// Returns `ValidationError` if required fields are missing or invalid.
    pub fn build(self) -> Result<TriggerSpec, ValidationError> {
        let title = self.title.ok_or(ValidationError::MissingField {
            field: "title".to_string(),
        })?;

        let coordinates = self.coordinates.ok_or(ValidationError::MissingField {
            field: "coordinates".to_string(),
        })?;

        let radius = self.radius.ok_or(ValidationError::MissingField {
            field: "radius".to_string(),
        })?;

        let spec = TriggerSpec {
            title,
            location: self.location,
            address: self.address,
            icon: self.icon,
            coordinates,
            radius,
            enabled: self.enabled.unwrap_or(true),
            frequency: self.frequency.unwrap_or_default(),
            timeframe: self.timeframe,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Partial update for an existing trigger.
///
/// `None` leaves a field unchanged. `triggered` cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinate>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    /// `Some(None)` removes the timeframe. In JSON an explicit `null` removes
    /// it and an absent key leaves it unchanged.
    #[serde(default, deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Option<Timeframe>>,
}

/// Only called when the key is present, so `null` becomes `Some(None)`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<Timeframe>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Timeframe>::deserialize(deserializer).map(Some)
}

impl TriggerPatch {
    /// Checks every provided field.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_text("title", title, true)?;
        }
        for (field, value) in [("location", &self.location), ("address", &self.address), ("icon", &self.icon)] {
            if let Some(v) = value {
                validate_text(field, v, false)?;
            }
        }
        if let Some(coordinates) = &self.coordinates {
            coordinates.validate()?;
        }
        if let Some(radius) = self.radius {
            validate_radius(radius)?;
        }
        Ok(())
    }
}
