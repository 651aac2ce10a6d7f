//! Position samples and scripted playback paths.
//!
//! The engine consumes positions, it never acquires them: live samples are
//! pushed in by the host, simulated ones come from a [`SimulationPath`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::Coordinate;

/// Where a position sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PositionSource {
    /// Pushed in by the host (device location API or a location picker).
    Live,
    /// Played back from the simulation path.
    Simulation {
        /// Zero-based waypoint index.
        waypoint: usize,
    },
}

/// One tracked position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub coordinate: Coordinate,
    /// When the sample was taken. Timeframe checks use the engine clock instead.
    pub timestamp: DateTime<Utc>,
    pub source: PositionSource,
}

impl PositionSample {
    /// A live sample stamped now.
    #[must_use]
    pub fn live(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinate: Coordinate::new(latitude, longitude),
            timestamp: Utc::now(),
            source: PositionSource::Live,
        }
    }

    /// A sample played back from waypoint `waypoint` of a simulation path.
    #[must_use]
    pub fn simulated(coordinate: Coordinate, waypoint: usize) -> Self {
        Self {
            coordinate,
            timestamp: Utc::now(),
            source: PositionSource::Simulation { waypoint },
        }
    }
}

/// An ordered, non-empty list of waypoints for simulation playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct SimulationPath(Vec<Coordinate>);

impl SimulationPath {
    /// Creates a path.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptySimulationPath` for an empty list and
    /// `ValidationError::InvalidCoordinate` for a non-finite waypoint.
    pub fn new(waypoints: Vec<Coordinate>) -> Result<Self, ValidationError> {
        if waypoints.is_empty() {
            return Err(ValidationError::EmptySimulationPath);
        }
        for waypoint in &waypoints {
            waypoint.validate()?;
        }
        Ok(Self(waypoints))
    }

    /// Home (Maitama) to the Shell station in Wuse II, seven waypoints heading east.
    #[must_use]
    pub fn reference() -> Self {
        Self(vec![
            Coordinate::new(9.0765, 7.3986),
            Coordinate::new(9.0770, 7.4100),
            Coordinate::new(9.0780, 7.4300),
            Coordinate::new(9.0790, 7.4500),
            Coordinate::new(9.0800, 7.4650),
            Coordinate::new(9.0810, 7.4750),
            Coordinate::new(9.0820, 7.4800),
        ])
    }

    #[must_use]
    pub fn waypoints(&self) -> &[Coordinate] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Coordinate> {
        self.0.get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SimulationPath {
    fn default() -> Self {
        Self::reference()
    }
}

impl TryFrom<Vec<Coordinate>> for SimulationPath {
    type Error = ValidationError;

    fn try_from(value: Vec<Coordinate>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SimulationPath> for Vec<Coordinate> {
    fn from(path: SimulationPath) -> Self {
        path.0
    }
}
