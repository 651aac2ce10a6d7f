//! Great-circle geometry and distance formatting.
//!
//! Distances are computed with the Haversine formula on a spherical Earth.
//! Coordinates are in degrees; range checking is the caller's job.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic coordinate with latitude and longitude in degrees.
///
/// # Examples
///
/// ```
/// use geoprox::Coordinate;
///
/// let shell = Coordinate::new(9.0820, 7.4800);
/// assert_eq!(shell.distance_to(&shell), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        distance_meters(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Rejects non-finite components.
    ///
    /// Out-of-range but finite values are accepted: they are a caller
    /// contract violation, not something this layer polices.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidCoordinate` if either component is NaN or infinite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.latitude.is_finite() && self.longitude.is_finite() {
            Ok(())
        } else {
            Err(ValidationError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Haversine distance in meters between two latitude/longitude pairs.
///
/// Symmetric in its arguments and exactly zero for identical points.
#[must_use]
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    if lat1 == lat2 && lon1 == lon2 {
        return 0.0;
    }

    // Canonical endpoint order keeps the result bit-for-bit symmetric.
    let ((lat1, lon1), (lat2, lon2)) = if (lat1, lon1) <= (lat2, lon2) {
        ((lat1, lon1), (lat2, lon2))
    } else {
        ((lat2, lon2), (lat1, lon1))
    };

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let sin_dlat = (delta_lat / 2.0).sin();
    let sin_dlon = (delta_lon / 2.0).sin();
    let a = sin_dlat * sin_dlat + lat1_rad.cos() * lat2_rad.cos() * sin_dlon * sin_dlon;
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Human-readable distance: whole meters below 1 km, kilometers with one
/// decimal at or above.
///
/// ```
/// use geoprox::format_distance;
///
/// assert_eq!(format_distance(398.4), "398m");
/// assert_eq!(format_distance(1234.0), "1.2km");
/// ```
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round())
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}
