//! Reference places around Abuja used for demos, location pickers and tests.

use serde::Serialize;

use crate::geo::Coordinate;
use crate::trigger::{Frequency, TriggerSpec};

/// A named place that can be picked as a trigger center or a simulated position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct TestLocation {
    pub name: &'static str,
    pub address: &'static str,
    pub coordinates: Coordinate,
    /// Coarse kind of place ("fuel", "shopping", ...).
    pub category: &'static str,
    pub icon: &'static str,
}

const fn place(
    name: &'static str,
    address: &'static str,
    latitude: f64,
    longitude: f64,
    category: &'static str,
    icon: &'static str,
) -> TestLocation {
    TestLocation {
        name,
        address,
        coordinates: Coordinate::new(latitude, longitude),
        category,
        icon,
    }
}

/// The reference place catalog.
pub const TEST_LOCATIONS: [TestLocation; 8] = [
    place("Shell Gas Station", "Wuse II, Abuja", 9.0820, 7.4800, "fuel", "⛽"),
    place("Shoprite Mall", "Jabi, Abuja", 9.0650, 7.4200, "shopping", "🛒"),
    place("Transcorp Hilton", "Maitama, Abuja", 9.0800, 7.4900, "hotel", "🏨"),
    place("National Mosque", "Central Area, Abuja", 9.0580, 7.4910, "landmark", "🕌"),
    place("Jabi Lake Mall", "Jabi, Abuja", 9.0700, 7.4150, "shopping", "🏬"),
    place("Wuse Market", "Wuse Zone 5, Abuja", 9.0750, 7.4700, "market", "🛍️"),
    place("Gym & Fitness Center", "Garki, Abuja", 9.0400, 7.4850, "fitness", "💪"),
    place("Home", "Maitama District, Abuja", 9.0765, 7.3986, "home", "🏠"),
];

/// Where the tracked user starts before any position arrives.
pub const START_POSITION: Coordinate = Coordinate::new(9.0765, 7.3986);

/// Looks a place up by exact name.
#[must_use]
pub fn find_location(name: &str) -> Option<&'static TestLocation> {
    TEST_LOCATIONS.iter().find(|location| location.name == name)
}

impl TestLocation {
    /// A trigger spec centered on this place.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `radius` is not positive.
    pub fn trigger_spec(
        &self,
        title: &str,
        radius: f64,
        frequency: Frequency,
    ) -> Result<TriggerSpec, crate::error::ValidationError> {
        TriggerSpec::builder()
            .title(title)
            .location(self.name)
            .address(self.address)
            .icon(self.icon)
            .coordinates(self.coordinates.latitude, self.coordinates.longitude)
            .radius(radius)
            .frequency(frequency)
            .build()
    }
}

/// The two demo reminders: refuel at Shell (300 m, every visit) and groceries
/// at Shoprite (500 m, once).
///
/// # Errors
///
/// Never fails for the built-in catalog; the `Result` mirrors `trigger_spec`.
pub fn demo_trigger_specs() -> Result<Vec<TriggerSpec>, crate::error::ValidationError> {
    Ok(vec![
        TEST_LOCATIONS[0].trigger_spec("Buy fuel", 300.0, Frequency::Always)?,
        TEST_LOCATIONS[1].trigger_spec("Buy groceries", 500.0, Frequency::Once)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_location() {
        let shell = find_location("Shell Gas Station").unwrap();
        assert_eq!(shell.coordinates, Coordinate::new(9.0820, 7.4800));
        assert!(find_location("Nowhere").is_none());
    }

    #[test]
    fn test_start_position_is_home() {
        assert_eq!(find_location("Home").unwrap().coordinates, START_POSITION);
    }

    #[test]
    fn test_demo_specs() {
        let specs = demo_trigger_specs().unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].frequency, Frequency::Always);
        assert_eq!(specs[0].radius, 300.0);
        assert_eq!(specs[1].frequency, Frequency::Once);
        assert_eq!(specs[1].location.as_deref(), Some("Shoprite Mall"));
    }
}
