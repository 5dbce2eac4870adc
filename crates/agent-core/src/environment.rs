//! Environment registry
//!
//! Keyed lookup of the places agents can be. Seeded once; the engine only
//! reads it.

use std::collections::BTreeMap;

use agent_model::{Location, LocationType};

#[derive(Debug, Clone, Default)]
pub struct LocationRegistry {
    locations: BTreeMap<String, Location>,
}

impl LocationRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with home, office, park and cafe
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.add(Location::new("home", "Home", LocationType::Residential, 4));
        registry.add(Location::new("office", "Office Building", LocationType::Workplace, 50));
        registry.add(Location::new("park", "Central Park", LocationType::Recreation, 100));
        registry.add(Location::new("cafe", "Coffee Shop", LocationType::Commercial, 20));
        registry
    }

    /// Register a location, replacing any with the same id
    pub fn add(&mut self, location: Location) {
        self.locations.insert(location.id.clone(), location);
    }

    pub fn get(&self, location_id: &str) -> Option<&Location> {
        self.locations.get(location_id)
    }

    /// All locations, ordered by id
    pub fn all(&self) -> Vec<Location> {
        self.locations.values().cloned().collect()
    }

    pub fn of_type(&self, location_type: LocationType) -> Vec<&Location> {
        self.locations
            .values()
            .filter(|l| l.location_type == location_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
