//! Location records for the environment registry.

use serde::{Deserialize, Serialize};

/// Type of location in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Residential,
    Workplace,
    Recreation,
    Commercial,
    Other,
}

/// A place agents could gather. Capacity is informational; nothing in the
/// engine tracks occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub location_type: LocationType,
    pub capacity: u32,
}

impl Location {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location_type: LocationType,
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location_type,
            capacity,
        }
    }
}
