use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationId(pub u64);

impl LocationId {
    pub fn new(id: u64) -> Self {
        LocationId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for LocationId {
    fn from(id: u64) -> Self {
        LocationId(id)
    }
}

/// Location as handed over by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl LocationRecord {
    pub fn new(id: impl Into<LocationId>, latitude: f64, longitude: f64) -> Self {
        LocationRecord {
            id: id.into(),
            latitude,
            longitude,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }
}

/// Search filters forwarded to the precise spatial query. Ordered so that
/// equal filter sets always serialize identically.
pub type Filters = BTreeMap<String, serde_json::Value>;

/// Raw weather event: arbitrary JSON with optional `temperature`,
/// `wind_speed` and `precipitation` fields
pub type EventRecord = serde_json::Value;
