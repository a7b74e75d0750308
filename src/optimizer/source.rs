use std::collections::HashSet;
use parking_lot::RwLock;
use crate::core::error::Result;
use crate::core::types::{Filters, LocationId, LocationRecord};

/// Mean Earth radius used for great-circle distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Precise spatial query provided by the persistence layer (e.g. a
/// PostGIS-backed radius search). May be slow; callers must not hold locks
/// across it.
pub trait SpatialSource: Send + Sync {
    /// Locations within `radius_km` of the centre that match `filters`.
    /// When `candidates` is given only those ids need to be considered;
    /// `None` searches everything.
    fn find_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        filters: &Filters,
        candidates: Option<&[LocationId]>,
    ) -> Result<Vec<LocationRecord>>;
}

/// Great-circle distance in kilometres (haversine)
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Vector-backed `SpatialSource` with exact haversine filtering.
/// Filters match when every filter key equals the record attribute of the
/// same name. Results are ordered nearest first.
#[derive(Debug, Default)]
pub struct InMemorySource {
    records: RwLock<Vec<LocationRecord>>,
}

impl InMemorySource {
    pub fn new(records: Vec<LocationRecord>) -> Self {
        InMemorySource {
            records: RwLock::new(records),
        }
    }

    pub fn add(&self, record: LocationRecord) {
        self.records.write().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl SpatialSource for InMemorySource {
    fn find_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        filters: &Filters,
        candidates: Option<&[LocationId]>,
    ) -> Result<Vec<LocationRecord>> {
        let allowed: Option<HashSet<LocationId>> = candidates.map(|ids| ids.iter().copied().collect());
        let records = self.records.read();

        let mut matches: Vec<(f64, &LocationRecord)> = records
            .iter()
            .filter(|r| allowed.as_ref().is_none_or(|ids| ids.contains(&r.id)))
            .filter(|r| filters.iter().all(|(name, value)| r.attribute(name) == Some(value)))
            .map(|r| (haversine_km(latitude, longitude, r.latitude, r.longitude), r))
            .filter(|(distance, _)| *distance <= radius_km)
            .collect();

        matches.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(matches.into_iter().map(|(_, r)| r.clone()).collect())
    }
}
