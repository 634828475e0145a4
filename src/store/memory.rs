//! In-memory listing snapshot
//!
//! Backs the CLI `--listings` mode and the engine tests. The outage switch
//! makes every call fail with [`StoreError::Unavailable`].

use super::{ListingStore, StoreError};
use crate::geo::haversine_meters;
use crate::listing::{GeoPoint, ListingRecord, ListingSummary, NearbyListing, PropertyType};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

#[derive(Debug)]
pub struct MemoryStore {
    records: Vec<ListingRecord>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new(records: Vec<ListingRecord>) -> Self {
        Self {
            records,
            offline: AtomicBool::new(false),
        }
    }

    /// Load a JSON array of listing records
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let data = fs::read_to_string(path).map_err(|e| {
            StoreError::Unavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let records: Vec<ListingRecord> = serde_json::from_str(&data).map_err(|e| {
            StoreError::Unavailable(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        debug!("Loaded {} listings from {}", records.len(), path.display());
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    /// Simulate a storage outage
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

fn type_allowed(kind: &PropertyType, types: Option<&[PropertyType]>) -> bool {
    types.is_none_or(|allowed| allowed.iter().any(|t| t.same_kind(kind)))
}

/// Deduplicate (title, type) pairs, ordered like `ORDER BY title, property_type`
fn distinct_sorted(summaries: impl Iterator<Item = ListingSummary>) -> Vec<ListingSummary> {
    let unique: BTreeSet<(String, String)> = summaries
        .map(|s| (s.title, s.property_type.as_str().to_string()))
        .collect();
    unique
        .into_iter()
        .map(|(title, kind)| ListingSummary {
            title,
            property_type: PropertyType::from(kind),
        })
        .collect()
}

impl ListingStore for MemoryStore {
    async fn find_within(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        types: Option<&[PropertyType]>,
        limit: usize,
    ) -> Result<Vec<NearbyListing>, StoreError> {
        self.check_online()?;

        let mut hits: Vec<NearbyListing> = self
            .records
            .iter()
            .filter(|r| type_allowed(&r.property_type, types))
            .filter_map(|r| {
                let location = r.location?;
                let distance_meters = haversine_meters(center, location);
                (distance_meters <= radius_meters).then(|| NearbyListing {
                    listing: r.summary(),
                    distance_meters,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance_meters
                .total_cmp(&b.distance_meters)
                .then_with(|| a.listing.title.cmp(&b.listing.title))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn find_by_title(
        &self,
        fragment: &str,
        types: Option<&[PropertyType]>,
        limit: usize,
    ) -> Result<Vec<ListingSummary>, StoreError> {
        self.check_online()?;

        let needle = fragment.to_lowercase();
        let mut hits = distinct_sorted(
            self.records
                .iter()
                .filter(|r| type_allowed(&r.property_type, types))
                .filter(|r| r.title.to_lowercase().contains(&needle))
                .map(ListingRecord::summary),
        );
        hits.truncate(limit);
        Ok(hits)
    }

    async fn distinct_titles(&self, limit: usize) -> Result<Vec<ListingSummary>, StoreError> {
        self.check_online()?;

        let mut all = distinct_sorted(self.records.iter().map(ListingRecord::summary));
        all.truncate(limit);
        Ok(all)
    }
}
