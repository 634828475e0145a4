//! Candidate retrieval
//!
//! Fetches bounded candidate sets from a [`ListingStore`]: spatial when a point
//! is given, substring otherwise, plus the capped distinct-title scan that feeds
//! fuzzy matching.

use super::ranking::CandidateSource;
use crate::listing::{GeoPoint, PropertyType};
use crate::store::{ListingStore, StoreError};
use tracing::debug;

/// Structured filters supplied alongside the query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalFilters {
    pub property_types: Option<Vec<PropertyType>>,
    pub near: Option<GeoPoint>,
    /// Defaults to the retriever's configured radius
    pub radius_meters: Option<f64>,
}

/// Unscored retrieval hit
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub title: String,
    pub property_type: PropertyType,
    pub distance_meters: Option<f64>,
    pub source: CandidateSource,
}

pub struct CandidateRetriever<'a, S> {
    store: &'a S,
    candidate_cap: usize,
    default_radius_meters: f64,
    fuzzy_pool_cap: usize,
}

impl<'a, S: ListingStore> CandidateRetriever<'a, S> {
    pub fn new(
        store: &'a S,
        candidate_cap: usize,
        default_radius_meters: f64,
        fuzzy_pool_cap: usize,
    ) -> Self {
        Self {
            store,
            candidate_cap,
            default_radius_meters,
            fuzzy_pool_cap,
        }
    }

    /// Spatial candidates when `filters.near` is set, substring candidates otherwise.
    pub async fn retrieve(
        &self,
        query: &str,
        filters: &RetrievalFilters,
    ) -> Result<Vec<RawCandidate>, StoreError> {
        let types = filters.property_types.as_deref();

        match filters.near {
            Some(center) => {
                let radius = filters.radius_meters.unwrap_or(self.default_radius_meters);
                let hits = self
                    .store
                    .find_within(center, radius, types, self.candidate_cap)
                    .await?;
                debug!(
                    "Spatial retrieval within {}m of ({}, {}): {} candidates",
                    radius,
                    center.longitude,
                    center.latitude,
                    hits.len()
                );
                Ok(hits
                    .into_iter()
                    .map(|hit| RawCandidate {
                        title: hit.listing.title,
                        property_type: hit.listing.property_type,
                        distance_meters: Some(hit.distance_meters),
                        source: CandidateSource::Spatial,
                    })
                    .collect())
            }
            None => {
                let hits = self
                    .store
                    .find_by_title(query, types, self.candidate_cap)
                    .await?;
                debug!("Substring retrieval for '{}': {} candidates", query, hits.len());
                Ok(hits
                    .into_iter()
                    .map(|hit| RawCandidate {
                        title: hit.title,
                        property_type: hit.property_type,
                        distance_meters: None,
                        source: CandidateSource::Substring,
                    })
                    .collect())
            }
        }
    }

    /// Distinct (title, type) universe for typo-tolerant matching, capped.
    pub async fn fuzzy_pool(&self) -> Result<Vec<RawCandidate>, StoreError> {
        let pool = self.store.distinct_titles(self.fuzzy_pool_cap).await?;
        if pool.len() >= self.fuzzy_pool_cap {
            debug!(
                "Fuzzy pool reached its cap of {} titles; later titles are not considered",
                self.fuzzy_pool_cap
            );
        }
        Ok(pool
            .into_iter()
            .map(|listing| RawCandidate {
                title: listing.title,
                property_type: listing.property_type,
                distance_meters: None,
                source: CandidateSource::Fuzzy,
            })
            .collect())
    }
}
