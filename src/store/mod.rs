//! Listing storage capability
//!
//! The ranking engine never talks to a database directly. It calls a
//! [`ListingStore`], which owns its own connection discipline.

pub mod memory;
pub mod sqlite;

use crate::listing::{GeoPoint, ListingSummary, NearbyListing, PropertyType};
use std::future::Future;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or setup failure
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Failure while running a retrieval
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl StoreError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "store_unavailable",
            StoreError::QueryFailed(_) => "query_failed",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}

/// Read-only retrieval operations over listings.
///
/// `types`, when given, restricts results to those property types. All
/// operations are bounded by `limit`.
pub trait ListingStore: Send + Sync {
    /// Listings with a location within `radius_meters` of `center`, nearest first.
    fn find_within(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        types: Option<&[PropertyType]>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<NearbyListing>, StoreError>> + Send;

    /// Distinct listings whose title contains `fragment`, case-insensitively,
    /// ordered by title.
    fn find_by_title(
        &self,
        fragment: &str,
        types: Option<&[PropertyType]>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ListingSummary>, StoreError>> + Send;

    /// Distinct (title, type) pairs ordered by title.
    fn distinct_titles(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ListingSummary>, StoreError>> + Send;
}

/// Store selected at startup
#[derive(Debug)]
pub enum Backend {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl ListingStore for Backend {
    async fn find_within(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        types: Option<&[PropertyType]>,
        limit: usize,
    ) -> Result<Vec<NearbyListing>, StoreError> {
        match self {
            Backend::Sqlite(store) => store.find_within(center, radius_meters, types, limit).await,
            Backend::Memory(store) => store.find_within(center, radius_meters, types, limit).await,
        }
    }

    async fn find_by_title(
        &self,
        fragment: &str,
        types: Option<&[PropertyType]>,
        limit: usize,
    ) -> Result<Vec<ListingSummary>, StoreError> {
        match self {
            Backend::Sqlite(store) => store.find_by_title(fragment, types, limit).await,
            Backend::Memory(store) => store.find_by_title(fragment, types, limit).await,
        }
    }

    async fn distinct_titles(&self, limit: usize) -> Result<Vec<ListingSummary>, StoreError> {
        match self {
            Backend::Sqlite(store) => store.distinct_titles(limit).await,
            Backend::Memory(store) => store.distinct_titles(limit).await,
        }
    }
}
