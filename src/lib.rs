//! listing-search: ranking engine for property listing suggestions
//!
//! Two entry points share one ranking core:
//! - [`SearchEngine::autocomplete`] - typo-tolerant title suggestions
//! - [`SearchEngine::search`] - free-text search, ranked by distance when the
//!   query names a known landmark
//!
//! Both always return a (possibly empty) list; storage failures are logged and
//! downgraded to "no suggestions".

pub mod config;
pub mod error;
pub mod geo;
pub mod listing;
pub mod search;
pub mod store;

pub use config::Settings;
pub use error::SearchError;
pub use listing::{GeoPoint, ListingRecord, PropertyType};
pub use search::{AutocompleteEntry, SearchEngine, SearchEntry};
pub use store::{Backend, ListingStore, MemoryStore, SqliteStore, StoreError};
