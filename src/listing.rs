//! Listing records as owned by the external store
//!
//! The engine only ever reads these; they are snapshots taken per request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Property type of a listing.
///
/// Closed set of known types plus a catch-all that keeps the stored tag as
/// written, so the original value survives into the output. Tags compare by
/// [`PropertyType::key`], so `" House"` and `house` are the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    Apartment,
    House,
    Condominium,
    Other(String),
}

impl PropertyType {
    /// Stored and serialized tag
    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Condominium => "condominium",
            PropertyType::Other(tag) => tag,
        }
    }

    /// Trimmed, lower-cased tag used for type filtering
    pub fn key(&self) -> String {
        tag_key(self.as_str())
    }

    /// Whether `self` and `other` name the same type
    pub fn same_kind(&self, other: &PropertyType) -> bool {
        self.key() == other.key()
    }

    /// Rank used as the primary sort key; lower is preferred.
    pub fn priority(&self) -> u8 {
        match self {
            PropertyType::Apartment => 1,
            PropertyType::House => 2,
            PropertyType::Condominium => 3,
            PropertyType::Other(_) => 4,
        }
    }
}

/// Folded form of a stored tag. The SQLite store registers the same folding
/// so both backends filter identically.
pub fn tag_key(tag: &str) -> String {
    tag.trim().to_lowercase()
}

impl From<&str> for PropertyType {
    fn from(tag: &str) -> Self {
        match tag_key(tag).as_str() {
            "apartment" => PropertyType::Apartment,
            "house" => PropertyType::House,
            "condominium" => PropertyType::Condominium,
            _ => PropertyType::Other(tag.to_string()),
        }
    }
}

impl From<String> for PropertyType {
    fn from(tag: String) -> Self {
        PropertyType::from(tag.as_str())
    }
}

impl From<PropertyType> for String {
    fn from(kind: PropertyType) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for PropertyType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PropertyType::from(s))
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// A listing as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub title: String,
    pub property_type: PropertyType,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    /// Sale or rent; carried through storage but not used for ranking
    #[serde(default)]
    pub listing_type: Option<String>,
}

impl ListingRecord {
    pub fn new(title: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            title: title.into(),
            property_type,
            location: None,
            listing_type: None,
        }
    }

    pub fn at(mut self, longitude: f64, latitude: f64) -> Self {
        self.location = Some(GeoPoint::new(longitude, latitude));
        self
    }

    pub fn summary(&self) -> ListingSummary {
        ListingSummary {
            title: self.title.clone(),
            property_type: self.property_type.clone(),
        }
    }
}

/// Title and type pair, the unit every retrieval returns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingSummary {
    pub title: String,
    pub property_type: PropertyType,
}

/// Spatial hit with its distance from the query point
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyListing {
    pub listing: ListingSummary,
    pub distance_meters: f64,
}
