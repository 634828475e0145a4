//! Engine configuration
//!
//! Every field has a default, so a config file only needs the values it changes.

use crate::listing::{GeoPoint, PropertyType};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A named place that queries can refer to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Lower-case name as it appears in queries
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl Landmark {
    pub fn new(name: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            name: name.into(),
            longitude,
            latitude,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.longitude, self.latitude)
    }
}

/// Query keyword that implies one or more property types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeKeyword {
    pub keyword: String,
    pub types: Vec<PropertyType>,
}

impl TypeKeyword {
    pub fn new(keyword: impl Into<String>, types: Vec<PropertyType>) -> Self {
        Self {
            keyword: keyword.into(),
            types,
        }
    }
}

/// Tunables for retrieval, scoring and ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Autocomplete queries shorter than this yield nothing
    pub autocomplete_min_len: usize,
    /// Search queries shorter than this yield nothing
    pub search_min_len: usize,
    /// Number of suggestions returned
    pub limit: usize,
    /// Cap on substring and spatial retrieval
    pub candidate_cap: usize,
    /// Minimum lexical score for a fuzzy-only autocomplete hit
    pub fuzzy_threshold: u8,
    /// Score floor for titles found by substring match
    pub exact_match_floor: u8,
    pub default_radius_meters: f64,
    /// Cap on the distinct-title scan feeding the fuzzy pool
    pub fuzzy_pool_cap: usize,
    /// Words that mark an explicit "near a landmark" intent
    pub proximity_markers: Vec<String>,
    /// Types searched when the query names none
    pub default_property_types: Vec<PropertyType>,
    pub type_keywords: Vec<TypeKeyword>,
    /// Checked in order; the first one named in a query wins
    pub landmarks: Vec<Landmark>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autocomplete_min_len: 2,
            search_min_len: 3,
            limit: 5,
            candidate_cap: 50,
            fuzzy_threshold: 40,
            exact_match_floor: 70,
            default_radius_meters: 5_000.0,
            fuzzy_pool_cap: 10_000,
            proximity_markers: vec!["near".to_string()],
            default_property_types: vec![
                PropertyType::Apartment,
                PropertyType::House,
                PropertyType::Condominium,
            ],
            type_keywords: vec![
                TypeKeyword::new(
                    "condo",
                    vec![PropertyType::Apartment, PropertyType::Condominium],
                ),
                TypeKeyword::new("apartment", vec![PropertyType::Apartment]),
                TypeKeyword::new("house", vec![PropertyType::House]),
            ],
            landmarks: vec![
                Landmark::new("mrt surian", 101.594, 3.150),
                Landmark::new("mrt sungai buloh", 101.578, 3.206),
            ],
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// With no explicit path the platform config file is tried, and defaults
    /// are used if it does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        settings.validate()?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Reject settings that would make every request return nothing.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            bail!("limit must be at least 1");
        }
        if self.candidate_cap == 0 || self.fuzzy_pool_cap == 0 {
            bail!("candidate_cap and fuzzy_pool_cap must be at least 1");
        }
        if self.fuzzy_threshold > 100 || self.exact_match_floor > 100 {
            bail!("score thresholds must be within 0..=100");
        }
        if !(self.default_radius_meters.is_finite() && self.default_radius_meters > 0.0) {
            bail!("default_radius_meters must be a positive number");
        }
        Ok(())
    }
}

/// `<config dir>/listing-search/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("listing-search").join("config.json"))
}
