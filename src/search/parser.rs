//! Query intent extraction
//!
//! Turns a free-text search query into the parameters the ranking engine
//! needs: the normalized query, the property types to search, and an optional
//! landmark. The engine only depends on [`IntentExtractor`]; the keyword
//! implementation here is the default, not the only choice.

use crate::config::{Landmark, Settings, TypeKeyword};
use crate::listing::PropertyType;
use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use unicode_segmentation::UnicodeSegmentation;

/// Parameters extracted from a search query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchIntent {
    /// Lower-cased, whitespace-collapsed query
    pub query: String,
    /// Types to restrict retrieval to; never empty for keyword extraction
    pub property_types: Vec<PropertyType>,
    pub landmark: Option<Landmark>,
    /// The query explicitly asked for proximity ("near ...")
    pub proximity_requested: bool,
}

pub trait IntentExtractor: Send + Sync {
    fn extract(&self, query: &str) -> SearchIntent;
}

/// Keyword and landmark-name matching over the lower-cased query
pub struct KeywordIntentExtractor {
    type_keywords: Vec<TypeKeyword>,
    keyword_matcher: AhoCorasick,
    landmarks: Vec<Landmark>,
    landmark_matcher: AhoCorasick,
    proximity_markers: Vec<String>,
    default_types: Vec<PropertyType>,
}

impl KeywordIntentExtractor {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let keyword_matcher = AhoCorasick::new(
            settings
                .type_keywords
                .iter()
                .map(|k| k.keyword.to_lowercase()),
        )
        .context("Failed to build property type keyword matcher")?;

        let landmark_matcher =
            AhoCorasick::new(settings.landmarks.iter().map(|l| l.name.to_lowercase()))
                .context("Failed to build landmark matcher")?;

        Ok(Self {
            type_keywords: settings.type_keywords.clone(),
            keyword_matcher,
            landmarks: settings.landmarks.clone(),
            landmark_matcher,
            proximity_markers: settings
                .proximity_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            default_types: settings.default_property_types.clone(),
        })
    }

    /// Collapse whitespace and lower-case
    pub fn normalize(query: &str) -> String {
        query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    fn matched_patterns(matcher: &AhoCorasick, text: &str) -> BTreeSet<usize> {
        matcher
            .find_overlapping_iter(text)
            .map(|m| m.pattern().as_usize())
            .collect()
    }

    fn detect_types(&self, query: &str) -> Vec<PropertyType> {
        let matched = Self::matched_patterns(&self.keyword_matcher, query);

        let mut types: Vec<PropertyType> = Vec::new();
        for id in matched {
            for kind in &self.type_keywords[id].types {
                if !types.contains(kind) {
                    types.push(kind.clone());
                }
            }
        }

        if types.is_empty() {
            self.default_types.clone()
        } else {
            types
        }
    }

    fn detect_landmark(&self, query: &str) -> Option<Landmark> {
        Self::matched_patterns(&self.landmark_matcher, query)
            .into_iter()
            .next()
            .map(|id| self.landmarks[id].clone())
    }

    fn mentions_proximity(&self, query: &str) -> bool {
        query
            .unicode_words()
            .any(|word| self.proximity_markers.iter().any(|m| m == word))
    }
}

impl IntentExtractor for KeywordIntentExtractor {
    fn extract(&self, query: &str) -> SearchIntent {
        let query = Self::normalize(query);

        SearchIntent {
            property_types: self.detect_types(&query),
            landmark: self.detect_landmark(&query),
            proximity_requested: self.mentions_proximity(&query),
            query,
        }
    }
}
