//! Rank composition
//!
//! Merges candidates from every retrieval source, keeps one per title, orders
//! them by `(priority, lexical score desc, distance asc)` and truncates.

use crate::geo::round_centimeters;
use crate::listing::PropertyType;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Where a candidate came from.
///
/// Declaration order is fidelity order: when two candidates share a title the
/// earlier source wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CandidateSource {
    /// Case-insensitive substring match on the title
    Substring,
    /// Spatial proximity to a landmark
    Spatial,
    /// Fuzzy pool; admitted by lexical score alone
    Fuzzy,
}

/// A scored candidate awaiting ranking
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub title: String,
    pub property_type: PropertyType,
    /// 0..=100
    pub lexical_score: u8,
    pub priority: u8,
    pub distance_meters: Option<f64>,
    pub source: CandidateSource,
    /// Position in retrieval order, the final tie-break
    pub retrieval_order: usize,
}

impl CandidateResult {
    pub fn new(
        title: impl Into<String>,
        property_type: PropertyType,
        lexical_score: u8,
        source: CandidateSource,
        retrieval_order: usize,
    ) -> Self {
        let priority = property_type.priority();
        Self {
            title: title.into(),
            property_type,
            lexical_score,
            priority,
            distance_meters: None,
            source,
            retrieval_order,
        }
    }

    pub fn with_distance(mut self, distance_meters: f64) -> Self {
        self.distance_meters = Some(distance_meters);
        self
    }

    /// Composite ranking order; total because `retrieval_order` is unique
    /// within one request.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.lexical_score.cmp(&self.lexical_score))
            .then_with(|| {
                let a = self.distance_meters.unwrap_or(f64::INFINITY);
                let b = other.distance_meters.unwrap_or(f64::INFINITY);
                a.total_cmp(&b)
            })
            .then_with(|| self.retrieval_order.cmp(&other.retrieval_order))
    }

    /// Whether `self` should replace `other` as the survivor for their title
    fn supersedes(&self, other: &Self) -> bool {
        match self.source.cmp(&other.source) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.rank_cmp(other) == Ordering::Less,
        }
    }
}

/// Autocomplete output entry: `{title, type, score}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutocompleteEntry {
    pub title: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub score: u8,
}

impl From<CandidateResult> for AutocompleteEntry {
    fn from(candidate: CandidateResult) -> Self {
        Self {
            title: candidate.title,
            property_type: candidate.property_type,
            score: candidate.lexical_score,
        }
    }
}

/// Search output entry: `{title, type, distance_meters}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEntry {
    pub title: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Rounded to centimeters; `null` for text-only searches
    pub distance_meters: Option<f64>,
}

impl From<CandidateResult> for SearchEntry {
    fn from(candidate: CandidateResult) -> Self {
        Self {
            title: candidate.title,
            property_type: candidate.property_type,
            distance_meters: candidate.distance_meters.map(round_centimeters),
        }
    }
}

/// Dedup, sort, truncate, project
#[derive(Debug, Clone, Copy)]
pub struct RankComposer {
    limit: usize,
}

impl Default for RankComposer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl RankComposer {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Keep one candidate per title, then order and truncate.
    pub fn rank(&self, candidates: Vec<CandidateResult>) -> Vec<CandidateResult> {
        let mut survivors: Vec<CandidateResult> = Vec::with_capacity(candidates.len());
        let mut by_title: HashMap<String, usize> = HashMap::new();

        for candidate in candidates {
            match by_title.get(&candidate.title) {
                Some(&idx) => {
                    if candidate.supersedes(&survivors[idx]) {
                        survivors[idx] = candidate;
                    }
                }
                None => {
                    by_title.insert(candidate.title.clone(), survivors.len());
                    survivors.push(candidate);
                }
            }
        }

        survivors.sort_by(CandidateResult::rank_cmp);
        survivors.truncate(self.limit);
        survivors
    }

    /// [`rank`](Self::rank) and project to an output entry type
    pub fn compose<E>(&self, candidates: Vec<CandidateResult>) -> Vec<E>
    where
        E: From<CandidateResult>,
    {
        self.rank(candidates).into_iter().map(E::from).collect()
    }
}
