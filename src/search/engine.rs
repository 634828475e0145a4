//! Search Engine Integration
//!
//! Ties together intent extraction, candidate retrieval, lexical scoring and
//! rank composition behind the two request-shaped entry points.
//!
//! Each request is a pure function of the query, its filters and the store
//! snapshot; the engine holds no per-request state and needs no locking.

use super::fuzzy::LexicalScorer;
use super::parser::{IntentExtractor, KeywordIntentExtractor};
use super::ranking::{AutocompleteEntry, CandidateResult, RankComposer, SearchEntry};
use super::retriever::{CandidateRetriever, RetrievalFilters};
use crate::config::{Landmark, Settings};
use crate::error::{validate_query, SearchError};
use crate::store::ListingStore;
use anyhow::Result;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct SearchEngine<S, I = KeywordIntentExtractor> {
    store: S,
    intents: I,
    scorer: LexicalScorer,
    composer: RankComposer,
    settings: Settings,
}

impl<S: ListingStore> SearchEngine<S> {
    /// Engine with the keyword intent extractor built from `settings`
    pub fn new(store: S, settings: Settings) -> Result<Self> {
        let intents = KeywordIntentExtractor::from_settings(&settings)?;
        Ok(Self::with_intents(store, intents, settings))
    }
}

impl<S: ListingStore, I: IntentExtractor> SearchEngine<S, I> {
    pub fn with_intents(store: S, intents: I, settings: Settings) -> Self {
        Self {
            store,
            intents,
            scorer: LexicalScorer::new(),
            composer: RankComposer::new(settings.limit),
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn retriever(&self) -> CandidateRetriever<'_, S> {
        CandidateRetriever::new(
            &self.store,
            self.settings.candidate_cap,
            self.settings.default_radius_meters,
            self.settings.fuzzy_pool_cap,
        )
    }

    /// Typo-tolerant title suggestions.
    ///
    /// Never fails: rejected queries and store failures yield an empty list.
    pub async fn autocomplete(&self, query: &str) -> Vec<AutocompleteEntry> {
        debug!("[autocomplete] received '{}'", query);
        let started = Instant::now();
        let result = self.try_autocomplete(query).await;
        Self::settle("autocomplete", query, started, result)
    }

    /// Ranked listings for a free-text query, near a landmark when one is named.
    ///
    /// Never fails: rejected queries, unresolvable landmarks and store failures
    /// yield an empty list.
    pub async fn search(&self, query: &str) -> Vec<SearchEntry> {
        debug!("[search] received '{}'", query);
        let started = Instant::now();
        let result = self.try_search(query).await;
        Self::settle("search", query, started, result)
    }

    fn settle<E>(
        operation: &str,
        query: &str,
        started: Instant,
        result: Result<Vec<E>, SearchError>,
    ) -> Vec<E> {
        match result {
            Ok(entries) => {
                info!(
                    "[{}] '{}' -> {} suggestions in {:?}",
                    operation,
                    query,
                    entries.len(),
                    started.elapsed()
                );
                entries
            }
            Err(SearchError::ValidationRejected(reason)) => {
                debug!("[{}] '{}' rejected: {}", operation, query, reason);
                Vec::new()
            }
            Err(err) => {
                warn!(
                    code = err.error_code(),
                    "[{}] '{}' failed, returning no suggestions: {}", operation, query, err
                );
                Vec::new()
            }
        }
    }

    /// Autocomplete with errors surfaced
    pub async fn try_autocomplete(
        &self,
        query: &str,
    ) -> Result<Vec<AutocompleteEntry>, SearchError> {
        validate_query(query, self.settings.autocomplete_min_len)?;
        let query = query.trim();
        let retriever = self.retriever();

        let retrieval_started = Instant::now();
        let substring_hits = retriever
            .retrieve(query, &RetrievalFilters::default())
            .await?;
        let pool = retriever.fuzzy_pool().await?;
        debug!(
            "Retrieved {} substring hits and {} pool titles in {:?}",
            substring_hits.len(),
            pool.len(),
            retrieval_started.elapsed()
        );

        let scoring_started = Instant::now();
        let mut candidates: Vec<CandidateResult> = Vec::new();
        let mut exact_titles: HashSet<String> = HashSet::new();

        for hit in substring_hits {
            let score = self
                .scorer
                .score(query, &hit.title)
                .max(self.settings.exact_match_floor);
            exact_titles.insert(hit.title.clone());
            let order = candidates.len();
            candidates.push(CandidateResult::new(
                hit.title,
                hit.property_type,
                score,
                hit.source,
                order,
            ));
        }

        let mut admitted = 0usize;
        for hit in pool {
            if exact_titles.contains(&hit.title) {
                continue;
            }
            let score = self.scorer.score(query, &hit.title);
            if score < self.settings.fuzzy_threshold {
                continue;
            }
            admitted += 1;
            let order = candidates.len();
            candidates.push(CandidateResult::new(
                hit.title,
                hit.property_type,
                score,
                hit.source,
                order,
            ));
        }
        debug!(
            "Admitted {} fuzzy candidates (threshold {}) in {:?}",
            admitted,
            self.settings.fuzzy_threshold,
            scoring_started.elapsed()
        );

        Ok(self.composer.compose(candidates))
    }

    /// Search with errors surfaced
    pub async fn try_search(&self, query: &str) -> Result<Vec<SearchEntry>, SearchError> {
        validate_query(query, self.settings.search_min_len)?;

        let intent = self.intents.extract(query);
        debug!(
            "Detected property types {:?} for '{}'",
            intent.property_types, intent.query
        );

        match &intent.landmark {
            Some(landmark) => info!(
                "Detected landmark '{}' at ({}, {})",
                landmark.name, landmark.longitude, landmark.latitude
            ),
            None if intent.proximity_requested => {
                info!("No known landmark in '{}', returning no suggestions", intent.query);
                return Ok(Vec::new());
            }
            None => debug!("No landmark detected, using text search"),
        }

        let filters = RetrievalFilters {
            property_types: (!intent.property_types.is_empty())
                .then(|| intent.property_types.clone()),
            near: intent.landmark.as_ref().map(Landmark::point),
            radius_meters: None,
        };

        let retrieval_started = Instant::now();
        let raw = self.retriever().retrieve(&intent.query, &filters).await?;
        debug!(
            "Retrieved {} candidates in {:?}",
            raw.len(),
            retrieval_started.elapsed()
        );

        let candidates = raw
            .into_iter()
            .enumerate()
            .map(|(order, hit)| {
                let score = self.scorer.score(&intent.query, &hit.title);
                let candidate =
                    CandidateResult::new(hit.title, hit.property_type, score, hit.source, order);
                match hit.distance_meters {
                    Some(distance) => candidate.with_distance(distance),
                    None => candidate,
                }
            })
            .collect();

        Ok(self.composer.compose(candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{ListingRecord, PropertyType};
    use crate::search::parser::SearchIntent;
    use crate::store::{MemoryStore, SqliteStore};

    fn listings() -> Vec<ListingRecord> {
        vec![
            ListingRecord::new("Luxury Apartment KLCC", PropertyType::Apartment).at(101.712, 3.158),
            ListingRecord::new("Mont Kiara Condominium", PropertyType::Condominium),
            ListingRecord::new("Mont Kiara Bungalow", PropertyType::House),
            ListingRecord::new("Surian Residences", PropertyType::Condominium).at(101.595, 3.151),
            ListingRecord::new("Surian Heights Apartment", PropertyType::Apartment)
                .at(101.597, 3.153),
            ListingRecord::new("Kota Damansara Terrace", PropertyType::House).at(101.600, 3.160),
            ListingRecord::new("Damansara Office Suite", PropertyType::from("office"))
                .at(101.596, 3.151),
            ListingRecord::new("Sungai Buloh Semi-D", PropertyType::House).at(101.578, 3.206),
        ]
    }

    fn engine() -> SearchEngine<MemoryStore> {
        SearchEngine::new(MemoryStore::new(listings()), Settings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_autocomplete_rejects_short_query() {
        let engine = engine();
        assert!(engine.autocomplete("m").await.is_empty());
        assert!(engine.autocomplete("  ").await.is_empty());
        assert!(matches!(
            engine.try_autocomplete("m").await,
            Err(SearchError::ValidationRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_autocomplete_misspelling() {
        let engine = engine();
        let results = engine.autocomplete("apartmnt").await;
        let hit = results
            .iter()
            .find(|e| e.title == "Luxury Apartment KLCC")
            .expect("misspelled apartment should match");
        assert!(hit.score >= 40);
        assert_eq!(hit.property_type.priority(), 1);
    }

    #[tokio::test]
    async fn test_autocomplete_substring_floor() {
        let engine = engine();
        let results = engine.autocomplete("kl").await;
        let hit = results
            .iter()
            .find(|e| e.title == "Luxury Apartment KLCC")
            .unwrap();
        assert!(hit.score >= 70);
    }

    #[tokio::test]
    async fn test_autocomplete_priority_before_score() {
        let settings = Settings {
            limit: 10,
            ..Settings::default()
        };
        let engine = SearchEngine::new(MemoryStore::new(listings()), settings).unwrap();
        let results = engine.autocomplete("mont kiara").await;
        let titles: Vec<&str> = results.iter().map(|e| e.title.as_str()).collect();
        // the house outranks the condominium although both are exact substring hits
        let bungalow = titles.iter().position(|t| *t == "Mont Kiara Bungalow").unwrap();
        let condo = titles.iter().position(|t| *t == "Mont Kiara Condominium").unwrap();
        assert!(bungalow < condo);
        assert!(results
            .windows(2)
            .all(|w| w[0].property_type.priority() <= w[1].property_type.priority()));
    }

    #[tokio::test]
    async fn test_autocomplete_word_order() {
        let engine = engine();
        let results = engine.autocomplete("kiara mont").await;
        assert!(results.iter().any(|e| e.title.starts_with("Mont Kiara")));
    }

    #[tokio::test]
    async fn test_autocomplete_admits_overhanging_fuzzy_match() {
        let store = MemoryStore::new(vec![ListingRecord::new(
            "Villa Bangsar",
            PropertyType::House,
        )]);
        let engine = SearchEngine::new(store, Settings::default()).unwrap();
        let results = engine.autocomplete("sarawakxyz").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Villa Bangsar");
        assert_eq!(results[0].score, 46);
    }

    #[tokio::test]
    async fn test_search_near_landmark() {
        let engine = engine();
        let results = engine.search("condo near mrt surian").await;

        // condo maps to apartment + condominium; office and houses are excluded
        let titles: Vec<&str> = results.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Surian Heights Apartment", "Surian Residences"]);
        assert!(results
            .iter()
            .all(|e| e.distance_meters.is_some_and(|d| d <= 5_000.0)));
    }

    #[tokio::test]
    async fn test_search_near_landmark_sorted_by_distance_within_class() {
        let engine = engine();
        let results = engine.search("house near mrt surian").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Kota Damansara Terrace");
    }

    #[tokio::test]
    async fn test_search_unresolvable_landmark() {
        let engine = engine();
        assert!(engine.search("condo near atlantis").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_text_only() {
        let engine = engine();
        let results = engine.search("mont kiara").await;
        let titles: Vec<&str> = results.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Mont Kiara Bungalow", "Mont Kiara Condominium"]);
        assert!(results.iter().all(|e| e.distance_meters.is_none()));
    }

    #[tokio::test]
    async fn test_search_rejects_short_query() {
        let engine = engine();
        assert!(engine.search("mk").await.is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_yields_empty() {
        let engine = engine();
        engine.store().set_offline(true);
        assert!(engine.autocomplete("mont kiara").await.is_empty());
        assert!(engine.search("condo near mrt surian").await.is_empty());
        assert!(matches!(
            engine.try_search("mont kiara").await,
            Err(SearchError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_sqlite_database_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("missing.db"));
        let engine = SearchEngine::new(store, Settings::default()).unwrap();
        assert!(engine.autocomplete("mont kiara").await.is_empty());
        let err = engine.try_autocomplete("mont kiara").await.unwrap_err();
        assert_eq!(err.error_code(), "store_unavailable");
    }

    #[tokio::test]
    async fn test_sqlite_backed_search() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("listings.db"));
        store.create_schema().unwrap();
        store.insert(&listings()).unwrap();

        let engine = SearchEngine::new(store, Settings::default()).unwrap();
        let results = engine.search("condo near mrt surian").await;
        let titles: Vec<&str> = results.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Surian Heights Apartment", "Surian Residences"]);

        let results = engine.autocomplete("apartmnt").await;
        assert!(results.iter().any(|e| e.title == "Luxury Apartment KLCC"));
    }

    #[tokio::test]
    async fn test_search_matches_across_backends_for_capitalised_tags() {
        let rows = [
            ("Mont Kiara Villa", "House"),
            ("Mont Kiara Suites", "Condominium"),
            ("Mont Kiara Plaza", "Retail"),
        ];
        let dir = tempfile::tempdir().unwrap();
        let sqlite = SqliteStore::new(dir.path().join("listings.db"));
        sqlite.create_schema().unwrap();
        let conn = rusqlite::Connection::open(sqlite.path()).unwrap();
        for (title, tag) in &rows {
            conn.execute(
                "INSERT INTO properties (title, property_type) VALUES (?1, ?2)",
                rusqlite::params![title, tag],
            )
            .unwrap();
        }
        drop(conn);
        let memory = MemoryStore::new(
            rows.iter()
                .map(|(title, tag)| ListingRecord::new(*title, PropertyType::from(*tag)))
                .collect(),
        );

        let from_sqlite = SearchEngine::new(sqlite, Settings::default())
            .unwrap()
            .search("mont kiara")
            .await;
        let from_memory = SearchEngine::new(memory, Settings::default())
            .unwrap()
            .search("mont kiara")
            .await;

        let titles: Vec<&str> = from_sqlite.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Mont Kiara Villa", "Mont Kiara Suites"]);
        assert_eq!(from_sqlite, from_memory);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let engine = engine();
        assert_eq!(
            engine.autocomplete("damansara").await,
            engine.autocomplete("damansara").await
        );
        assert_eq!(
            engine.search("house near mrt surian").await,
            engine.search("house near mrt surian").await
        );
    }

    struct FixedIntent(SearchIntent);

    impl IntentExtractor for FixedIntent {
        fn extract(&self, _query: &str) -> SearchIntent {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_custom_intent_extractor() {
        let intent = SearchIntent {
            query: "damansara".to_string(),
            property_types: Vec::new(),
            landmark: None,
            proximity_requested: false,
        };
        let engine = SearchEngine::with_intents(
            MemoryStore::new(listings()),
            FixedIntent(intent),
            Settings::default(),
        );

        // no type restriction: the office is included
        let results = engine.search("whatever the user typed").await;
        let titles: Vec<&str> = results.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Kota Damansara Terrace", "Damansara Office Suite"]);
    }
}
