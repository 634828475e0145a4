//! Search ranking engine
//!
//! Candidate retrieval, multi-strategy fuzzy scoring, priority-based ordering
//! and spatial-distance blending into one suggestion list.

pub mod engine;
pub mod fuzzy;
pub mod parser;
pub mod ranking;
pub mod retriever;


pub use engine::SearchEngine;
pub use fuzzy::{LexicalScorer, StrategyScores};
pub use parser::{IntentExtractor, KeywordIntentExtractor, SearchIntent};
pub use ranking::{AutocompleteEntry, CandidateResult, CandidateSource, RankComposer, SearchEntry};
pub use retriever::{CandidateRetriever, RawCandidate, RetrievalFilters};
