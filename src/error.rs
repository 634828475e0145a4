//! Error types and request validation for the ranking engine

use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the ranking engine.
///
/// None of these ever reach an end caller: the public entry points downgrade
/// every variant to an empty suggestion list after logging it.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Validation rejected: {0}")]
    ValidationRejected(String),
}

impl SearchError {
    /// Stable code used in operator logs
    pub fn error_code(&self) -> &'static str {
        match self {
            SearchError::Store(err) => err.error_code(),
            SearchError::ValidationRejected(_) => "validation_rejected",
        }
    }
}

/// Reject queries shorter than `min_len` characters.
///
/// Length is counted in Unicode scalar values after trimming.
pub fn validate_query(query: &str, min_len: usize) -> Result<(), SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::ValidationRejected(
            "Query cannot be empty".to_string(),
        ));
    }

    let len = trimmed.chars().count();
    if len < min_len {
        return Err(SearchError::ValidationRejected(format!(
            "Query too short, minimum {} characters (got {})",
            min_len, len
        )));
    }

    Ok(())
}
