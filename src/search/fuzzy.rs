//! Lexical similarity scoring
//!
//! Three edit-distance based strategies, each yielding an integer in 0..=100:
//!
//! - **ratio**: whole-string similarity, `(len_a + len_b - indel) / (len_a + len_b)`
//!   where `indel` is the insertion/deletion distance (substitution costs 2)
//! - **partial ratio**: best ratio of the shorter string against the windows of
//!   the longer one, including the partial windows at either end
//! - **token-sort ratio**: ratio of the word tokens sorted alphabetically
//!
//! A title's lexical score is the maximum of the three.

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Per-strategy scores for one query/title pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategyScores {
    pub ratio: u8,
    pub partial_ratio: u8,
    pub token_sort_ratio: u8,
}

impl StrategyScores {
    pub fn best(&self) -> u8 {
        self.ratio.max(self.partial_ratio).max(self.token_sort_ratio)
    }
}

/// Stateless scorer; case and Unicode composition are normalized before comparing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalScorer;

impl LexicalScorer {
    pub fn new() -> Self {
        Self
    }

    /// Best-of-three similarity between `query` and `title`
    pub fn score(&self, query: &str, title: &str) -> u8 {
        self.breakdown(query, title).best()
    }

    /// All three strategy scores
    pub fn breakdown(&self, query: &str, title: &str) -> StrategyScores {
        let query = normalize_for_matching(query);
        let title = normalize_for_matching(title);

        StrategyScores {
            ratio: ratio(&query, &title),
            partial_ratio: partial_ratio(&query, &title),
            token_sort_ratio: token_sort_ratio(&query, &title),
        }
    }

    /// Case-insensitive substring check
    pub fn contains(&self, haystack: &str, needle: &str) -> bool {
        if needle.is_empty() {
            return false;
        }
        normalize_for_matching(haystack).contains(&normalize_for_matching(needle))
    }
}

/// NFC composition then lower-casing
fn normalize_for_matching(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

/// Length of the longest common subsequence
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // single row, indexed by position in `b`
    let mut row = vec![0usize; b.len() + 1];
    for &ac in a {
        let mut diag = 0;
        for (j, &bc) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ac == bc {
                diag + 1
            } else {
                above.max(row[j])
            };
            diag = above;
        }
    }
    row[b.len()]
}

/// Raw similarity in 0.0..=1.0; zero when either side is empty
fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let indel = total - 2 * lcs_len(a, b);
    (total - indel) as f64 / total as f64
}

/// Percent, rounding exact halves to even
fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round_ties_even().clamp(0.0, 100.0) as u8
}

/// Whole-string similarity
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    to_score(ratio_chars(&a, &b))
}

/// Similarity of the shorter string to its best-aligned window in the longer.
///
/// Windows are every full-length slice of the longer string plus the prefixes
/// and suffixes shorter than the needle, so a query hanging over either end of
/// the title still aligns.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let best = if a.len() < b.len() {
        best_window(&a, &b)
    } else if b.len() < a.len() {
        best_window(&b, &a)
    } else {
        best_window(&a, &b).max(best_window(&b, &a))
    };
    to_score(best)
}

/// Best raw similarity of `needle` against the windows of `haystack`
fn best_window(needle: &[char], haystack: &[char]) -> f64 {
    let edge = needle.len().min(haystack.len());

    let prefixes = (1..edge).map(|i| &haystack[..i]);
    let full = (0..=(haystack.len() - edge)).map(|start| &haystack[start..start + edge]);
    let suffixes = (1..edge).map(|i| &haystack[haystack.len() - i..]);

    let mut best = 0.0f64;
    for candidate in prefixes.chain(full).chain(suffixes) {
        let similarity = ratio_chars(needle, candidate);
        if similarity > best {
            best = similarity;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

/// Word tokens sorted and rejoined, so word order does not matter
fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<String> = text.unicode_words().map(str::to_lowercase).collect();
    tokens.sort();
    tokens.join(" ")
}

/// Order-insensitive similarity over word tokens
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}
