//! Document sets: named groups of documents a query can be routed to.
//!
//! A JSON config declares sets with a slug, a description and aliases; the
//! matcher maps free-text queries to a slug by exact match first, then by
//! substring and bigram similarity.

use crate::errors::MemoryError;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Minimum similarity score before a fuzzy match is accepted.
const MATCH_THRESHOLD: f64 = 0.3;

/// One named group of documents.
#[derive(Clone, Debug, Deserialize)]
pub struct DocumentSet {
    pub slug: String,
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Deserialize)]
struct SetsConfig {
    #[serde(default)]
    sets: Vec<DocumentSet>,
}

/// Maps natural-language queries to document-set slugs.
#[derive(Clone, Debug, Default)]
pub struct SetMatcher {
    sets: BTreeMap<String, DocumentSet>,
}

impl SetMatcher {
    /// An empty matcher; [`match_set`](Self::match_set) always misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads sets from a JSON config file. A missing file logs a warning
    /// and yields an empty matcher so set routing degrades to a no-op.
    ///
    /// # Errors
    /// Returns `MemoryError::Parse` when the file exists but is not valid
    /// JSON.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Sets configuration file not found: {}", path.display());
            return Ok(Self::empty());
        }

        let raw = std::fs::read_to_string(path)?;
        let config: SetsConfig = serde_json::from_str(&raw)?;

        let mut sets = BTreeMap::new();
        for set in config.sets {
            sets.insert(set.slug.clone(), set);
        }
        info!("Loaded {} document sets from {}", sets.len(), path.display());
        Ok(Self { sets })
    }

    /// Matches a query to a set slug.
    ///
    /// Exact slug or alias matches win immediately; otherwise descriptions
    /// are scored by substring coverage and bigram similarity, and the best
    /// score must clear the 0.3 threshold.
    pub fn match_set(&self, query: &str) -> Option<&str> {
        if self.sets.is_empty() {
            return None;
        }

        let query_lower = query.to_lowercase();
        let mut best_match: Option<&str> = None;
        let mut best_score = 0.0;

        for (slug, set) in &self.sets {
            if slug.to_lowercase() == query_lower {
                return Some(slug);
            }
            if set
                .aliases
                .iter()
                .any(|a| a.to_lowercase() == query_lower)
            {
                return Some(slug);
            }

            let description_lower = set.description.to_lowercase();
            if !description_lower.is_empty() && description_lower.contains(&query_lower) {
                let score = query_lower.len() as f64 / description_lower.len() as f64;
                if score > best_score {
                    best_score = score;
                    best_match = Some(slug);
                }
            }

            let similarity = bigram_similarity(&query_lower, &description_lower);
            if similarity > best_score {
                best_score = similarity;
                best_match = Some(slug);
            }
        }

        if best_score > MATCH_THRESHOLD {
            let slug = best_match?;
            info!("Matched query '{query}' to set '{slug}' (score: {best_score:.2})");
            return Some(slug);
        }

        debug!("No good set match for query '{query}'");
        None
    }

    pub fn available_sets(&self) -> Vec<&str> {
        self.sets.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Sorensen-Dice similarity over character bigrams.
fn bigram_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() < 2 || b.len() < 2 {
        return if a == b && !a.is_empty() { 1.0 } else { 0.0 };
    }

    let mut counts: BTreeMap<(char, char), usize> = BTreeMap::new();
    for w in a.windows(2) {
        *counts.entry((w[0], w[1])).or_default() += 1;
    }

    let mut overlap = 0usize;
    for w in b.windows(2) {
        if let Some(n) = counts.get_mut(&(w[0], w[1])) {
            if *n > 0 {
                *n -= 1;
                overlap += 1;
            }
        }
    }

    (2.0 * overlap as f64) / ((a.len() - 1) + (b.len() - 1)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn matcher() -> SetMatcher {
        let mut sets = BTreeMap::new();
        sets.insert(
            "platform-docs".to_string(),
            DocumentSet {
                slug: "platform-docs".into(),
                description: "Platform architecture and deployment documentation".into(),
                aliases: vec!["platform".into(), "infra docs".into()],
            },
        );
        sets.insert(
            "api-reference".to_string(),
            DocumentSet {
                slug: "api-reference".into(),
                description: "REST API reference pages".into(),
                aliases: vec![],
            },
        );
        SetMatcher { sets }
    }

    #[test]
    fn exact_slug_match_wins() {
        assert_eq!(matcher().match_set("platform-docs"), Some("platform-docs"));
    }

    #[test]
    fn alias_match_is_case_insensitive() {
        assert_eq!(matcher().match_set("Infra Docs"), Some("platform-docs"));
    }

    #[test]
    fn description_similarity_matches_above_threshold() {
        assert_eq!(
            matcher().match_set("deployment documentation"),
            Some("platform-docs")
        );
    }

    #[test]
    fn unrelated_query_does_not_match() {
        assert_eq!(matcher().match_set("zzzz qqqq"), None);
    }

    #[test]
    fn empty_matcher_never_matches() {
        assert_eq!(SetMatcher::empty().match_set("platform-docs"), None);
    }

    #[test]
    fn loads_sets_from_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sets.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"sets": [{{"slug": "notes", "description": "Personal notes", "aliases": ["scratch"]}}]}}"#
        )
        .unwrap();

        let m = SetMatcher::from_config_file(&path).unwrap();
        assert_eq!(m.available_sets(), vec!["notes"]);
        assert_eq!(m.match_set("scratch"), Some("notes"));
    }

    #[test]
    fn missing_config_degrades_to_empty() {
        let m = SetMatcher::from_config_file("/no/such/sets.json").unwrap();
        assert!(m.is_empty());
    }
}
