//! In-book full-text search.
//!
//! The indexing library is a collaborator behind `SearchIndex`: it is handed
//! `{id, text}` records when a book opens and answers queries with ranked
//! references resolvable back to the stored record (and through it, a
//! location token to navigate to). `RegexIndex` is the bundled
//! implementation: case-insensitive matching with occurrence-count ranking
//! over normalization-folded text. A query that is not a valid pattern is
//! retried as a literal, so the search box never errors.

use regex::RegexBuilder;
use serde::Serialize;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// One indexed snippet of the open book.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRecord {
    pub id: usize,
    pub text: String,
    #[serde(rename = "locationToken")]
    pub location_token: String,
}

/// A ranked query result; `id` resolves back to a [`SearchRecord`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SearchHit {
    pub id: usize,
    pub score: usize,
}

pub trait SearchIndex {
    /// Replace the index contents. Called once per opened book.
    fn build(&mut self, records: Vec<SearchRecord>);
    /// Ranked matches, best first. An empty or unmatched query yields an
    /// empty list.
    fn query(&self, query: &str) -> Vec<SearchHit>;
    fn resolve(&self, id: usize) -> Option<&SearchRecord>;
}

/// Regex-backed index over normalization-folded text.
#[derive(Default)]
pub struct RegexIndex {
    records: Vec<SearchRecord>,
    folded: Vec<String>,
}

impl RegexIndex {
    pub fn new() -> Self {
        RegexIndex::default()
    }
}

/// NFKC-fold text so composed and compatibility forms compare equal.
fn fold(text: &str) -> String {
    text.nfkc().collect()
}

impl SearchIndex for RegexIndex {
    fn build(&mut self, records: Vec<SearchRecord>) {
        self.folded = records.iter().map(|record| fold(&record.text)).collect();
        debug!(records = records.len(), "Built search index");
        self.records = records;
    }

    fn query(&self, query: &str) -> Vec<SearchHit> {
        let query = fold(query.trim());
        if query.is_empty() {
            return Vec::new();
        }
        let matcher = RegexBuilder::new(&query)
            .case_insensitive(true)
            .build()
            .or_else(|_| {
                // Not a valid pattern; fall back to a literal search.
                RegexBuilder::new(&regex::escape(&query))
                    .case_insensitive(true)
                    .build()
            });
        let Ok(matcher) = matcher else {
            return Vec::new();
        };

        let mut hits: Vec<SearchHit> = self
            .records
            .iter()
            .zip(&self.folded)
            .filter_map(|(record, text)| {
                let score = matcher.find_iter(text).count();
                (score > 0).then_some(SearchHit {
                    id: record.id,
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        hits
    }

    fn resolve(&self, id: usize) -> Option<&SearchRecord> {
        self.records.iter().find(|record| record.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: usize, text: &str) -> SearchRecord {
        SearchRecord {
            id,
            text: text.to_string(),
            location_token: format!("tok-{id}"),
        }
    }

    fn built() -> RegexIndex {
        let mut index = RegexIndex::new();
        index.build(vec![
            record(0, "The whale surfaced. The whale dove."),
            record(1, "No leviathans here."),
            record(2, "A whale!"),
        ]);
        index
    }

    #[test]
    fn results_rank_by_occurrence_count() {
        let index = built();
        let hits = index.query("whale");
        assert_eq!(
            hits,
            vec![SearchHit { id: 0, score: 2 }, SearchHit { id: 2, score: 1 }]
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let index = built();
        assert_eq!(index.query("WHALE").len(), 2);
    }

    #[test]
    fn empty_and_unmatched_queries_yield_nothing() {
        let index = built();
        assert!(index.query("").is_empty());
        assert!(index.query("   ").is_empty());
        assert!(index.query("squid").is_empty());
    }

    #[test]
    fn invalid_patterns_degrade_to_literals() {
        let mut index = RegexIndex::new();
        index.build(vec![record(0, "costs $4 [draft)")]);
        let hits = index.query("$4 [draft)");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 0);
    }

    #[test]
    fn hits_resolve_back_to_records_with_tokens() {
        let index = built();
        let hit = index.query("leviathans")[0];
        let record = index.resolve(hit.id).unwrap();
        assert_eq!(record.location_token, "tok-1");
        assert!(index.resolve(99).is_none());
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let mut index = built();
        index.build(vec![record(7, "fresh content")]);
        assert!(index.query("whale").is_empty());
        assert_eq!(index.query("fresh")[0].id, 7);
    }
}
