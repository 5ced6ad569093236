//! C5 Suggestion Index (spec.md §4.5): character n-gram index over indexed
//! titles and path segments, used to autocomplete a partial query prefix.

use crate::config::{SUGGEST_NGRAM_MAX, SUGGEST_NGRAM_MIN};
use crate::index::IndexGeneration;
use dashmap::DashMap;
use std::collections::HashSet;

const DEFAULT_SUGGEST_LIMIT: usize = 10;

/// Character n-grams of `title`, lengths `[SUGGEST_NGRAM_MIN, SUGGEST_NGRAM_MAX]`.
fn ngrams(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    let mut out = Vec::new();
    for len in SUGGEST_NGRAM_MIN..=SUGGEST_NGRAM_MAX {
        if chars.len() < len {
            continue;
        }
        for window in chars.windows(len) {
            out.push(window.iter().collect());
        }
    }
    out
}

/// n-gram -> set of candidate strings containing it (titles and path
/// segments), rebuilt alongside the main index.
pub struct SuggestionIndex {
    ngram_to_candidates: DashMap<String, HashSet<String>>,
}

impl SuggestionIndex {
    pub fn new() -> Self {
        Self { ngram_to_candidates: DashMap::new() }
    }

    /// Built from the concatenation of each document's title and path
    /// segments (spec.md §4.5), so autocomplete covers folder/file names too.
    pub fn rebuild(&self, generation: &IndexGeneration) {
        self.ngram_to_candidates.clear();
        for entry in generation.documents.iter() {
            let doc = entry.value();
            self.index_candidate(&doc.title);
            for segment in doc.relative_path.split('/') {
                if !segment.is_empty() {
                    self.index_candidate(segment);
                }
            }
        }
    }

    fn index_candidate(&self, candidate: &str) {
        for gram in ngrams(candidate) {
            self.ngram_to_candidates.entry(gram).or_default().insert(candidate.to_string());
        }
    }

    /// Suggest up to `limit` candidates matching `prefix`, preferring ones
    /// that start with the prefix, then shorter ones, then lexicographic
    /// order (spec.md §4.5 tiebreak rules). A prefix shorter than the
    /// minimum n-gram length returns no suggestions.
    pub fn suggest(&self, prefix: &str, limit: Option<usize>) -> Vec<String> {
        let limit = limit.unwrap_or(DEFAULT_SUGGEST_LIMIT);
        let prefix_lower = prefix.to_lowercase();
        if prefix_lower.chars().count() < SUGGEST_NGRAM_MIN {
            return Vec::new();
        }

        let grams = ngrams(&prefix_lower);
        let candidates = intersect_candidates(&self.ngram_to_candidates, &grams);

        let mut matches: Vec<String> =
            candidates.into_iter().filter(|t| t.to_lowercase().contains(&prefix_lower)).collect();

        matches.sort_by(|a, b| {
            let a_prefix = a.to_lowercase().starts_with(&prefix_lower);
            let b_prefix = b.to_lowercase().starts_with(&prefix_lower);
            b_prefix
                .cmp(&a_prefix)
                .then(a.len().cmp(&b.len()))
                .then(a.cmp(b))
        });

        matches.truncate(limit);
        matches
    }
}

impl Default for SuggestionIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn intersect_candidates(ngram_to_titles: &DashMap<String, HashSet<String>>, grams: &[String]) -> HashSet<String> {
    let mut iter = grams.iter();
    let Some(first) = iter.next() else { return HashSet::new() };
    let mut result = ngram_to_titles.get(first).map(|e| e.value().clone()).unwrap_or_default();
    for gram in iter {
        let Some(set) = ngram_to_titles.get(gram) else {
            return HashSet::new();
        };
        result.retain(|t| set.contains(t));
        if result.is_empty() {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexManager;
    use crate::model::{FileType, IndexedDocument, ViewerHint};
    use chrono::Utc;

    fn doc(doc_key: &str, title: &str) -> IndexedDocument {
        IndexedDocument {
            doc_key: doc_key.to_string(),
            space_id: 1,
            space_name: "Space".to_string(),
            title: title.to_string(),
            relative_path: format!("{doc_key}.md"),
            tags: Vec::new(),
            body: String::new(),
            file_type: FileType::Document,
            viewer: ViewerHint::Markdown,
            size_bytes: 0,
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn prefix_matches_rank_before_substring_matches() {
        let index_mgr = IndexManager::new();
        index_mgr.rebuild(vec![doc("1:a", "Rustacean Notes"), doc("1:b", "Advanced Rust")]);
        let suggest = SuggestionIndex::new();
        suggest.rebuild(&index_mgr.current());

        let results = suggest.suggest("rust", None);
        assert_eq!(results.first().map(String::as_str), Some("Rustacean Notes"));
    }

    #[test]
    fn limit_is_respected() {
        let index_mgr = IndexManager::new();
        index_mgr.rebuild(vec![
            doc("1:a", "Alpha"),
            doc("1:b", "Alphabet"),
            doc("1:c", "Alpine"),
        ]);
        let suggest = SuggestionIndex::new();
        suggest.rebuild(&index_mgr.current());
        let results = suggest.suggest("al", Some(2));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn empty_prefix_returns_nothing() {
        let suggest = SuggestionIndex::new();
        assert!(suggest.suggest("", None).is_empty());
    }

    #[test]
    fn prefix_shorter_than_min_ngram_returns_nothing() {
        let index_mgr = IndexManager::new();
        index_mgr.rebuild(vec![doc("1:a", "Rustacean Notes")]);
        let suggest = SuggestionIndex::new();
        suggest.rebuild(&index_mgr.current());
        assert!(suggest.suggest("r", None).is_empty());
    }

    #[test]
    fn path_segments_are_indexed_for_suggestions() {
        let manager = IndexManager::new();
        manager.rebuild(vec![IndexedDocument {
            doc_key: "1:a".to_string(),
            space_id: 1,
            space_name: "Space".to_string(),
            title: "Untitled".to_string(),
            relative_path: "architecture/overview.md".to_string(),
            tags: Vec::new(),
            body: String::new(),
            file_type: FileType::Document,
            viewer: ViewerHint::Markdown,
            size_bytes: 0,
            modified_at: Utc::now(),
        }]);
        let suggest = SuggestionIndex::new();
        suggest.rebuild(&manager.current());
        let results = suggest.suggest("arch", None);
        assert!(results.iter().any(|r| r == "architecture"));
    }
}
