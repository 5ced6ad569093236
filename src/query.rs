//! C6 Query Engine (spec.md §4.6): scores indexed documents against a
//! tokenized query, with a degraded substring-scan fallback when the index
//! finds nothing.

use crate::index::{tokenize, IndexGeneration};
use crate::model::{Field, FileType, IndexedDocument};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Flat relevance awarded to every degraded-fallback match (spec.md §4.6
/// edge case: no postings hit, fall back to an O(N) substring scan).
const DEGRADED_RELEVANCE: f64 = 0.5;
const EXCERPT_LEN: usize = 200;

/// Field names follow spec.md §4.6's declared output shape exactly
/// (`docKey`, `path`, `spaceName`, `type`, `size`, `modifiedAt`), which
/// doesn't line up one-to-one with this struct's Rust-side field names.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(rename = "docKey")]
    pub doc_key: String,
    #[serde(rename = "spaceName")]
    pub space_name: String,
    pub title: String,
    #[serde(rename = "path")]
    pub relative_path: String,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub file_type: FileType,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    pub relevance: f64,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "modifiedAt")]
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

/// Filters from spec.md §4.6: empty sets mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    pub space_names: HashSet<String>,
    pub file_types: HashSet<FileType>,
    pub include_content: bool,
}

/// Run `query` against `generation`, optionally scoped by `filters`, capped
/// at `max_results`. Returns hits sorted by relevance desc, then modifiedAt
/// desc, then docKey asc (spec.md §4.6 stable tiebreak).
pub fn search(
    generation: &IndexGeneration,
    query: &str,
    filters: &QueryFilters,
    max_results: usize,
) -> Vec<SearchHit> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut scores: HashMap<String, f64> = HashMap::new();
    for token in &tokens {
        let Some(postings) = generation.postings.get(token) else { continue };
        for posting in postings.iter() {
            let mut score = 0.0;
            for field in Field::ALL {
                let count = posting.field_counts[field.index()];
                if count > 0 {
                    score += field.weight() * count as f64;
                }
            }
            score /= tokens.len() as f64;
            *scores.entry(posting.doc_key.clone()).or_insert(0.0) += score;
        }
    }

    let hits: Vec<SearchHit> = if scores.is_empty() {
        degraded_scan(generation, query, filters)
    } else {
        scores
            .into_iter()
            .filter_map(|(doc_key, relevance)| {
                generation.documents.get(&doc_key).and_then(|doc| {
                    passes_filters(doc.value(), filters)
                        .then(|| to_hit(doc.value(), relevance, filters.include_content))
                })
            })
            .collect()
    };

    rank_and_cap(hits, max_results)
}

fn passes_filters(doc: &IndexedDocument, filters: &QueryFilters) -> bool {
    if !filters.space_names.is_empty() && !filters.space_names.contains(&doc.space_name) {
        return false;
    }
    if !filters.file_types.is_empty() && !filters.file_types.contains(&doc.file_type) {
        return false;
    }
    true
}

/// O(N) substring fallback over every document's title/body when no token
/// in the query matches a posting (spec.md §4.6).
fn degraded_scan(generation: &IndexGeneration, query: &str, filters: &QueryFilters) -> Vec<SearchHit> {
    let needle = query.to_lowercase();
    generation
        .documents
        .iter()
        .filter(|entry| passes_filters(entry.value(), filters))
        .filter(|entry| {
            entry.value().title.to_lowercase().contains(&needle)
                || entry.value().body.to_lowercase().contains(&needle)
        })
        .map(|entry| to_hit(entry.value(), DEGRADED_RELEVANCE, filters.include_content))
        .collect()
}

fn rank_and_cap(mut hits: Vec<SearchHit>, max_results: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.modified_at.cmp(&a.modified_at))
            .then_with(|| a.doc_key.cmp(&b.doc_key))
    });
    hits.truncate(max_results);
    hits
}

fn to_hit(doc: &IndexedDocument, relevance: f64, include_content: bool) -> SearchHit {
    SearchHit {
        doc_key: doc.doc_key.clone(),
        space_name: doc.space_name.clone(),
        title: doc.title.clone(),
        relative_path: doc.relative_path.clone(),
        tags: doc.tags.clone(),
        file_type: doc.file_type,
        size_bytes: doc.size_bytes,
        relevance,
        excerpt: excerpt(&doc.body),
        body: include_content.then(|| doc.body.clone()),
        modified_at: doc.modified_at,
    }
}

/// First 200 characters of the body with markdown punctuation stripped
/// (spec.md §4.6).
fn excerpt(body: &str) -> String {
    let stripped: String = body
        .chars()
        .filter(|c| !matches!(c, '#' | '*' | '_' | '`' | '>' | '[' | ']' | '(' | ')'))
        .collect();
    let collapsed: String = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexManager;
    use crate::model::ViewerHint;
    use chrono::{Duration, Utc};

    fn doc(doc_key: &str, title: &str, body: &str, space: &str, file_type: FileType) -> IndexedDocument {
        IndexedDocument {
            doc_key: doc_key.to_string(),
            space_id: 1,
            space_name: space.to_string(),
            title: title.to_string(),
            relative_path: format!("{doc_key}.md"),
            tags: Vec::new(),
            body: body.to_string(),
            file_type,
            viewer: ViewerHint::Markdown,
            size_bytes: 0,
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn ranks_title_matches_above_body_only_matches() {
        let manager = IndexManager::new();
        manager.rebuild(vec![
            doc("1:a", "Rust Guide", "unrelated content", "Space", FileType::Document),
            doc("1:b", "Notes", "this mentions rust in passing", "Space", FileType::Document),
        ]);
        let hits = search(&manager.current(), "rust", &QueryFilters::default(), 20);
        assert_eq!(hits[0].doc_key, "1:a");
    }

    #[test]
    fn file_type_filter_excludes_other_types() {
        let manager = IndexManager::new();
        manager.rebuild(vec![
            doc("1:a", "Rust Guide", "body", "Space", FileType::Document),
            doc("1:b", "Rust Script", "body", "Space", FileType::Code),
        ]);
        let filters = QueryFilters {
            space_names: HashSet::new(),
            file_types: HashSet::from([FileType::Code]),
            include_content: false,
        };
        let hits = search(&manager.current(), "rust", &filters, 20);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_key, "1:b");
    }

    #[test]
    fn degraded_scan_finds_substrings_missed_by_tokenizer() {
        let manager = IndexManager::new();
        // "teleport" tokenizes whole, so a query for the substring "por"
        // matches no posting (no token equals "por") and must fall back to
        // the degraded scan rather than the normal scored path.
        manager.rebuild(vec![doc("1:a", "Title", "teleport diagnostics", "Space", FileType::Document)]);
        let hits = search(&manager.current(), "por", &QueryFilters::default(), 20);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].relevance, DEGRADED_RELEVANCE);
    }

    #[test]
    fn ties_break_by_modified_at_then_doc_key() {
        let manager = IndexManager::new();
        let mut older = doc("1:b", "Rust", "rust rust", "Space", FileType::Document);
        older.modified_at = Utc::now() - Duration::days(1);
        let newer = doc("1:a", "Rust", "rust rust", "Space", FileType::Document);
        manager.rebuild(vec![older, newer]);
        let hits = search(&manager.current(), "rust", &QueryFilters::default(), 20);
        assert_eq!(hits[0].doc_key, "1:a");
    }

    #[test]
    fn excerpt_strips_markdown_punctuation() {
        assert_eq!(excerpt("# Heading\n\n*bold* and `code`"), "Heading bold and code");
    }
}
