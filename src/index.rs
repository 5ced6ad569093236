//! C4 Inverted Index (spec.md §4.4): tokenized postings keyed by token, with
//! a per-field occurrence count and a generational atomic swap so rebuilds
//! never block concurrent readers.

use crate::model::{Field, IndexedDocument, Posting};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;

/// Minimal English stop-word list (spec.md §4.4): excluded from both
/// indexing and query tokenization so they never dominate scoring.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
    "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with",
];

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("static regex"))
}

/// Lowercase, split on non-alphanumeric runs, drop stop words and tokens
/// shorter than two characters (spec.md §4.4).
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_regex()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .filter(|t| t.chars().count() >= 2 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// One "generation" of the index: fully built, read-only once published.
pub struct IndexGeneration {
    pub postings: DashMap<String, Vec<Posting>>,
    pub documents: DashMap<String, IndexedDocument>,
}

impl IndexGeneration {
    fn empty() -> Self {
        Self { postings: DashMap::new(), documents: DashMap::new() }
    }

    fn index_document(&self, doc: IndexedDocument) {
        let mut counts: HashMap<String, [u32; 4]> = HashMap::new();

        let mut accumulate = |field: Field, text: &str| {
            for token in tokenize(text) {
                let entry = counts.entry(token).or_insert([0u32; 4]);
                entry[field.index()] += 1;
            }
        };

        accumulate(Field::Title, &doc.title);
        accumulate(Field::Tags, &doc.tags.join(" "));
        accumulate(Field::Path, &doc.relative_path);
        accumulate(Field::Body, &doc.body);

        for (token, field_counts) in counts {
            let field_mask = Field::ALL.iter().fold(0u8, |mask, f| {
                if field_counts[f.index()] > 0 { mask | f.bit() } else { mask }
            });
            self.postings.entry(token).or_default().push(Posting {
                doc_key: doc.doc_key.clone(),
                field_mask,
                field_counts,
            });
        }

        self.documents.insert(doc.doc_key.clone(), doc);
    }
}

/// Holds the currently-published generation behind an `ArcSwap`, plus a side
/// table of incrementally-indexed single documents layered atop it.
///
/// Rebuilds replace the whole generation; `upsert`/`remove` mutate the
/// current generation's postings in place, tracking each doc's prior tokens
/// so a re-index can retract stale postings (spec.md §4.4 edge case: a file
/// is edited and re-extracted without a full rebuild).
pub struct IndexManager {
    generation: ArcSwap<IndexGeneration>,
    doc_tokens: DashMap<String, Vec<String>>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self { generation: ArcSwap::from_pointee(IndexGeneration::empty()), doc_tokens: DashMap::new() }
    }

    pub fn current(&self) -> Arc<IndexGeneration> {
        self.generation.load_full()
    }

    /// Build a brand-new generation from scratch and publish it atomically.
    /// In-flight readers keep using the old generation until they re-load.
    pub fn rebuild(&self, documents: Vec<IndexedDocument>) {
        let next = IndexGeneration::empty();
        self.doc_tokens.clear();
        for doc in documents {
            let doc_key = doc.doc_key.clone();
            let tokens = collect_all_tokens(&doc);
            next.index_document(doc);
            self.doc_tokens.insert(doc_key, tokens);
        }
        self.generation.store(Arc::new(next));
    }

    /// Incrementally index or re-index a single document without rebuilding
    /// the whole generation: retract its previous postings, then re-insert.
    pub fn upsert(&self, doc: IndexedDocument) {
        let current = self.generation.load();
        self.retract(&doc.doc_key, &current);
        let tokens = collect_all_tokens(&doc);
        let doc_key = doc.doc_key.clone();
        current.index_document(doc);
        self.doc_tokens.insert(doc_key, tokens);
    }

    pub fn remove(&self, doc_key: &str) {
        let current = self.generation.load();
        self.retract(doc_key, &current);
        current.documents.remove(doc_key);
        self.doc_tokens.remove(doc_key);
    }

    fn retract(&self, doc_key: &str, generation: &IndexGeneration) {
        let Some((_, prior_tokens)) = self.doc_tokens.remove(doc_key) else { return };
        for token in prior_tokens {
            if let Some(mut postings) = generation.postings.get_mut(&token) {
                postings.retain(|p| p.doc_key != doc_key);
            }
        }
    }

    pub fn document_count(&self) -> usize {
        self.current().documents.len()
    }

    pub fn token_count(&self) -> usize {
        self.current().postings.len()
    }
}

impl Default for IndexManager {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_all_tokens(doc: &IndexedDocument) -> Vec<String> {
    let mut tokens = tokenize(&doc.title);
    tokens.extend(tokenize(&doc.tags.join(" ")));
    tokens.extend(tokenize(&doc.relative_path));
    tokens.extend(tokenize(&doc.body));
    tokens.sort();
    tokens.dedup();
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileType, ViewerHint};
    use chrono::Utc;

    fn doc(doc_key: &str, title: &str, body: &str) -> IndexedDocument {
        IndexedDocument {
            doc_key: doc_key.to_string(),
            space_id: 1,
            space_name: "Space".to_string(),
            title: title.to_string(),
            relative_path: format!("{doc_key}.md"),
            tags: Vec::new(),
            body: body.to_string(),
            file_type: FileType::Document,
            viewer: ViewerHint::Markdown,
            size_bytes: 0,
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn tokenize_drops_stop_words_and_lowercases() {
        let tokens = tokenize("The Quick Brown Fox and the Lazy Dog");
        assert!(!tokens.contains(&"the".to_string()));
        assert!(!tokens.contains(&"and".to_string()));
        assert!(tokens.contains(&"quick".to_string()));
    }

    #[test]
    fn tokenize_drops_single_character_tokens() {
        let tokens = tokenize("i x 7 rust");
        assert!(!tokens.contains(&"i".to_string()));
        assert!(!tokens.contains(&"x".to_string()));
        assert!(!tokens.contains(&"7".to_string()));
        assert!(tokens.contains(&"rust".to_string()));
    }

    #[test]
    fn rebuild_indexes_title_and_body_tokens() {
        let manager = IndexManager::new();
        manager.rebuild(vec![doc("1:a", "Rust Guide", "indexing engine content")]);
        let r#gen = manager.current();
        assert!(r#gen.postings.contains_key("rust"));
        assert!(r#gen.postings.contains_key("indexing"));
        assert_eq!(manager.document_count(), 1);
    }

    #[test]
    fn upsert_retracts_stale_tokens() {
        let manager = IndexManager::new();
        manager.rebuild(vec![doc("1:a", "Rust Guide", "old body text")]);
        manager.upsert(doc("1:a", "Python Guide", "new body text"));
        let r#gen = manager.current();
        assert!(!r#gen.postings.contains_key("rust"));
        assert!(!r#gen.postings.contains_key("old"));
        assert!(r#gen.postings.contains_key("python"));
    }

    #[test]
    fn remove_clears_postings_and_document() {
        let manager = IndexManager::new();
        manager.rebuild(vec![doc("1:a", "Rust Guide", "body")]);
        manager.remove("1:a");
        let r#gen = manager.current();
        assert!(r#gen.documents.get("1:a").is_none());
        assert!(r#gen.postings.get("rust").map(|p| p.is_empty()).unwrap_or(true));
    }
}
