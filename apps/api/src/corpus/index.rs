//! Lexical chunk index: ranks corpus chunks against a job description.
//!
//! Scoring is a raw dot product of term-frequency vectors: no IDF, no length
//! normalisation, no corpus-wide statistics. Everything stays local and cheap.
//!
//! The index owns a lazily filled snapshot of the corpus. `invalidate()` drops the
//! snapshot and the next read rebuilds it from the corpus store. Readers hold an
//! `Arc` to whichever snapshot they loaded, so they see old or new, never a mix.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::corpus::store::CorpusStore;
use crate::models::chunk::{Chunk, DocumentChunks, ScoredChunk};

/// Over-fetch factor for per-document grouping.
const GROUPED_OVERFETCH: usize = 5;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("static regex is valid"));

// ────────────────────────────────────────────────────────────────────────────
// Tokenisation
// ────────────────────────────────────────────────────────────────────────────

/// Lowercases, replaces everything that is not a letter, number or whitespace
/// with a space, and collapses whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced = NON_WORD.replace_all(&lowered, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Term → occurrence count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermFrequency(HashMap<String, u32>);

impl TermFrequency {
    pub fn from_text(text: &str) -> Self {
        let mut map = HashMap::new();
        for token in tokenize(text) {
            *map.entry(token).or_insert(0) += 1;
        }
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, term: &str) -> u32 {
        self.0.get(term).copied().unwrap_or(0)
    }

    /// Σ over shared terms of `self[term] × other[term]`.
    pub fn dot(&self, other: &TermFrequency) -> f64 {
        let (small, large) = if self.0.len() <= other.0.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .0
            .iter()
            .map(|(term, count)| f64::from(*count) * f64::from(large.get(term)))
            .sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct IndexedChunk {
    chunk: Chunk,
    terms: TermFrequency,
}

/// Immutable, fully built view of the corpus.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    chunks: Vec<IndexedChunk>,
}

impl IndexSnapshot {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top `limit` chunks by score. Zero-score chunks are excluded; ties keep
    /// corpus order.
    pub fn query(&self, job_description: &str, limit: usize) -> Vec<ScoredChunk> {
        if self.is_empty() {
            return Vec::new();
        }
        let query = TermFrequency::from_text(job_description);
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .filter_map(|indexed| {
                let score = query.dot(&indexed.terms);
                (score > 0.0).then(|| ScoredChunk {
                    id: indexed.chunk.id.clone(),
                    doc_id: indexed.chunk.doc_id.clone(),
                    text: indexed.chunk.text.clone(),
                    order: indexed.chunk.order,
                    score,
                })
            })
            .collect();

        // sort_by is stable: equal scores stay in corpus order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit.max(1));
        scored
    }

    pub fn query_grouped_by_document(
        &self,
        job_description: &str,
        limit_per_doc: usize,
    ) -> Vec<DocumentChunks> {
        let limit_per_doc = limit_per_doc.max(1);
        let ranked = self.query(job_description, limit_per_doc * GROUPED_OVERFETCH);
        group_by_document(ranked, limit_per_doc)
    }
}

fn group_by_document(ranked: Vec<ScoredChunk>, limit_per_doc: usize) -> Vec<DocumentChunks> {
    let mut groups: Vec<DocumentChunks> = Vec::new();
    for chunk in ranked {
        match groups.iter_mut().find(|g| g.doc_id == chunk.doc_id) {
            Some(group) if group.chunks.len() < limit_per_doc => group.chunks.push(chunk),
            Some(_) => {}
            None => groups.push(DocumentChunks {
                doc_id: chunk.doc_id.clone(),
                chunks: vec![chunk],
            }),
        }
    }
    groups
}

// ────────────────────────────────────────────────────────────────────────────
// Store-backed index
// ────────────────────────────────────────────────────────────────────────────

/// Shared index over the corpus store. Cheap to query concurrently.
pub struct ChunkIndex {
    store: Arc<dyn CorpusStore>,
    cache: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl ChunkIndex {
    pub fn new(store: Arc<dyn CorpusStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
        }
    }

    /// Builds a snapshot from `chunks`. Blank chunks are skipped; input is untouched.
    pub fn build(chunks: &[Chunk]) -> IndexSnapshot {
        IndexSnapshot {
            chunks: chunks
                .iter()
                .filter(|c| !c.text.trim().is_empty())
                .map(|c| IndexedChunk {
                    chunk: c.clone(),
                    terms: TermFrequency::from_text(&c.text),
                })
                .collect(),
        }
    }

    /// Drops the cached snapshot. The next read reloads the whole corpus.
    pub fn invalidate(&self) {
        match self.cache.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        debug!("Chunk index invalidated");
    }

    /// Returns the current snapshot, filling the cache from the store if needed.
    ///
    /// A store failure degrades to an empty snapshot and leaves the cache empty
    /// so the next call tries again.
    pub async fn snapshot(&self) -> Arc<IndexSnapshot> {
        if let Some(snapshot) = self.cached() {
            return snapshot;
        }

        match self.store.list_all_chunks().await {
            Ok(chunks) => {
                let snapshot = Arc::new(Self::build(&chunks));
                info!(
                    "Chunk index built: {} chunks ({} skipped as blank)",
                    snapshot.len(),
                    chunks.len() - snapshot.len()
                );
                match self.cache.write() {
                    Ok(mut guard) => *guard = Some(Arc::clone(&snapshot)),
                    Err(poisoned) => *poisoned.into_inner() = Some(Arc::clone(&snapshot)),
                }
                snapshot
            }
            Err(e) => {
                warn!("Corpus store unavailable, treating corpus as empty: {e:#}");
                Arc::new(IndexSnapshot::default())
            }
        }
    }

    fn cached(&self) -> Option<Arc<IndexSnapshot>> {
        match self.cache.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn corpus_size(&self) -> usize {
        self.snapshot().await.len()
    }

    pub async fn query(&self, job_description: &str, limit: usize) -> Vec<ScoredChunk> {
        if job_description.trim().is_empty() {
            return Vec::new();
        }
        self.snapshot().await.query(job_description, limit)
    }

    pub async fn query_grouped_by_document(
        &self,
        job_description: &str,
        limit_per_doc: usize,
    ) -> Vec<DocumentChunks> {
        if job_description.trim().is_empty() {
            return Vec::new();
        }
        self.snapshot()
            .await
            .query_grouped_by_document(job_description, limit_per_doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{chunk, MemoryCorpus};

    fn scenario_corpus() -> Vec<Chunk> {
        vec![
            chunk("c1", "a", 0, "Built React dashboards for the billing team."),
            chunk("c2", "b", 0, "Maintained Node.js services behind an API gateway."),
            chunk("c3", "c", 0, "Showed leadership mentoring four engineers."),
        ]
    }

    #[test]
    fn test_normalize_strips_punctuation_and_collapses_space() {
        assert_eq!(normalize("  Node.js,  C++ & Rust!\n"), "node js c rust");
        assert_eq!(normalize("Café — Zürich 2024"), "café zürich 2024");
    }

    #[test]
    fn test_term_frequency_counts_repeats() {
        let tf = TermFrequency::from_text("rust Rust RUST go");
        assert_eq!(tf.get("rust"), 3);
        assert_eq!(tf.get("go"), 1);
        assert_eq!(tf.get("java"), 0);
    }

    #[test]
    fn test_score_is_raw_dot_product() {
        let query = TermFrequency::from_text("rust rust kafka");
        let chunk = TermFrequency::from_text("rust kafka kafka kafka");
        // rust: 2*1, kafka: 1*3
        assert_eq!(query.dot(&chunk), 5.0);
    }

    #[test]
    fn test_end_to_end_react_leadership_scenario() {
        let snapshot = ChunkIndex::build(&scenario_corpus());
        let results =
            snapshot.query("Looking for a React engineer with leadership experience", 2);
        let ids: Vec<&str> = results.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert!(results.iter().all(|c| c.score > 0.0));
    }

    #[test]
    fn test_query_is_deterministic() {
        let snapshot = ChunkIndex::build(&scenario_corpus());
        let q = "react node js leadership engineers";
        let first = snapshot.query(q, 10);
        for _ in 0..5 {
            assert_eq!(snapshot.query(q, 10), first);
        }
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let corpus = vec![
            chunk("x", "d1", 0, "rust"),
            chunk("y", "d2", 0, "rust"),
            chunk("z", "d3", 0, "rust"),
        ];
        let results = ChunkIndex::build(&corpus).query("rust", 3);
        let ids: Vec<&str> = results.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_more_occurrences_score_at_least_as_high() {
        let corpus = vec![
            chunk("low", "d", 0, "rust postgres"),
            chunk("high", "d", 1, "rust rust postgres postgres"),
        ];
        let results = ChunkIndex::build(&corpus).query("rust postgres", 2);
        assert_eq!(results[0].id, "high");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_limit_respected_for_any_corpus_size() {
        let corpus: Vec<Chunk> = (0..25)
            .map(|i| chunk(&format!("c{i}"), "d", i, "rust engineer"))
            .collect();
        let snapshot = ChunkIndex::build(&corpus);
        for limit in [1, 2, 7, 25, 40] {
            assert!(snapshot.query("rust", limit).len() <= limit);
        }
        assert_eq!(snapshot.query("rust", 0).len(), 1);
    }

    #[test]
    fn test_empty_inputs_yield_empty_results() {
        let snapshot = ChunkIndex::build(&scenario_corpus());
        assert!(snapshot.query("", 5).is_empty());
        assert!(snapshot.query("!!! ---", 5).is_empty());
        let empty = ChunkIndex::build(&[]);
        assert!(empty.is_empty());
        assert!(empty.query("react", 5).is_empty());
        assert!(ChunkIndex::build(&[chunk("blank", "d", 0, " \n ")]).is_empty());
    }

    #[test]
    fn test_blank_chunks_are_not_indexed() {
        let corpus = vec![chunk("blank", "d", 0, "   "), chunk("ok", "d", 1, "rust")];
        let snapshot = ChunkIndex::build(&corpus);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_grouped_caps_each_document() {
        let corpus = vec![
            chunk("a1", "a", 0, "rust rust rust"),
            chunk("a2", "a", 1, "rust rust"),
            chunk("a3", "a", 2, "rust"),
            chunk("b1", "b", 0, "rust rust"),
        ];
        let groups = ChunkIndex::build(&corpus).query_grouped_by_document("rust", 2);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].doc_id, "a");
        let a_ids: Vec<&str> = groups[0].chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(a_ids, vec!["a1", "a2"]);
        assert_eq!(groups[1].doc_id, "b");
        assert_eq!(groups[1].chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_store_backed_index_caches_until_invalidated() {
        let store = Arc::new(MemoryCorpus::with_chunks(scenario_corpus()));
        let index = ChunkIndex::new(store.clone());

        assert_eq!(index.corpus_size().await, 3);
        assert_eq!(index.query("react", 5).await.len(), 1);
        assert_eq!(store.list_calls(), 1);

        store.set_chunks(vec![chunk("n1", "n", 0, "react react")]);
        // still the cached snapshot
        assert_eq!(index.query("react", 5).await[0].id, "c1");

        index.invalidate();
        let results = index.query("react", 5).await;
        assert_eq!(results[0].id, "n1");
        assert_eq!(store.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_empty() {
        let store = Arc::new(MemoryCorpus::failing());
        let index = ChunkIndex::new(store);
        assert!(index.query("react", 5).await.is_empty());
        assert_eq!(index.corpus_size().await, 0);
    }
}
