//! In-memory vector index with deterministic top-k similarity search
//!
//! Stores `(id -> embedding, metadata)` and answers filtered nearest-neighbor
//! queries by cosine similarity. The index is the semantic leaf of the
//! retrieval pipeline: it never updates access metadata, that is the
//! caller's responsibility since not every hit is ultimately surfaced.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::{EngramError, Result};
use crate::memory::MemoryKind;

/// Metadata carried alongside each indexed embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMetadata {
    pub owner_id: String,
    pub kind: MemoryKind,
    pub created_at: DateTime<Utc>,
}

/// Filter criteria for index searches.
///
/// All fields are optional - when `None`, that filter is not applied.
/// Multiple filters are combined with AND logic.
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    pub owner_id: Option<String>,
    pub kind: Option<MemoryKind>,
}

impl IndexFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn matches(&self, meta: &IndexMetadata) -> bool {
        if let Some(ref owner) = self.owner_id {
            if meta.owner_id != *owner {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if meta.kind != kind {
                return false;
            }
        }
        true
    }
}

/// One search hit, ordered by similarity.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: Uuid,
    pub similarity: f32,
    pub meta: IndexMetadata,
}

/// Result of a search: ordered hits plus the number of stored entries that
/// were excluded because their dimension did not match the query.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub dimension_mismatches: usize,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    embedding: Vec<f32>,
    meta: IndexMetadata,
    /// Insertion sequence, the final deterministic ordering tiebreak
    seq: u64,
}

/// In-memory vector index.
///
/// The embedding dimension is fixed by the first insert; later inserts with
/// a different length are rejected. Reads are pure CPU over resident data.
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: HashMap<Uuid, IndexEntry>,
    dimension: Option<usize>,
    next_seq: u64,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimension fixed by the first insert, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Insert an embedding, overwriting any existing entry with the same id.
    ///
    /// The first insert fixes the index dimension; inserting a vector of a
    /// different length is a hard error on the write side.
    pub fn insert(&mut self, id: Uuid, embedding: Vec<f32>, meta: IndexMetadata) -> Result<()> {
        if embedding.is_empty() {
            return Err(EngramError::DimensionMismatch {
                expected: self.dimension.unwrap_or(0),
                actual: 0,
            });
        }
        match self.dimension {
            None => self.dimension = Some(embedding.len()),
            Some(dim) if dim != embedding.len() => {
                return Err(EngramError::DimensionMismatch {
                    expected: dim,
                    actual: embedding.len(),
                });
            }
            Some(_) => {}
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            id,
            IndexEntry {
                embedding,
                meta,
                seq,
            },
        );
        Ok(())
    }

    /// Remove an entry; no-op when the id is absent.
    pub fn delete(&mut self, id: Uuid) {
        self.entries.remove(&id);
    }

    /// Top-k cosine similarity search over entries matching `filter`.
    ///
    /// A missing or empty query yields similarity 0 for every candidate
    /// rather than an error. Entries whose stored dimension differs from the
    /// query are excluded and counted, and the search continues. Ordering is
    /// similarity descending, then newer `created_at`, then insertion order,
    /// so repeated searches over the same index and query return identical
    /// sequences.
    pub fn search(&self, query: Option<&[f32]>, k: usize, filter: &IndexFilter) -> SearchOutcome {
        if k == 0 {
            return SearchOutcome::default();
        }

        let query = query.filter(|q| !q.is_empty());
        let mut mismatches = 0usize;
        let mut scored: Vec<(&Uuid, f32, &IndexEntry)> = Vec::new();

        for (id, entry) in &self.entries {
            if !filter.matches(&entry.meta) {
                continue;
            }
            let similarity = match query {
                None => 0.0,
                Some(q) if q.len() != entry.embedding.len() => {
                    mismatches += 1;
                    continue;
                }
                Some(q) => cosine_similarity(q, &entry.embedding),
            };
            scored.push((id, similarity, entry));
        }

        if mismatches > 0 {
            warn!(
                mismatches,
                query_len = query.map(|q| q.len()).unwrap_or(0),
                "Excluded entries with mismatched embedding dimension from search"
            );
        }

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| b.2.meta.created_at.cmp(&a.2.meta.created_at))
                .then_with(|| a.2.seq.cmp(&b.2.seq))
        });

        let hits = scored
            .into_iter()
            .take(k)
            .map(|(id, similarity, entry)| SearchHit {
                id: *id,
                similarity,
                meta: entry.meta.clone(),
            })
            .collect();

        SearchOutcome {
            hits,
            dimension_mismatches: mismatches,
        }
    }
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Degenerate input (either vector zero-magnitude) is defined as 0, not an
/// error. Callers are responsible for rejecting mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn meta(owner: &str, kind: MemoryKind, age_days: i64) -> IndexMetadata {
        IndexMetadata {
            owner_id: owner.to_string(),
            kind,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![0.3, 0.5, 0.2];
        let sim = cosine_similarity(&v, &v);
        assert!(
            (sim - 1.0).abs() < 0.001,
            "Identical vectors should have similarity ~1.0, got: {sim}"
        );
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &a), 0.0);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_length() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_insert_fixes_dimension() {
        let mut index = VectorIndex::new();
        index
            .insert(
                Uuid::new_v4(),
                vec![0.1; 4],
                meta("u1", MemoryKind::Conversation, 0),
            )
            .unwrap();
        assert_eq!(index.dimension(), Some(4));

        let err = index
            .insert(
                Uuid::new_v4(),
                vec![0.1; 8],
                meta("u1", MemoryKind::Conversation, 0),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            EngramError::DimensionMismatch {
                expected: 4,
                actual: 8
            }
        ));
    }

    #[test]
    fn test_insert_overwrites_same_id() {
        let mut index = VectorIndex::new();
        let id = Uuid::new_v4();
        index
            .insert(id, vec![1.0, 0.0], meta("u1", MemoryKind::Fact, 0))
            .unwrap();
        index
            .insert(id, vec![0.0, 1.0], meta("u1", MemoryKind::Fact, 0))
            .unwrap();
        assert_eq!(index.len(), 1);

        let outcome = index.search(Some(&[0.0, 1.0]), 1, &IndexFilter::new());
        assert!((outcome.hits[0].similarity - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut index = VectorIndex::new();
        index.delete(Uuid::new_v4());
        assert!(index.is_empty());
    }

    #[test]
    fn test_self_search_returns_self_first() {
        let mut index = VectorIndex::new();
        let target = Uuid::new_v4();
        index
            .insert(
                target,
                vec![0.9, 0.1, 0.3],
                meta("u1", MemoryKind::Conversation, 1),
            )
            .unwrap();
        index
            .insert(
                Uuid::new_v4(),
                vec![0.1, 0.9, 0.2],
                meta("u1", MemoryKind::Conversation, 1),
            )
            .unwrap();

        let outcome = index.search(Some(&[0.9, 0.1, 0.3]), 2, &IndexFilter::new());
        assert_eq!(outcome.hits[0].id, target);
        assert!((outcome.hits[0].similarity - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_search_respects_k_and_filter() {
        let mut index = VectorIndex::new();
        for i in 0..5 {
            index
                .insert(
                    Uuid::new_v4(),
                    vec![0.5, 0.5],
                    meta("u1", MemoryKind::Conversation, i),
                )
                .unwrap();
        }
        index
            .insert(
                Uuid::new_v4(),
                vec![0.5, 0.5],
                meta("u2", MemoryKind::Conversation, 0),
            )
            .unwrap();

        let filter = IndexFilter::new().with_owner("u1");
        let outcome = index.search(Some(&[0.5, 0.5]), 3, &filter);
        assert_eq!(outcome.hits.len(), 3);
        assert!(outcome.hits.iter().all(|h| h.meta.owner_id == "u1"));
    }

    #[test]
    fn test_search_missing_query_yields_zero_similarity() {
        let mut index = VectorIndex::new();
        index
            .insert(Uuid::new_v4(), vec![1.0, 0.0], meta("u1", MemoryKind::Fact, 0))
            .unwrap();

        let outcome = index.search(None, 5, &IndexFilter::new());
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].similarity, 0.0);

        let outcome = index.search(Some(&[]), 5, &IndexFilter::new());
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].similarity, 0.0);
    }

    #[test]
    fn test_search_counts_dimension_mismatches() {
        let mut index = VectorIndex::new();
        index
            .insert(Uuid::new_v4(), vec![1.0, 0.0], meta("u1", MemoryKind::Fact, 0))
            .unwrap();
        index
            .insert(Uuid::new_v4(), vec![0.0, 1.0], meta("u1", MemoryKind::Fact, 0))
            .unwrap();

        // Query of a different dimension: every candidate excluded, counted
        let outcome = index.search(Some(&[1.0, 0.0, 0.0]), 5, &IndexFilter::new());
        assert!(outcome.hits.is_empty());
        assert_eq!(outcome.dimension_mismatches, 2);
    }

    #[test]
    fn test_tie_break_newer_created_at_first() {
        let mut index = VectorIndex::new();
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        index
            .insert(old, vec![1.0, 0.0], meta("u1", MemoryKind::Conversation, 5))
            .unwrap();
        index
            .insert(new, vec![1.0, 0.0], meta("u1", MemoryKind::Conversation, 1))
            .unwrap();

        let outcome = index.search(Some(&[1.0, 0.0]), 2, &IndexFilter::new());
        assert_eq!(outcome.hits[0].id, new, "newer entry wins the tie");
        assert_eq!(outcome.hits[1].id, old);
    }

    #[test]
    fn test_search_is_deterministic() {
        let mut index = VectorIndex::new();
        let created = Utc::now();
        let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            index
                .insert(
                    *id,
                    vec![0.5, 0.5],
                    IndexMetadata {
                        owner_id: "u1".to_string(),
                        kind: MemoryKind::Conversation,
                        created_at: created,
                    },
                )
                .unwrap();
        }

        let first = index.search(Some(&[0.5, 0.5]), 6, &IndexFilter::new());
        for _ in 0..10 {
            let again = index.search(Some(&[0.5, 0.5]), 6, &IndexFilter::new());
            let a: Vec<Uuid> = first.hits.iter().map(|h| h.id).collect();
            let b: Vec<Uuid> = again.hits.iter().map(|h| h.id).collect();
            assert_eq!(a, b, "Equal-score searches must order by insertion");
        }
        // Identical similarity and created_at: insertion order decides
        assert_eq!(first.hits[0].id, ids[0]);
    }
}
