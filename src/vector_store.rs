use std::collections::HashMap;

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::model::{Scope, VectorMetadata};

struct VectorEntry {
    vector: Vec<f32>,
    metadata: VectorMetadata,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub chunk_id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// In-memory `chunkId -> (vector, metadata)` map, guarded by a single
/// reader-writer lock: `query` takes a shared lock, every mutator takes an
/// exclusive one. Exact brute-force cosine scan, no ANN.
#[derive(Default)]
pub struct VectorStore {
    entries: RwLock<HashMap<String, VectorEntry>>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, items: Vec<(String, Vec<f32>, VectorMetadata)>) {
        let mut entries = self.entries.write();
        for (chunk_id, vector, metadata) in items {
            entries.insert(chunk_id, VectorEntry { vector, metadata });
        }
    }

    /// Top-`n` entries by cosine similarity against `query_vector`, filtered
    /// by `scope`, ordered by score descending.
    pub fn query(&self, query_vector: &[f32], n: usize, scope: Scope) -> Vec<VectorHit> {
        let entries = self.entries.read();
        let mut scored: Vec<VectorHit> = entries
            .par_iter()
            .filter(|(_, entry)| scope.matches(entry.metadata.is_policy_manual))
            .map(|(chunk_id, entry)| VectorHit {
                chunk_id: chunk_id.clone(),
                score: cosine_similarity(query_vector, &entry.vector),
                metadata: entry.metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n);
        scored
    }

    pub fn delete_by_doc_id(&self, doc_id: &str) {
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.metadata.doc_id != doc_id);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Count of vector entries already present for a document, used by the
    /// `Indexer`'s incomplete-coverage check.
    pub fn count_for_doc(&self, doc_id: &str) -> usize {
        self.entries
            .read()
            .values()
            .filter(|e| e.metadata.doc_id == doc_id)
            .count()
    }
}

/// `dot(a,b) / (||a|| * ||b||)`. Returns `0.0` if either norm is zero or the
/// dimensions mismatch.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
