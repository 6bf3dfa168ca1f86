use serde::{Deserialize, Serialize};

/// Two disjoint corpora a document can belong to, selected by
/// `Document.is_policy_manual`. Searches can target either or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    PolicyManual,
    WorkspaceDocs,
    Both,
}

impl Scope {
    /// Whether a document with the given `is_policy_manual` flag is visible
    /// under this scope.
    pub fn matches(&self, is_policy_manual: bool) -> bool {
        match self {
            Scope::PolicyManual => is_policy_manual,
            Scope::WorkspaceDocs => !is_policy_manual,
            Scope::Both => true,
        }
    }
}

/// Typed replacement for the ad-hoc "metadata as JSON string" bag; stored as
/// the `documents.metadata` column's JSON payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub word_count: usize,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub filepath: String,
    pub filetype: String,
    pub filesize: usize,
    pub uploaded_at: String,
    pub last_indexed: String,
    pub checksum: String,
    pub metadata: DocumentMetadata,
    pub is_policy_manual: bool,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub doc_id: String,
    pub text: String,
    pub chunk_index: usize,
    pub tokens: usize,
}

impl Chunk {
    /// `tokens = ceil(len(text)/4)`, the estimator used throughout the spec.
    pub fn estimate_tokens(text: &str) -> usize {
        text.len().div_ceil(4)
    }
}

/// Metadata carried alongside a vector in `VectorStore`, enough to apply
/// scope filtering and reconstruct an attribution without touching the
/// relational store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub doc_id: String,
    pub is_policy_manual: bool,
    pub filename: String,
    pub filetype: String,
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub doc_id: String,
    pub filename: String,
    pub chunk_index: usize,
    pub snippet: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub doc_id: String,
    pub chunk_id: String,
    pub filename: String,
    pub range_hint: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPack {
    pub answer_context: String,
    pub attributions: Vec<Attribution>,
    pub total_results: usize,
    pub response_time_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResult {
    pub doc_id: String,
    pub chunks_emitted: usize,
    pub chunks_embedded: usize,
    pub skipped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiletypeStats {
    pub filetype: String,
    pub count: usize,
    pub total_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub by_filetype: Vec<FiletypeStats>,
    pub total_documents: usize,
    pub total_chunks: usize,
    pub average_tokens_per_chunk: usize,
}
