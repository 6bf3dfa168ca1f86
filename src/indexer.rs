use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::chunker;
use crate::config::AppConfig;
use crate::embedding::EmbeddingClient;
use crate::error::AppResult;
use crate::extractor;
use crate::model::{Document, IndexResult, VectorMetadata};
use crate::store::IndexStore;
use crate::vector_store::VectorStore;

/// Orchestrates extract → chunk → persist → embed → vectorize. Idempotent
/// per document by checksum.
pub struct Indexer {
    store: IndexStore,
    vector_store: Arc<VectorStore>,
    embedding_client: Arc<EmbeddingClient>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Indexer {
    pub fn new(
        store: IndexStore,
        vector_store: Arc<VectorStore>,
        embedding_client: Arc<EmbeddingClient>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            vector_store,
            embedding_client,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }

    pub async fn index(
        &self,
        uri: &Path,
        is_policy_manual: bool,
        workspace_id: Option<String>,
    ) -> AppResult<IndexResult> {
        let absolute = std::fs::canonicalize(uri).unwrap_or_else(|_| uri.to_path_buf());
        let filepath = absolute.to_string_lossy().to_string();
        let doc_id = doc_id_for_path(&filepath);

        let checksum = compute_checksum(&absolute).unwrap_or_default();
        let existing = self.store.get_document_by_path(&filepath)?;

        if let Some(existing) = &existing {
            if existing.checksum == checksum {
                let existing_chunks = self.store.get_chunks_by_doc_id(&existing.id)?;
                let covered = self.vector_store.count_for_doc(&existing.id);
                if covered >= existing_chunks.len() {
                    return Ok(IndexResult {
                        doc_id: existing.id.clone(),
                        chunks_emitted: existing_chunks.len(),
                        chunks_embedded: 0,
                        skipped: true,
                    });
                }
                // Vector coverage is incomplete (a prior run was cancelled
                // mid-embed, or some chunks' embeddings failed). Re-embed
                // this document's chunks to close the gap.
                tracing::info!(doc_id = %existing.id, "re-index found incomplete vector coverage, re-embedding");
                let embedded = self
                    .embed_chunks(
                        &existing.id,
                        &existing_chunks,
                        existing.is_policy_manual,
                        &existing.filename,
                        &existing.filetype,
                    )
                    .await;
                return Ok(IndexResult {
                    doc_id: existing.id.clone(),
                    chunks_emitted: existing_chunks.len(),
                    chunks_embedded: embedded,
                    skipped: false,
                });
            }

            tracing::info!(doc_id = %existing.id, "checksum changed, rebuilding document");
            self.store.delete_document(&existing.id)?;
            self.vector_store.delete_by_doc_id(&existing.id);
        }

        let (text, metadata) = extractor::extract(&absolute)?;

        let filename = absolute
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| filepath.clone());
        let filetype = absolute
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        let now = Utc::now().to_rfc3339();
        let document = Document {
            id: doc_id.clone(),
            filename: filename.clone(),
            filepath,
            filetype: filetype.clone(),
            filesize: text.chars().count(),
            uploaded_at: now.clone(),
            last_indexed: now,
            checksum,
            metadata,
            is_policy_manual,
            workspace_id,
        };
        self.store.insert_document(&document)?;

        let chunks = chunker::chunk(&text, &doc_id, self.chunk_size, self.chunk_overlap);
        self.store.insert_chunks(&chunks)?;

        let embedded = self
            .embed_chunks(&doc_id, &chunks, is_policy_manual, &filename, &filetype)
            .await;

        Ok(IndexResult {
            doc_id,
            chunks_emitted: chunks.len(),
            chunks_embedded: embedded,
            skipped: false,
        })
    }

    async fn embed_chunks(
        &self,
        doc_id: &str,
        chunks: &[crate::model::Chunk],
        is_policy_manual: bool,
        filename: &str,
        filetype: &str,
    ) -> usize {
        let mut embedded = 0usize;
        let mut vectors = Vec::new();
        for chunk in chunks {
            if let Some(vector) = self.embedding_client.embed(&chunk.text).await {
                embedded += 1;
                vectors.push((
                    chunk.chunk_id.clone(),
                    vector,
                    VectorMetadata {
                        doc_id: doc_id.to_string(),
                        is_policy_manual,
                        filename: filename.to_string(),
                        filetype: filetype.to_string(),
                        chunk_index: chunk.chunk_index,
                    },
                ));
            }
        }
        self.vector_store.add(vectors);
        embedded
    }
}

/// First 16 hex chars of SHA-256 over the absolute path.
pub fn doc_id_for_path(filepath: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filepath.as_bytes());
    let digest = hasher.finalize();
    hex_encode(&digest)[..16].to_string()
}

/// SHA-256 over the file's bytes; `None` if the file is unreadable.
pub fn compute_checksum(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}
