use serde::{Deserialize, Serialize};

/// Chunking defaults (characters), used when a caller doesn't override them.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Default number of results `Searcher` returns when the caller doesn't ask
/// for a specific limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Default character budget handed to `ContextAssembler`.
pub const DEFAULT_MAX_CONTEXT_LENGTH: usize = 4000;

/// Pages processed per `lopdf` extraction batch, bounding resident decoded
/// text for large PDFs.
pub const PDF_BATCH_SIZE: usize = 10;

/// Minimum spacing between successive embedding RPCs (10 req/s).
pub const DEFAULT_EMBEDDING_DELAY_MS: u64 = 100;
/// Base backoff for a 429 retry; doubled per attempt.
pub const DEFAULT_EMBEDDING_RETRY_BASE_MS: u64 = 1000;
pub const DEFAULT_EMBEDDING_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data_dir: String,
    pub embedding_endpoint: String,
    pub embedding_api_key: String,
    pub embedding_model: String,
    pub embedding_delay_ms: u64,
    pub embedding_max_retries: u32,
    pub embedding_retry_base_ms: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub search_default_limit: usize,
    pub max_context_length: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("RAG_DATA_DIR").unwrap_or_else(|_| {
            dirs::data_local_dir()
                .map(|d| d.join("rag-engine").to_string_lossy().to_string())
                .unwrap_or_else(|| ".rag-engine-data".to_string())
        });

        Self {
            data_dir,
            embedding_endpoint: std::env::var("RAG_EMBEDDING_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:11434/api/embeddings".to_string()),
            embedding_api_key: std::env::var("RAG_EMBEDDING_API_KEY").unwrap_or_default(),
            embedding_model: std::env::var("RAG_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "nomic-embed-text".to_string()),
            embedding_delay_ms: std::env::var("RAG_EMBEDDING_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EMBEDDING_DELAY_MS),
            embedding_max_retries: std::env::var("RAG_EMBEDDING_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EMBEDDING_MAX_RETRIES),
            embedding_retry_base_ms: std::env::var("RAG_EMBEDDING_RETRY_BASE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EMBEDDING_RETRY_BASE_MS),
            chunk_size: std::env::var("RAG_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: std::env::var("RAG_CHUNK_OVERLAP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CHUNK_OVERLAP),
            search_default_limit: std::env::var("RAG_SEARCH_DEFAULT_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SEARCH_LIMIT),
            max_context_length: std::env::var("RAG_MAX_CONTEXT_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONTEXT_LENGTH),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
