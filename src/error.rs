use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to extract content from {path}: {source}")]
    ExtractionFailed {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("failed to set up data directories: {0}")]
    StorageSetup(String),

    #[error("embedding provider rate-limited the request after {retries} retries")]
    EmbeddingRateLimited { retries: u32 },

    #[error("embedding request failed: {0}")]
    EmbeddingFailed(String),

    #[error("invalid document uri: {0}")]
    InvalidUri(String),

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;
