use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::error::{AppError, AppResult};
use crate::model::{Chunk, Document, DocumentMetadata, FiletypeStats, SearchResult, Stats};

const SCHEMA: &str = include_str!("schema.sql");

/// Durable catalog: documents and chunks tables, backed by a pooled SQLite
/// connection. CRUD, checksum idempotence live on `Indexer`; this type only
/// implements the storage contract itself.
#[derive(Clone)]
pub struct IndexStore {
    pool: Pool<SqliteConnectionManager>,
}

impl IndexStore {
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(AppError::Pool)?;

        let store = Self { pool };
        store.init()?;
        Ok(store)
    }

    /// In-memory store, used by tests and short-lived CLI invocations where
    /// the data directory resolves to a scratch location.
    pub fn open_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(AppError::Pool)?;
        let store = Self { pool };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> AppResult<()> {
        let conn = self.pool.get().map_err(AppError::Pool)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn insert_document(&self, doc: &Document) -> AppResult<()> {
        let conn = self.pool.get().map_err(AppError::Pool)?;
        let metadata_json = serde_json::to_string(&doc.metadata)?;
        conn.execute(
            "INSERT INTO documents
                (id, filename, filepath, filetype, filesize, uploaded_at,
                 last_indexed, checksum, metadata, is_policy_manual, workspace_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                doc.id,
                doc.filename,
                doc.filepath,
                doc.filetype,
                doc.filesize as i64,
                doc.uploaded_at,
                doc.last_indexed,
                doc.checksum,
                metadata_json,
                doc.is_policy_manual,
                doc.workspace_id,
            ],
        )?;
        Ok(())
    }

    pub fn insert_chunks(&self, chunks: &[Chunk]) -> AppResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().map_err(AppError::Pool)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (chunk_id, doc_id, text, chunk_index, tokens)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for chunk in chunks {
                stmt.execute(params![
                    chunk.chunk_id,
                    chunk.doc_id,
                    chunk.text,
                    chunk.chunk_index as i64,
                    chunk.tokens as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_document_by_path(&self, filepath: &str) -> AppResult<Option<Document>> {
        let conn = self.pool.get().map_err(AppError::Pool)?;
        let result = conn.query_row(
            "SELECT id, filename, filepath, filetype, filesize, uploaded_at,
                    last_indexed, checksum, metadata, is_policy_manual, workspace_id
             FROM documents WHERE filepath = ?1",
            params![filepath],
            row_to_document,
        );
        optional(result)
    }

    pub fn get_document_by_id(&self, doc_id: &str) -> AppResult<Option<Document>> {
        let conn = self.pool.get().map_err(AppError::Pool)?;
        let result = conn.query_row(
            "SELECT id, filename, filepath, filetype, filesize, uploaded_at,
                    last_indexed, checksum, metadata, is_policy_manual, workspace_id
             FROM documents WHERE id = ?1",
            params![doc_id],
            row_to_document,
        );
        optional(result)
    }

    pub fn get_documents_by_scope(&self, is_policy_manual: bool) -> AppResult<Vec<Document>> {
        let conn = self.pool.get().map_err(AppError::Pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, filename, filepath, filetype, filesize, uploaded_at,
                    last_indexed, checksum, metadata, is_policy_manual, workspace_id
             FROM documents WHERE is_policy_manual = ?1",
        )?;
        let rows = stmt.query_map(params![is_policy_manual], row_to_document)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_chunks_by_doc_id(&self, doc_id: &str) -> AppResult<Vec<Chunk>> {
        let conn = self.pool.get().map_err(AppError::Pool)?;
        let mut stmt = conn.prepare(
            "SELECT chunk_id, doc_id, text, chunk_index, tokens
             FROM chunks WHERE doc_id = ?1 ORDER BY chunk_index ASC",
        )?;
        let rows = stmt.query_map(params![doc_id], row_to_chunk)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Joins chunks with documents, highlighting `query` (case-insensitive)
    /// in the returned snippet, preserving the input `chunk_ids` ordering
    /// with a `chunk_index` tie-break. Scores are not known to the store;
    /// callers (the `Searcher`) inject them from the vector-store result.
    pub fn hydrate_chunks(&self, chunk_ids: &[String], query: &str) -> AppResult<Vec<SearchResult>> {
        if chunk_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.pool.get().map_err(AppError::Pool)?;
        let placeholders = chunk_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT c.chunk_id, c.doc_id, d.filename, c.chunk_index, c.text
             FROM chunks c JOIN documents d ON d.id = c.doc_id
             WHERE c.chunk_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            chunk_ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)? as usize,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut by_id = std::collections::HashMap::new();
        for row in rows {
            let (chunk_id, doc_id, filename, chunk_index, text) = row?;
            let snippet = highlight(&text, query);
            by_id.insert(
                chunk_id.clone(),
                SearchResult {
                    chunk_id,
                    doc_id,
                    filename,
                    chunk_index,
                    snippet,
                    score: 0.0,
                },
            );
        }

        // Preserve input ordering, tie-broken by chunk_index.
        let mut out: Vec<SearchResult> = chunk_ids
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect();
        out.sort_by_key(|r| r.chunk_index);
        Ok(out)
    }

    pub fn delete_document(&self, doc_id: &str) -> AppResult<()> {
        let conn = self.pool.get().map_err(AppError::Pool)?;
        conn.execute("DELETE FROM documents WHERE id = ?1", params![doc_id])?;
        Ok(())
    }

    pub fn clear_all(&self) -> AppResult<()> {
        let mut conn = self.pool.get().map_err(AppError::Pool)?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks", [])?;
        tx.execute("DELETE FROM documents", [])?;
        tx.commit()?;
        Ok(())
    }

    pub fn stats(&self) -> AppResult<Stats> {
        let conn = self.pool.get().map_err(AppError::Pool)?;

        let mut stmt = conn.prepare(
            "SELECT filetype, COUNT(*), SUM(filesize) FROM documents GROUP BY filetype",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FiletypeStats {
                filetype: row.get(0)?,
                count: row.get::<_, i64>(1)? as usize,
                total_size: row.get::<_, Option<i64>>(2)?.unwrap_or(0) as usize,
            })
        })?;
        let mut by_filetype = Vec::new();
        for row in rows {
            by_filetype.push(row?);
        }

        let total_documents: i64 =
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let total_chunks: i64 =
            conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        let total_tokens: Option<i64> =
            conn.query_row("SELECT SUM(tokens) FROM chunks", [], |row| row.get(0))?;

        let average_tokens_per_chunk = if total_chunks > 0 {
            (total_tokens.unwrap_or(0) as f64 / total_chunks as f64).round() as usize
        } else {
            0
        };

        Ok(Stats {
            by_filetype,
            total_documents: total_documents as usize,
            total_chunks: total_chunks as usize,
            average_tokens_per_chunk,
        })
    }
}

fn optional<T>(result: rusqlite::Result<T>) -> AppResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Sqlite(e)),
    }
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let metadata_json: String = row.get(8)?;
    let metadata: DocumentMetadata = serde_json::from_str(&metadata_json).unwrap_or_default();
    Ok(Document {
        id: row.get(0)?,
        filename: row.get(1)?,
        filepath: row.get(2)?,
        filetype: row.get(3)?,
        filesize: row.get::<_, i64>(4)? as usize,
        uploaded_at: row.get(5)?,
        last_indexed: row.get(6)?,
        checksum: row.get(7)?,
        metadata,
        is_policy_manual: row.get(9)?,
        workspace_id: row.get(10)?,
    })
}

fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        chunk_id: row.get(0)?,
        doc_id: row.get(1)?,
        text: row.get(2)?,
        chunk_index: row.get::<_, i64>(3)? as usize,
        tokens: row.get::<_, i64>(4)? as usize,
    })
}

/// Wraps every case-insensitive occurrence of `query` in `**…**`.
fn highlight(text: &str, query: &str) -> String {
    if query.trim().is_empty() {
        return text.to_string();
    }
    let lower_text = text.to_lowercase();
    let lower_query = query.to_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    while let Some(pos) = lower_text[cursor..].find(&lower_query) {
        let start = cursor + pos;
        let end = start + query.len();
        out.push_str(&text[cursor..start]);
        out.push_str("**");
        out.push_str(&text[start..end]);
        out.push_str("**");
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_doc(id: &str, filepath: &str, checksum: &str) -> Document {
        Document {
            id: id.to_string(),
            filename: "a.txt".to_string(),
            filepath: filepath.to_string(),
            filetype: "txt".to_string(),
            filesize: 44,
            uploaded_at: Utc::now().to_rfc3339(),
            last_indexed: Utc::now().to_rfc3339(),
            checksum: checksum.to_string(),
            metadata: DocumentMetadata {
                word_count: 9,
                language: "en".to_string(),
                ..Default::default()
            },
            is_policy_manual: false,
            workspace_id: None,
        }
    }

    #[test]
    fn insert_and_fetch_document_roundtrips() {
        let store = IndexStore::open_in_memory().unwrap();
        let doc = sample_doc("abc123", "/tmp/a.txt", "deadbeef");
        store.insert_document(&doc).unwrap();

        let fetched = store.get_document_by_path("/tmp/a.txt").unwrap().unwrap();
        assert_eq!(fetched.id, "abc123");
        assert_eq!(fetched.checksum, "deadbeef");
        assert_eq!(fetched.metadata.word_count, 9);
    }

    #[test]
    fn unique_filepath_constraint_rejects_duplicate() {
        let store = IndexStore::open_in_memory().unwrap();
        let doc = sample_doc("abc123", "/tmp/a.txt", "deadbeef");
        store.insert_document(&doc).unwrap();
        let dup = sample_doc("other-id", "/tmp/a.txt", "deadbeef");
        assert!(store.insert_document(&dup).is_err());
    }

    #[test]
    fn deleting_document_cascades_to_chunks() {
        let store = IndexStore::open_in_memory().unwrap();
        let doc = sample_doc("abc123", "/tmp/a.txt", "deadbeef");
        store.insert_document(&doc).unwrap();
        let chunks = vec![Chunk {
            chunk_id: "abc123_sent_chunk_0".to_string(),
            doc_id: "abc123".to_string(),
            text: "hello".to_string(),
            chunk_index: 0,
            tokens: 2,
        }];
        store.insert_chunks(&chunks).unwrap();
        assert_eq!(store.get_chunks_by_doc_id("abc123").unwrap().len(), 1);

        store.delete_document("abc123").unwrap();
        assert_eq!(store.get_chunks_by_doc_id("abc123").unwrap().len(), 0);
        assert!(store.get_document_by_id("abc123").unwrap().is_none());
    }

    #[test]
    fn hydrate_chunks_highlights_query_case_insensitively() {
        let store = IndexStore::open_in_memory().unwrap();
        let doc = sample_doc("abc123", "/tmp/a.txt", "deadbeef");
        store.insert_document(&doc).unwrap();
        let chunks = vec![Chunk {
            chunk_id: "abc123_sent_chunk_0".to_string(),
            doc_id: "abc123".to_string(),
            text: "The quick brown fox jumps over the lazy dog.".to_string(),
            chunk_index: 0,
            tokens: 11,
        }];
        store.insert_chunks(&chunks).unwrap();

        let results = store
            .hydrate_chunks(&["abc123_sent_chunk_0".to_string()], "lazy dog")
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].snippet.contains("**lazy dog**"));
    }

    #[test]
    fn stats_aggregates_by_filetype() {
        let store = IndexStore::open_in_memory().unwrap();
        store.insert_document(&sample_doc("a", "/tmp/a.txt", "x")).unwrap();
        store
            .insert_chunks(&[Chunk {
                chunk_id: "a_sent_chunk_0".to_string(),
                doc_id: "a".to_string(),
                text: "hi".to_string(),
                chunk_index: 0,
                tokens: 4,
            }])
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.average_tokens_per_chunk, 4);
        assert_eq!(stats.by_filetype.len(), 1);
        assert_eq!(stats.by_filetype[0].filetype, "txt");
    }
}
