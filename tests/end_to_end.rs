//! Exercises the index → search round trip against a local mock embedding
//! endpoint, covering spec scenarios S1 (single-chunk index/search) and S5
//! (scope isolation) end-to-end rather than through a single module.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use rag_engine::config::AppConfig;
use rag_engine::embedding::{EmbeddingClient, EmbeddingConfig};
use rag_engine::indexer::Indexer;
use rag_engine::model::Scope;
use rag_engine::searcher::{SearchRequest, Searcher};
use rag_engine::store::IndexStore;
use rag_engine::vector_store::VectorStore;

/// Starts a throwaway HTTP server that returns a deterministic embedding
/// for any request whose JSON body's `input` field contains `needle`
/// (vector `[1.0, 0.0]`), and an orthogonal vector `[0.0, 1.0]` otherwise.
/// Good enough to exercise real cosine ranking without a network dependency.
fn spawn_mock_embedding_server(needle: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            if handle_connection(&mut stream, needle).is_none() {
                break;
            }
        }
    });

    format!("http://{addr}/embed")
}

fn handle_connection(stream: &mut TcpStream, needle: &str) -> Option<()> {
    let mut buf = [0u8; 8192];
    let n = stream.read(&mut buf).ok()?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let body = request.split("\r\n\r\n").nth(1).unwrap_or("");
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    let input = parsed.get("input")?.as_str()?;

    let vector = if input.contains(needle) {
        vec![1.0f32, 0.0]
    } else {
        vec![0.0f32, 1.0]
    };
    let payload = serde_json::json!({ "embedding": vector }).to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{}",
        payload.len(),
        payload
    );
    stream.write_all(response.as_bytes()).ok()?;
    Some(())
}

fn test_config(endpoint: String) -> AppConfig {
    AppConfig {
        data_dir: ".".to_string(),
        embedding_endpoint: endpoint,
        embedding_api_key: "test-key".to_string(),
        embedding_model: "test-model".to_string(),
        embedding_delay_ms: 0,
        embedding_max_retries: 0,
        embedding_retry_base_ms: 0,
        chunk_size: 1000,
        chunk_overlap: 100,
        search_default_limit: 10,
        max_context_length: 4000,
    }
}

#[tokio::test]
async fn index_then_search_returns_highlighted_snippet() {
    let endpoint = spawn_mock_embedding_server("lazy dog");
    let config = test_config(endpoint);

    let store = IndexStore::open_in_memory().unwrap();
    let vector_store = Arc::new(VectorStore::new());
    let embedding_client = Arc::new(EmbeddingClient::new(EmbeddingConfig::from(&config)));

    let indexer = Indexer::new(
        store.clone(),
        vector_store.clone(),
        embedding_client.clone(),
        &config,
    );

    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write!(file, "The quick brown fox jumps over the lazy dog.").unwrap();
    let result = indexer.index(file.path(), false, None).await.unwrap();
    assert_eq!(result.chunks_emitted, 1);
    assert_eq!(result.chunks_embedded, 1);
    assert!(!result.skipped);

    let searcher = Searcher::new(store, vector_store, embedding_client, config.max_context_length);
    let pack = searcher
        .search(SearchRequest {
            query: "lazy dog".to_string(),
            scope: Scope::Both,
            limit: 5,
        })
        .await;

    assert_eq!(pack.attributions.len(), 1);
    assert!(pack.answer_context.contains("**lazy dog**"));
    assert_eq!(pack.attributions[0].range_hint, "Chunk 1");
}

#[tokio::test]
async fn scope_filter_excludes_other_corpus() {
    let endpoint = spawn_mock_embedding_server("policy");
    let config = test_config(endpoint);

    let store = IndexStore::open_in_memory().unwrap();
    let vector_store = Arc::new(VectorStore::new());
    let embedding_client = Arc::new(EmbeddingClient::new(EmbeddingConfig::from(&config)));
    let indexer = Indexer::new(
        store.clone(),
        vector_store.clone(),
        embedding_client.clone(),
        &config,
    );

    let mut policy_file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write!(policy_file, "This is the policy manual text.").unwrap();
    indexer
        .index(policy_file.path(), true, None)
        .await
        .unwrap();

    let mut workspace_file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write!(workspace_file, "This is an unrelated workspace document.").unwrap();
    indexer
        .index(workspace_file.path(), false, None)
        .await
        .unwrap();

    let searcher = Searcher::new(store, vector_store, embedding_client, config.max_context_length);
    let pack = searcher
        .search(SearchRequest {
            query: "policy".to_string(),
            scope: Scope::PolicyManual,
            limit: 10,
        })
        .await;

    assert_eq!(pack.attributions.len(), 1);
    assert!(pack.answer_context.to_lowercase().contains("policy"));
}

#[tokio::test]
async fn reindexing_unchanged_document_skips_embedding_calls() {
    let endpoint = spawn_mock_embedding_server("stable");
    let config = test_config(endpoint);

    let store = IndexStore::open_in_memory().unwrap();
    let vector_store = Arc::new(VectorStore::new());
    let embedding_client = Arc::new(EmbeddingClient::new(EmbeddingConfig::from(&config)));
    let indexer = Indexer::new(store, vector_store, embedding_client, &config);

    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    write!(file, "Stable content that never changes across re-indexing.").unwrap();

    let first = indexer.index(file.path(), false, None).await.unwrap();
    assert_eq!(first.chunks_embedded, 1);

    let second = indexer.index(file.path(), false, None).await.unwrap();
    assert!(second.skipped);
    assert_eq!(second.chunks_embedded, 0);
}
