use std::sync::Arc;
use std::time::Instant;

use crate::assembler;
use crate::embedding::EmbeddingClient;
use crate::model::{ContextPack, Scope};
use crate::store::IndexStore;
use crate::vector_store::VectorStore;

pub struct SearchRequest {
    pub query: String,
    pub scope: Scope,
    pub limit: usize,
}

/// Query embedding → vector top-N → hydrate snippets from `IndexStore` →
/// assemble a context pack under budget.
pub struct Searcher {
    store: IndexStore,
    vector_store: Arc<VectorStore>,
    embedding_client: Arc<EmbeddingClient>,
    max_context_length: usize,
}

impl Searcher {
    pub fn new(
        store: IndexStore,
        vector_store: Arc<VectorStore>,
        embedding_client: Arc<EmbeddingClient>,
        max_context_length: usize,
    ) -> Self {
        Self {
            store,
            vector_store,
            embedding_client,
            max_context_length,
        }
    }

    pub async fn search(&self, request: SearchRequest) -> ContextPack {
        let started = Instant::now();

        let query_vector = match self.embedding_client.embed(&request.query).await {
            Some(v) => v,
            None => {
                return ContextPack {
                    answer_context: String::new(),
                    attributions: Vec::new(),
                    total_results: 0,
                    response_time_ms: started.elapsed().as_millis(),
                };
            }
        };

        let top_raw = self
            .vector_store
            .query(&query_vector, request.limit, request.scope);

        let chunk_ids: Vec<String> = top_raw.iter().map(|hit| hit.chunk_id.clone()).collect();
        let scores: std::collections::HashMap<String, f32> = top_raw
            .iter()
            .map(|hit| (hit.chunk_id.clone(), hit.score))
            .collect();

        let hydrated = match self.store.hydrate_chunks(&chunk_ids, &request.query) {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %e, "failed to hydrate search results");
                Vec::new()
            }
        };

        let hydrated: Vec<_> = hydrated
            .into_iter()
            .map(|mut r| {
                r.score = scores.get(&r.chunk_id).copied().unwrap_or(0.0);
                r
            })
            .collect();

        let mut pack = assembler::assemble(hydrated, self.max_context_length);
        pack.response_time_ms = started.elapsed().as_millis();
        pack
    }
}
