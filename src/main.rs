use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use rag_engine::config::AppConfig;
use rag_engine::embedding::{EmbeddingClient, EmbeddingConfig};
use rag_engine::indexer::Indexer;
use rag_engine::model::Scope;
use rag_engine::paths::PathResolver;
use rag_engine::searcher::{SearchRequest, Searcher};
use rag_engine::store::IndexStore;
use rag_engine::vector_store::VectorStore;

#[derive(Parser)]
#[command(name = "rag-engine", about = "Local RAG indexing and search engine over office documents")]
struct Cli {
    /// Workspace to operate against; omit for the global policy-manual catalog.
    #[arg(long, global = true)]
    workspace: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a document into the catalog.
    Index {
        /// Path to a pdf/docx/txt/md file.
        path: PathBuf,
        /// Mark the document as belonging to the policy-manual corpus.
        #[arg(long)]
        policy_manual: bool,
    },
    /// Run a similarity search and print the assembled context pack.
    Search {
        query: String,
        #[arg(long, default_value = "both")]
        scope: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print catalog statistics.
    Stats,
    /// Delete everything in the targeted catalog and vector store.
    Clear,
}

fn parse_scope(s: &str) -> Result<Scope> {
    match s {
        "policy_manual" => Ok(Scope::PolicyManual),
        "workspace_docs" => Ok(Scope::WorkspaceDocs),
        "both" => Ok(Scope::Both),
        other => Err(anyhow::anyhow!("unknown scope {other:?}, expected policy_manual|workspace_docs|both")),
    }
}

fn init_logging(log_dir: &str) -> tracing_appender::non_blocking::WorkerGuard {
    std::fs::create_dir_all(log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "rag-engine.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rag_engine=info".into());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(non_blocking_writer)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_default();
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        error!(target: "rag_engine::panic", location = %location, payload = %payload, "PANIC: thread panicked");
        default_panic(info);
    }));

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let resolver = PathResolver::new(&config.data_dir);
    resolver.ensure_all()?;
    let _log_guard = init_logging(&resolver.logs_dir().to_string_lossy());

    info!(data_dir = %config.data_dir, workspace = ?cli.workspace, "rag-engine starting");

    let store_path = match &cli.workspace {
        Some(workspace_id) => {
            resolver.ensure_workspace(workspace_id)?;
            resolver.workspace_store_path(workspace_id)
        }
        None => resolver.global_store_path(),
    };
    let store = IndexStore::open(&store_path)?;
    let vector_store = Arc::new(VectorStore::new());
    let embedding_client = Arc::new(EmbeddingClient::new(EmbeddingConfig::from(&config)));

    match cli.command {
        Command::Index { path, policy_manual } => {
            let indexer = Indexer::new(store, vector_store, embedding_client, &config);
            let result = indexer
                .index(&path, policy_manual, cli.workspace.clone())
                .await?;
            if result.skipped {
                info!(doc_id = %result.doc_id, "document unchanged, skipped");
            } else {
                info!(
                    doc_id = %result.doc_id,
                    chunks_emitted = result.chunks_emitted,
                    chunks_embedded = result.chunks_embedded,
                    "document indexed"
                );
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Search { query, scope, limit } => {
            let scope = parse_scope(&scope)?;
            let searcher = Searcher::new(store, vector_store, embedding_client, config.max_context_length);
            let pack = searcher
                .search(SearchRequest {
                    query,
                    scope,
                    limit: limit.unwrap_or(config.search_default_limit),
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&pack)?);
        }
        Command::Stats => {
            let stats = store.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Clear => {
            store.clear_all()?;
            vector_store.clear();
            info!("catalog and vector store cleared");
        }
    }

    info!("rag-engine finished");
    Ok(())
}
