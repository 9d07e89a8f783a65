//! Binary entry point: loads configuration, wires the Model Gateway,
//! Embedding Store, Retriever, and Agent Registry into an [`ExecutionEngine`],
//! and serves `/execute` over HTTP.

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use weave_config::Settings;
use weave_engine::{AgentRegistry, ExecutionEngine, TracingMiddleware};
use weave_retrieval::{EmbeddingStore, FileEmbeddingStore, Retriever, SqliteVecEmbeddingStore};
use weave_server::{router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let _ = weave_config::load_and_apply("weave", None);
    let settings = Settings::from_env().map_err(|e| {
        tracing::error!(error = %e, "startup configuration error");
        e
    })?;

    let gateway = weave_gateway::build_gateway(&settings);

    let store: Arc<dyn EmbeddingStore> = match &settings.database_url {
        Some(path) => Arc::new(SqliteVecEmbeddingStore::new(path)?),
        None => Arc::new(FileEmbeddingStore::new(format!("{}/.embeddings", settings.corpus_dir))),
    };

    let corpora = weave_server::discover_and_sync(&settings, gateway.as_ref(), store.as_ref()).await;
    tracing::info!(corpora = corpora.len(), "corpus discovery complete");

    let retriever = Arc::new(Retriever::new(store, gateway.clone()));
    let registry: AgentRegistry =
        weave_agents::build_registry(gateway, retriever, Arc::new(corpora));

    let engine = Arc::new(ExecutionEngine::new(registry, vec![Arc::new(TracingMiddleware)]));
    let state = AppState {
        engine,
        request_timeout: std::time::Duration::from_secs(settings.request_timeout_secs),
    };

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "weave-server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}
