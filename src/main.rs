use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use tutorsmith::completions::OpenRouterCompletions;
use tutorsmith::config::Config;
use tutorsmith::embeddings::OpenAiEmbeddings;
use tutorsmith::orchestrator::Orchestrator;
use tutorsmith::retrieval::RetrievalService;
use tutorsmith::server::{self, AppState};
use tutorsmith::stores::SqliteVectorStore;
use tutorsmith::syllabus::SqliteSyllabusStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let store = SqliteVectorStore::open(&config.database_path).await?;
    let syllabus = SqliteSyllabusStore::from_connection(store.connection()).await?;

    let mut embedder = OpenAiEmbeddings::new(config.openai_api_key.clone());
    if let Some(base_url) = &config.openai_base_url {
        embedder = embedder.with_base_url(base_url.clone());
    }

    let mut completions = OpenRouterCompletions::new(config.openrouter_api_key.clone());
    if let Some(base_url) = &config.openrouter_base_url {
        completions = completions.with_base_url(base_url.clone());
    }

    let retrieval = RetrievalService::new(Arc::new(embedder), Arc::new(store));
    let orchestrator = Orchestrator::new(retrieval.clone(), Arc::new(completions));
    let state = AppState::new(retrieval, Arc::new(syllabus), orchestrator);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, db = %config.database_path, "tutorsmith listening");

    axum::serve(listener, server::router(state).into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {err}");
            }
        })
        .await?;

    Ok(())
}
