mod config;
mod db;
mod errors;
mod knowledge;
mod llm_client;
mod models;
mod pipeline;
mod qualitative;
mod quantitative;
mod retrieval;
mod routes;
mod state;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::knowledge::corpus::load_corpus;
use crate::knowledge::{KnowledgeBases, RuleCatalog};
use crate::llm_client::{LlmClient, TextGenerator};
use crate::pipeline::forward::{HttpForwarder, NoopForwarder, ReportForwarder};
use crate::pipeline::stage::StageTracker;
use crate::pipeline::store::{FileReportStore, PgReportStore, ReportStore};
use crate::pipeline::{EvaluationPipeline, EvaluationService};
use crate::qualitative::criteria::{map_question_id, CriteriaIndex};
use crate::qualitative::QualitativeEvaluator;
use crate::quantitative::QuantitativeEvaluator;
use crate::retrieval::{Embedder, HashEmbedder, HttpEmbedder, InMemoryExampleStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting evaluator v{}", env!("CARGO_PKG_VERSION"));

    // Rule catalog is the only required document
    let catalog = RuleCatalog::load(&config.scoring_rules_file)
        .context("Cannot start without a scoring rule catalog")?;
    let knowledge = KnowledgeBases::load(
        &config.universities_kb_file,
        &config.certifications_kb_file,
    );
    let corpus = load_corpus(&config.rag_data_file);

    // Embedding service
    let embedder: Arc<dyn Embedder> = match &config.embedding_url {
        Some(url) => {
            info!("Using embedding endpoint at {url}");
            Arc::new(HttpEmbedder::new(url))
        }
        None => {
            info!("EMBEDDING_URL not set; using local hashed embedder");
            let career_rules = catalog.career_rules();
            if !career_rules.is_empty() {
                warn!(
                    rules = ?career_rules,
                    "Career similarity will use the hashed embedder, which only matches shared words; \
                     translated or synonymous job titles fall below the threshold"
                );
            }
            Arc::new(HashEmbedder::default())
        }
    };

    // Criteria index and reference example store
    let criteria = CriteriaIndex::from_records(&corpus);
    info!(criteria = criteria.len(), "Criteria index built");

    let examples: Vec<(i64, String)> = corpus
        .iter()
        .filter_map(|record| {
            record
                .example_text()
                .map(|text| (map_question_id(record.question_id), text.to_string()))
        })
        .collect();
    let example_store = match InMemoryExampleStore::build(embedder.clone(), examples).await {
        Ok(store) => store,
        Err(e) => {
            warn!("Failed to embed reference examples, grading without them: {e}");
            InMemoryExampleStore::empty(embedder.clone())
        }
    };
    info!(examples = example_store.len(), "Reference example store ready");

    // Generation service
    let llm = Arc::new(LlmClient::new(
        &config.generation_url,
        config.generation_api_key.clone(),
    ));
    llm.initialize()
        .await
        .context("Generation endpoint is not reachable")?;

    // Report sinks
    let store: Arc<dyn ReportStore> = match &config.database_url {
        Some(database_url) => {
            let db = create_pool(database_url).await?;
            ensure_schema(&db).await?;
            Arc::new(PgReportStore::new(db))
        }
        None => {
            info!(
                "DATABASE_URL not set; storing reports under {}",
                config.results_dir.display()
            );
            Arc::new(FileReportStore::new(config.results_dir.clone()))
        }
    };
    let forwarder: Arc<dyn ReportForwarder> = match &config.forward_url {
        Some(url) => Arc::new(HttpForwarder::new(url.clone())),
        None => Arc::new(NoopForwarder),
    };

    let quantitative =
        QuantitativeEvaluator::new(Arc::new(catalog), Arc::new(knowledge), embedder);
    let qualitative = QualitativeEvaluator::new(
        Arc::new(criteria),
        Arc::new(example_store),
        llm.clone(),
        config.retrieval_top_k,
    );
    let service = EvaluationService::new(
        EvaluationPipeline::new(quantitative, qualitative),
        store.clone(),
        forwarder,
    );

    // Build app state
    let state = AppState {
        service,
        tracker: StageTracker::new(),
        store,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    llm.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
