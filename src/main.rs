use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinematch_api::{
    config::Config,
    data::Datasets,
    routes::{create_router, AppState},
    services::{
        enrichment::EnrichmentClient, providers::tmdb::TmdbProvider, Recommender,
        RecommenderSettings,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cinematch_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Model build is single-threaded and must finish before any request is accepted
    let datasets = Datasets::from_paths(&config.ratings_path, &config.movies_path, &config.links_path)
        .context("Failed to load datasets")?;

    let provider = TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_image_url.clone(),
        config.request_timeout(),
    )?;

    let enrichment = EnrichmentClient::new(
        Arc::new(provider),
        &datasets.links,
        config.retry_policy(),
        config.request_timeout(),
        config.enrichment_concurrency,
    );

    let settings = RecommenderSettings {
        metric: config.similarity_metric,
        default_k: config.default_k,
        max_k: config.max_k,
        min_match_score: config.min_match_score,
    };

    let recommender = Recommender::from_datasets(datasets, enrichment, settings)
        .context("Failed to build recommendation model")?;

    tracing::info!(
        movies = recommender.catalog().len(),
        rated_movies = recommender.model().item_count(),
        users = recommender.model().user_count(),
        metric = ?config.similarity_metric,
        "Recommender ready"
    );

    let app = create_router(Arc::new(AppState::new(recommender)));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
