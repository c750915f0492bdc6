use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use marquee_api::{
    config::Config,
    db::{create_redis_client, Cache},
    index::load_index,
    routes::{create_router, AppState, QueryDefaults},
    services::{
        providers::{CircuitBreakerProvider, DisabledProvider, MetadataProvider, TmdbProvider},
        EnrichmentOptions, RecommendationService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    // Fatal on any integrity problem: never serve from an inconsistent index
    let index = load_index(&config.catalog_path, &config.similarity_path)
        .await
        .context("Failed to load similarity data")?;

    let (cache, cache_writer) = match &config.redis_url {
        Some(redis_url) => {
            let (cache, handle) = Cache::new(create_redis_client(redis_url)?);
            tracing::info!("Metadata cache enabled");
            (Some(cache), Some(handle))
        }
        None => (None, None),
    };

    let provider: Arc<dyn MetadataProvider> = match config.tmdb_api_key() {
        Some(api_key) => {
            let tmdb = TmdbProvider::new(
                api_key.to_string(),
                config.tmdb_api_url.clone(),
                cache,
                config.metadata_cache_ttl_secs,
            );
            Arc::new(CircuitBreakerProvider::new(
                Arc::new(tmdb),
                config.breaker_failure_threshold,
                Duration::from_secs(config.breaker_cooldown_secs),
                Duration::from_millis(config.provider_timeout_ms),
            ))
        }
        None => {
            tracing::warn!("TMDB_API_KEY not configured; recommendations will carry no metadata");
            Arc::new(DisabledProvider)
        }
    };

    let recommender = RecommendationService::new(
        Arc::new(index),
        provider,
        EnrichmentOptions {
            timeout: Duration::from_millis(config.enrichment_timeout_ms),
            concurrency: config.enrichment_concurrency,
            image_base_url: config.tmdb_image_base_url.clone(),
        },
        config.max_recommendations,
    );

    let state = AppState::new(
        recommender,
        QueryDefaults {
            k: config.default_recommendations,
            min_score: config.default_min_score,
        },
    );
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
