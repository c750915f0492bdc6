use std::sync::Arc;

use axum::{http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::RecommendationService,
};

pub mod recommendations;
pub mod stats;
pub mod titles;

/// Fallbacks for query parameters the caller leaves out
#[derive(Debug, Clone, Copy)]
pub struct QueryDefaults {
    pub k: usize,
    pub min_score: f32,
}

/// Shared, read-only application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<RecommendationService>,
    pub defaults: QueryDefaults,
}

impl AppState {
    pub fn new(recommender: RecommendationService, defaults: QueryDefaults) -> Self {
        Self {
            recommender: Arc::new(recommender),
            defaults,
        }
    }
}

/// Creates the application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations", get(recommendations::recommend))
        .route("/movies", get(titles::search))
        .route("/stats", get(stats::stats))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
