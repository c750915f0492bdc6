use axum::{extract::State, Json};

use crate::{models::CatalogStats, routes::AppState, services::catalog_stats::catalog_stats};

const TOP_GENRES: usize = 10;

/// Handler for catalog statistics
pub async fn stats(State(state): State<AppState>) -> Json<CatalogStats> {
    Json(catalog_stats(state.recommender.index().catalog(), TOP_GENRES))
}
