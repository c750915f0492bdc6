use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{models::Movie, routes::AppState, services::title_search::search_titles};

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

/// Handler for catalog title search, used to populate title pickers
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Json<Vec<Movie>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let movies = search_titles(state.recommender.index().catalog(), &params.q, limit)
        .into_iter()
        .cloned()
        .collect();
    Json(movies)
}
