use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult, middleware::request_id::RequestId, models::RecommendationResponse,
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub title: String,
    pub k: Option<usize>,
    pub min_score: Option<f32>,
    #[serde(default = "default_enrich")]
    pub enrich: bool,
}

fn default_enrich() -> bool {
    true
}

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let k = params.k.unwrap_or(state.defaults.k);
    let min_score = params.min_score.unwrap_or(state.defaults.min_score);

    tracing::info!(
        request_id = %request_id,
        title = %params.title,
        k,
        min_score,
        enrich = params.enrich,
        "Processing recommendation request"
    );

    let (selected, results) = state
        .recommender
        .recommend_with_selected(&params.title, k, min_score, params.enrich)
        .await
        .inspect_err(|e| {
            tracing::info!(request_id = %request_id, error = %e, "Recommendation request rejected")
        })?;

    Ok(Json(RecommendationResponse {
        query: params.title,
        selected,
        results,
    }))
}
