use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::Recommendations,
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub query: String,
    pub k: Option<usize>,
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<Recommendations>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("No query provided".to_string()));
    }

    tracing::info!(
        request_id = %request_id,
        query = %query,
        k = ?params.k,
        "Processing recommendation request"
    );

    let recommendations = state.recommender.recommend(query, params.k).await?;

    tracing::info!(
        request_id = %request_id,
        results = recommendations.items.len(),
        "Recommendations completed"
    );

    Ok(Json(recommendations))
}
