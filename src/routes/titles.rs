use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    routes::AppState,
    services::title_resolver::{search_titles, DEFAULT_SEARCH_LIMIT},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

/// Handler for title search (type-ahead suggestions)
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<String>>> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, 50);
    let titles = search_titles(state.recommender.catalog(), &params.q, limit)?;
    Ok(Json(titles))
}
