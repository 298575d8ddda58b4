use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{ItemId, MovieDetail},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    /// Title used for the search fallback; defaults to the catalog title
    pub title: Option<String>,
}

/// Handler for movie detail endpoint
pub async fn detail(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(item_id): Path<u32>,
    Query(params): Query<DetailQuery>,
) -> AppResult<Json<MovieDetail>> {
    tracing::info!(request_id = %request_id, item_id, "Processing movie detail request");

    let detail = state
        .recommender
        .detail(ItemId(item_id), params.title.as_deref())
        .await?;

    Ok(Json(detail))
}
