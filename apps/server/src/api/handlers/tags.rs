//! Tag vocabulary handler

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    models::{ListTagsParams, Tag},
    state::AppState,
    Result,
};

/// `GET /tags?sort=`
pub async fn list_tags(
    State(state): State<AppState>,
    Query(params): Query<ListTagsParams>,
) -> Result<Json<Vec<Tag>>> {
    if let Some(sort) = &params.sort {
        tracing::debug!(sort = %sort, "Ignoring sort parameter; tags are ordered by name");
    }

    Ok(Json(state.tag_service.list().await?))
}
