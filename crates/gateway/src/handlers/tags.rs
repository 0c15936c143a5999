//! Tag management handlers, including batch attach/detach on papers

use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use paperdesk_common::{
    db::{models::Tag, Repository},
    errors::{AppError, Result},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::papers::PaperResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// Display color, `#RRGGBB`
    #[serde(default)]
    #[validate(length(min = 4, max = 7))]
    pub color: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
    pub color: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaperTagsRequest {
    pub tag_ids: Vec<i32>,
}

/// Create a new tag
pub async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let tag = repo.create_tag(request.name, request.color).await?;

    Ok((StatusCode::CREATED, Json(tag.into())))
}

/// List all tags
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>> {
    let repo = Repository::new(state.db.clone());
    let tags = repo.list_tags().await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

/// Batch-attach tags to a paper; already-attached tags are left alone
pub async fn add_paper_tags(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
    Json(request): Json<PaperTagsRequest>,
) -> Result<Json<PaperResponse>> {
    let repo = Repository::new(state.db.clone());
    let details = repo.add_tags_to_paper(paper_id, &request.tag_ids).await?;

    tracing::info!(paper_id, count = request.tag_ids.len(), "Tags attached");

    Ok(Json(details.into()))
}

/// Batch-detach tags from a paper
pub async fn remove_paper_tags(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
    Json(request): Json<PaperTagsRequest>,
) -> Result<Json<PaperResponse>> {
    let repo = Repository::new(state.db.clone());
    let details = repo
        .remove_tags_from_paper(paper_id, &request.tag_ids)
        .await?;

    Ok(Json(details.into()))
}
