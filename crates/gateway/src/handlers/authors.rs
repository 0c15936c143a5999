//! Author management handlers

use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use paperdesk_common::{
    db::{models::Author, Repository},
    errors::{AppError, Result},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAuthorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,

    #[serde(default)]
    pub affiliation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub affiliation: Option<String>,
    pub created_at: String,
}

impl From<Author> for AuthorResponse {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            name: author.name,
            email: author.email,
            affiliation: author.affiliation,
            created_at: author.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Create a new author
pub async fn create_author(
    State(state): State<AppState>,
    Json(request): Json<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<AuthorResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let author = repo
        .create_author(request.name, request.email, request.affiliation)
        .await?;

    Ok((StatusCode::CREATED, Json(author.into())))
}

/// List authors with pagination
pub async fn list_authors(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AuthorResponse>>> {
    let repo = Repository::new(state.db.clone());
    let limit = state.config.clamp_limit(params.limit);

    let authors = repo.list_authors(params.skip, limit).await?;
    Ok(Json(authors.into_iter().map(Into::into).collect()))
}
