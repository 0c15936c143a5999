//! Paper management handlers

use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use paperdesk_common::{
    db::{PaperDetails, PaperDraft, PaperPatch, Repository},
    errors::{AppError, Result},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::authors::AuthorResponse;
use super::tags::TagResponse;
use super::venues::VenueResponse;

/// Request to create a new paper with its full association set
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaperRequest {
    #[validate(length(min = 1, max = 1000))]
    pub title: String,

    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,

    pub publication_year: i32,

    #[serde(default)]
    pub doi: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub citation_count: i32,

    #[serde(default)]
    pub venue_id: Option<i32>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub author_ids: Vec<i32>,

    #[serde(default)]
    pub tag_ids: Vec<i32>,
}

impl CreatePaperRequest {
    pub fn into_draft(self) -> PaperDraft {
        PaperDraft {
            title: self.title,
            abstract_text: self.abstract_text,
            publication_year: self.publication_year,
            doi: self.doi,
            citation_count: self.citation_count,
            venue_id: self.venue_id,
            url: self.url,
            keywords: self.keywords,
            author_ids: self.author_ids,
            tag_ids: self.tag_ids,
        }
    }
}

/// Partial update; omitted fields are left untouched, a supplied author or
/// tag list fully replaces the stored one
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePaperRequest {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub publication_year: Option<i32>,
    pub doi: Option<String>,
    pub citation_count: Option<i32>,
    pub venue_id: Option<i32>,
    pub url: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub author_ids: Option<Vec<i32>>,
    pub tag_ids: Option<Vec<i32>>,
}

impl UpdatePaperRequest {
    fn into_patch(self) -> PaperPatch {
        PaperPatch {
            title: self.title,
            abstract_text: self.abstract_text,
            publication_year: self.publication_year,
            doi: self.doi,
            citation_count: self.citation_count,
            venue_id: self.venue_id,
            url: self.url,
            keywords: self.keywords,
            author_ids: self.author_ids,
            tag_ids: self.tag_ids,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Full paper representation with venue, ordered authors and tags
#[derive(Debug, Serialize)]
pub struct PaperResponse {
    pub id: i32,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub publication_year: i32,
    pub doi: Option<String>,
    pub citation_count: i32,
    pub url: Option<String>,
    pub keywords: Vec<String>,
    pub pdf_file_path: Option<String>,
    pub file_size: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub venue: Option<VenueResponse>,
    pub authors: Vec<PaperAuthorResponse>,
    pub tags: Vec<TagResponse>,
}

#[derive(Debug, Serialize)]
pub struct PaperAuthorResponse {
    pub author_order: i32,
    pub is_corresponding: bool,
    pub author: AuthorResponse,
}

impl From<PaperDetails> for PaperResponse {
    fn from(details: PaperDetails) -> Self {
        let paper = details.paper;
        Self {
            id: paper.id,
            title: paper.title,
            abstract_text: paper.abstract_text,
            publication_year: paper.publication_year,
            doi: paper.doi,
            citation_count: paper.citation_count,
            url: paper.url,
            keywords: paper.keywords.unwrap_or_default(),
            pdf_file_path: paper.pdf_file_path,
            file_size: paper.file_size,
            created_at: paper.created_at.to_rfc3339(),
            updated_at: paper.updated_at.to_rfc3339(),
            venue: details.venue.map(Into::into),
            authors: details
                .authors
                .into_iter()
                .map(|link| PaperAuthorResponse {
                    author_order: link.author_order,
                    is_corresponding: link.is_corresponding,
                    author: link.author.into(),
                })
                .collect(),
            tags: details.tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Create a new paper
pub async fn create_paper(
    State(state): State<AppState>,
    Json(request): Json<CreatePaperRequest>,
) -> Result<(StatusCode, Json<PaperResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let details = repo.create_paper(request.into_draft()).await?;

    Ok((StatusCode::CREATED, Json(details.into())))
}

/// List papers with pagination
pub async fn list_papers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PaperResponse>>> {
    let repo = Repository::new(state.db.clone());
    let limit = state.config.clamp_limit(params.limit);

    let papers = repo.list_papers(params.skip, limit).await?;
    Ok(Json(papers.into_iter().map(Into::into).collect()))
}

/// Get a paper by ID
pub async fn get_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
) -> Result<Json<PaperResponse>> {
    let repo = Repository::new(state.db.clone());

    let details = repo
        .find_paper(paper_id)
        .await?
        .ok_or(AppError::PaperNotFound { id: paper_id })?;

    Ok(Json(details.into()))
}

/// Update a paper
pub async fn update_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
    Json(request): Json<UpdatePaperRequest>,
) -> Result<Json<PaperResponse>> {
    let repo = Repository::new(state.db.clone());

    let details = repo
        .update_paper(paper_id, request.into_patch())
        .await?
        .ok_or(AppError::PaperNotFound { id: paper_id })?;

    Ok(Json(details.into()))
}

/// Delete a paper and its associations
pub async fn delete_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());

    if !repo.delete_paper(paper_id).await? {
        return Err(AppError::PaperNotFound { id: paper_id });
    }

    Ok(StatusCode::NO_CONTENT)
}
